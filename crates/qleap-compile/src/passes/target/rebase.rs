//! Rebase passes (§4.10): retarget gates outside the native set onto it.
//!
//! [`Rebase2QuditGatePass`] replaces every instance of one two-qudit gate
//! with a template built only from another, via a small closed-form table
//! first and a bounded [`QSearch`] fallback second. [`U3Decomposition`] and
//! [`ZXZXZDecomposition`] do the single-qudit equivalent: closed-form Euler
//! angles when the native set is exactly `{U3}` or `{RZ, SqrtX}`, otherwise
//! the same `QSearch` fallback over [`SingleQuditLayerGenerator`].

use std::f64::consts::PI;

use qleap_ir::{
    CircuitDag, Gate, GateKind, Instruction, InstructionKind, QubitId, StandardGate, UnitaryMatrix,
};

use crate::error::{CompileError, CompileResult};
use crate::layer::{SingleQuditLayerGenerator, WideLayerGenerator};
use crate::pass::{Pass, PassKind};
use crate::pass_data::PassData;
use crate::runtime::ThreadRuntime;
use crate::search::qsearch::QSearch;
use crate::unitary::Unitary2x2;

fn remap(template: &[Instruction], location: &[QubitId]) -> Vec<Instruction> {
    template
        .iter()
        .map(|inst| Instruction {
            kind: inst.kind.clone(),
            qubits: inst.qubits.iter().map(|q| location[q.0 as usize]).collect(),
            clbits: inst.clbits.clone(),
        })
        .collect()
}

/// Replace every `from` gate in the circuit with an equivalent template
/// built only from `to`, via template matching and instantiation.
pub struct Rebase2QuditGatePass {
    pub from: StandardGate,
    pub to: StandardGate,
    pub max_depth: u32,
    pub max_retries: usize,
    pub success_threshold: f64,
}

impl Rebase2QuditGatePass {
    pub fn new(from: StandardGate, to: StandardGate, max_depth: u32, max_retries: usize) -> Self {
        assert_eq!(from.num_qubits(), 2, "Rebase2QuditGatePass requires a two-qudit `from` gate");
        assert_eq!(to.num_qubits(), 2, "Rebase2QuditGatePass requires a two-qudit `to` gate");
        Self {
            from,
            to,
            max_depth,
            max_retries,
            success_threshold: 1e-10,
        }
    }

    #[must_use]
    pub fn with_success_threshold(mut self, threshold: f64) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Known templates that need no search: the fixed three-`CNOT` SWAP
    /// identity (`SWAP = CNOT(a,b)·CNOT(b,a)·CNOT(a,b)`).
    fn closed_form_template(&self) -> Option<Vec<Instruction>> {
        match (&self.from, &self.to) {
            (StandardGate::Swap, StandardGate::Cnot) => Some(vec![
                Instruction::two_qubit_gate(StandardGate::Cnot, QubitId(0), QubitId(1)),
                Instruction::two_qubit_gate(StandardGate::Cnot, QubitId(1), QubitId(0)),
                Instruction::two_qubit_gate(StandardGate::Cnot, QubitId(0), QubitId(1)),
            ]),
            _ => None,
        }
    }

    /// Bounded search fallback: `max_depth` caps the layer search, the
    /// instantiator's `multistarts` is driven by `max_retries`.
    fn search_template(&self, data: &PassData) -> CompileResult<Vec<Instruction>> {
        let target_matrix = self
            .from
            .matrix()
            .expect("Rebase2QuditGatePass only handles constant two-qudit gates");
        let target = UnitaryMatrix::from_flat(4, target_matrix);

        let mut search = QSearch::new(WideLayerGenerator::new(vec![self.to.clone()]))
            .with_success_threshold(self.success_threshold)
            .with_max_layer(self.max_depth);
        search.instantiator = search
            .instantiator
            .clone()
            .with_multistarts(self.max_retries.max(1))
            .with_seed(data.seed);

        let mut local_data = PassData::new();
        local_data.seed = data.seed;
        let result = search.synthesize(&target, &local_data, &ThreadRuntime);

        if result.get_unitary().distance(&target) > self.success_threshold {
            return Err(CompileError::GateNotInBasis(self.from.name().to_string()));
        }
        Ok(result.dag().topological_ops().map(|(_, inst)| inst.clone()).collect())
    }
}

impl Pass for Rebase2QuditGatePass {
    fn name(&self) -> &'static str {
        "rebase_2qudit_gate"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        if self.from.name() == self.to.name() {
            return Ok(());
        }

        let matches: Vec<(_, Vec<QubitId>)> = dag
            .topological_ops()
            .filter_map(|(idx, inst)| match &inst.kind {
                InstructionKind::Gate(Gate {
                    kind: GateKind::Standard(g),
                    ..
                }) if g.name() == self.from.name() && inst.qubits.len() == 2 => {
                    Some((idx, inst.qubits.clone()))
                }
                _ => None,
            })
            .collect();

        if matches.is_empty() {
            return Ok(());
        }

        let template = match self.closed_form_template() {
            Some(template) => template,
            None => self.search_template(pass_data)?,
        };

        for (idx, location) in matches {
            dag.substitute_node(idx, remap(&template, &location))?;
        }
        Ok(())
    }
}

/// Closed-form Euler decomposition onto `{U3}`: every single-qudit gate
/// becomes one `U3(theta, phi, lambda)`, built from the ZYZ angles
/// (`U3(theta,phi,lambda) = e^{i(phi+lambda)/2} Rz(phi) Ry(theta) Rz(lambda)`,
/// so `theta = beta`, `phi = alpha`, `lambda = gamma` from
/// [`Unitary2x2::zyz_decomposition`]). Falls back to `QSearch` over
/// [`SingleQuditLayerGenerator`] when the native set is not exactly `{U3}`.
pub struct U3Decomposition {
    pub max_depth: u32,
    pub max_retries: usize,
    pub success_threshold: f64,
}

impl U3Decomposition {
    pub fn new() -> Self {
        Self {
            max_depth: 6,
            max_retries: 4,
            success_threshold: 1e-10,
        }
    }
}

impl Default for U3Decomposition {
    fn default() -> Self {
        Self::new()
    }
}

/// The instruction's gate, if it is a single-qudit `StandardGate`.
fn single_qudit_standard_gate(inst: &Instruction) -> Option<&StandardGate> {
    if inst.qubits.len() != 1 {
        return None;
    }
    match &inst.kind {
        InstructionKind::Gate(Gate {
            kind: GateKind::Standard(g),
            ..
        }) => Some(g),
        _ => None,
    }
}

impl Pass for U3Decomposition {
    fn name(&self) -> &'static str {
        "u3_decomposition"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        let basis = pass_data.basis_gates.as_ref().ok_or(CompileError::MissingBasisGates)?;
        let closed_form = basis.gates().len() == 1 && basis.contains("u3");

        let targets: Vec<_> = dag
            .topological_ops()
            .filter_map(|(idx, inst)| {
                let gate = single_qudit_standard_gate(inst)?;
                if gate.name() == "u3" {
                    return None;
                }
                let matrix = gate.matrix()?;
                Some((idx, inst.qubits.clone(), matrix))
            })
            .collect();

        if targets.is_empty() {
            return Ok(());
        }

        for (idx, location, matrix) in targets {
            let [a, b, c, d] = [matrix[0], matrix[1], matrix[2], matrix[3]];
            let replacement = if closed_form {
                let u = Unitary2x2::new(a, b, c, d);
                let (alpha, beta, gamma, _global_phase) = u.zyz_decomposition();
                vec![Instruction::single_qubit_gate(
                    StandardGate::U3(
                        Unitary2x2::normalize_angle(beta).into(),
                        Unitary2x2::normalize_angle(alpha).into(),
                        Unitary2x2::normalize_angle(gamma).into(),
                    ),
                    QubitId(0),
                )]
            } else {
                let target = UnitaryMatrix::from_flat(2, vec![a, b, c, d]);
                let mut search = QSearch::new(SingleQuditLayerGenerator)
                    .with_success_threshold(self.success_threshold)
                    .with_max_layer(self.max_depth);
                search.instantiator = search
                    .instantiator
                    .clone()
                    .with_multistarts(self.max_retries.max(1))
                    .with_seed(pass_data.seed);
                let mut local_data = PassData::new();
                local_data.basis_gates = pass_data.basis_gates.clone();
                local_data.seed = pass_data.seed;
                let result = search.synthesize(&target, &local_data, &ThreadRuntime);
                result.dag().topological_ops().map(|(_, inst)| inst.clone()).collect()
            };
            dag.substitute_node(idx, remap(&replacement, &location))?;
        }
        Ok(())
    }
}

/// Closed-form decomposition onto `{RZ, SqrtX}` (a `ZSX`-style basis):
/// `Ry(theta)` rewritten via `Rz(lambda)·SqrtX·Rz(theta+pi)·SqrtX·Rz(phi+pi)`
/// up to global phase. Falls back to `QSearch` when the native set is not
/// exactly `{RZ, SqrtX}`.
pub struct ZXZXZDecomposition {
    pub max_depth: u32,
    pub max_retries: usize,
    pub success_threshold: f64,
}

impl ZXZXZDecomposition {
    pub fn new() -> Self {
        Self {
            max_depth: 8,
            max_retries: 4,
            success_threshold: 1e-10,
        }
    }
}

impl Default for ZXZXZDecomposition {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for ZXZXZDecomposition {
    fn name(&self) -> &'static str {
        "zxzxz_decomposition"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        let basis = pass_data.basis_gates.as_ref().ok_or(CompileError::MissingBasisGates)?;
        let closed_form =
            basis.gates().len() == 2 && basis.contains("rz") && basis.contains("sqrt_x");

        let targets: Vec<_> = dag
            .topological_ops()
            .filter_map(|(idx, inst)| {
                let gate = single_qudit_standard_gate(inst)?;
                if matches!(gate, StandardGate::Rz(_) | StandardGate::SqrtX) {
                    return None;
                }
                let matrix = gate.matrix()?;
                Some((idx, inst.qubits.clone(), matrix))
            })
            .collect();

        if targets.is_empty() {
            return Ok(());
        }

        for (idx, location, matrix) in targets {
            let [a, b, c, d] = [matrix[0], matrix[1], matrix[2], matrix[3]];
            let replacement = if closed_form {
                let u = Unitary2x2::new(a, b, c, d);
                let (alpha, beta, gamma, _global_phase) = u.zyz_decomposition();
                vec![
                    Instruction::single_qubit_gate(StandardGate::Rz(gamma.into()), QubitId(0)),
                    Instruction::single_qubit_gate(StandardGate::SqrtX, QubitId(0)),
                    Instruction::single_qubit_gate(
                        StandardGate::Rz(Unitary2x2::normalize_angle(beta + PI).into()),
                        QubitId(0),
                    ),
                    Instruction::single_qubit_gate(StandardGate::SqrtX, QubitId(0)),
                    Instruction::single_qubit_gate(
                        StandardGate::Rz(Unitary2x2::normalize_angle(alpha + PI).into()),
                        QubitId(0),
                    ),
                ]
            } else {
                let target = UnitaryMatrix::from_flat(2, vec![a, b, c, d]);
                let mut search = QSearch::new(SingleQuditLayerGenerator)
                    .with_success_threshold(self.success_threshold)
                    .with_max_layer(self.max_depth);
                search.instantiator = search
                    .instantiator
                    .clone()
                    .with_multistarts(self.max_retries.max(1))
                    .with_seed(pass_data.seed);
                let mut local_data = PassData::new();
                local_data.basis_gates = pass_data.basis_gates.clone();
                local_data.seed = pass_data.seed;
                let result = search.synthesize(&target, &local_data, &ThreadRuntime);
                result.dag().topological_ops().map(|(_, inst)| inst.clone()).collect()
            };
            dag.substitute_node(idx, remap(&replacement, &location))?;
        }
        Ok(())
    }
}
