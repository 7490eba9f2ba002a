//! Layer generators (§4.3): the move set a search pass expands a candidate
//! circuit through. Every variant is polymorphic over `initial_layer` /
//! `successors`; [`Pass`](crate::pass::Pass)-facing search code is generic
//! over [`LayerGenerator`], not over any one variant.

use qleap_ir::{Circuit, QubitId, StandardGate, UnitaryMatrix};

use crate::machine::CouplingMap;
use crate::pass_data::PassData;

/// A move generator for best-first circuit search: `initial_layer` seeds
/// the frontier, `successors` expands one candidate into its children.
pub trait LayerGenerator: Send + Sync {
    /// The starting candidate for a `synthesize(target, data)` call.
    fn initial_layer(&self, target: &UnitaryMatrix, data: &PassData) -> Circuit;

    /// Children of `circuit`, one per move this generator allows.
    fn successors(&self, circuit: &Circuit, data: &PassData) -> Vec<Circuit>;
}

fn coupling_edges(num_qudits: u32, data: &PassData) -> Vec<(u32, u32)> {
    match &data.coupling_map {
        Some(cm) if cm.num_qubits() == num_qudits => cm.edges().to_vec(),
        _ => CouplingMap::full(num_qudits).edges().to_vec(),
    }
}

fn with_u3_layer(num_qudits: u32) -> Circuit {
    let mut circuit = Circuit::with_size("layer", num_qudits, 0);
    for q in 0..num_qudits {
        circuit.u3(0.0, 0.0, 0.0, QubitId(q)).unwrap();
    }
    circuit
}

/// Empty initial circuit with one `U3` per qudit; each successor appends
/// `tq_gate` on one coupling-graph edge, flanked by a fresh `U3` on both
/// qudits of that edge.
pub struct SimpleLayerGenerator {
    tq_gate: StandardGate,
}

impl SimpleLayerGenerator {
    /// `tq_gate` must be a two-qudit [`StandardGate`] (`Cnot` or `Swap`).
    pub fn new(tq_gate: StandardGate) -> Self {
        assert_eq!(
            tq_gate.num_qubits(),
            2,
            "SimpleLayerGenerator requires a two-qudit gate"
        );
        Self { tq_gate }
    }
}

impl LayerGenerator for SimpleLayerGenerator {
    fn initial_layer(&self, target: &UnitaryMatrix, _data: &PassData) -> Circuit {
        with_u3_layer(target.num_qudits())
    }

    fn successors(&self, circuit: &Circuit, data: &PassData) -> Vec<Circuit> {
        let n = circuit.num_qubits() as u32;
        coupling_edges(n, data)
            .into_iter()
            .map(|(a, b)| {
                let mut next = circuit.copy();
                next.gate(self.tq_gate.clone(), [QubitId(a), QubitId(b)])
                    .unwrap();
                next.u3(0.0, 0.0, 0.0, QubitId(a)).unwrap();
                next.u3(0.0, 0.0, 0.0, QubitId(b)).unwrap();
                next
            })
            .collect()
    }
}

/// Specialised for `CNOT`: each successor appends a four-parameter block —
/// `Rz` on both qudits of an edge, the `CNOT`, then `Rz` on both qudits
/// again — a building block known to be universal for two-qudit synthesis
/// when composed.
pub struct FourParamGenerator;

impl LayerGenerator for FourParamGenerator {
    fn initial_layer(&self, target: &UnitaryMatrix, _data: &PassData) -> Circuit {
        Circuit::with_size("layer", target.num_qudits(), 0)
    }

    fn successors(&self, circuit: &Circuit, data: &PassData) -> Vec<Circuit> {
        let n = circuit.num_qubits() as u32;
        coupling_edges(n, data)
            .into_iter()
            .map(|(a, b)| {
                let mut next = circuit.copy();
                next.rz(0.0, QubitId(a)).unwrap();
                next.rz(0.0, QubitId(b)).unwrap();
                next.cnot(QubitId(a), QubitId(b)).unwrap();
                next.rz(0.0, QubitId(a)).unwrap();
                next.rz(0.0, QubitId(b)).unwrap();
                next
            })
            .collect()
    }
}

/// Like [`SimpleLayerGenerator`] but tries every gate in `gate_list` at
/// every edge, for multi-qudit gate choices.
pub struct WideLayerGenerator {
    gate_list: Vec<StandardGate>,
}

impl WideLayerGenerator {
    pub fn new(gate_list: Vec<StandardGate>) -> Self {
        assert!(
            gate_list.iter().all(|g| g.num_qubits() == 2),
            "WideLayerGenerator requires two-qudit gates"
        );
        Self { gate_list }
    }
}

impl LayerGenerator for WideLayerGenerator {
    fn initial_layer(&self, target: &UnitaryMatrix, _data: &PassData) -> Circuit {
        with_u3_layer(target.num_qudits())
    }

    fn successors(&self, circuit: &Circuit, data: &PassData) -> Vec<Circuit> {
        let n = circuit.num_qubits() as u32;
        let edges = coupling_edges(n, data);
        edges
            .into_iter()
            .flat_map(|(a, b)| {
                self.gate_list.iter().map(move |gate| (a, b, gate.clone()))
            })
            .map(|(a, b, gate)| {
                let mut next = circuit.copy();
                next.gate(gate, [QubitId(a), QubitId(b)]).unwrap();
                next.u3(0.0, 0.0, 0.0, QubitId(a)).unwrap();
                next.u3(0.0, 0.0, 0.0, QubitId(b)).unwrap();
                next
            })
            .collect()
    }
}

/// For decomposing a single-qudit unitary: grows a sequence of single-qudit
/// native gates one at a time, drawing from whichever of `{u3, rz, sqrt_x}`
/// `data.basis_gates` makes available. Used as the `QSearch` fallback for
/// rebase when the native set is neither exactly `{U3}` nor `{RZ, SqrtX}`.
pub struct SingleQuditLayerGenerator;

impl SingleQuditLayerGenerator {
    fn native_moves(data: &PassData) -> Vec<StandardGate> {
        let mut moves = vec![];
        if let Some(basis) = &data.basis_gates {
            if basis.contains("u3") {
                moves.push(StandardGate::U3(0.0.into(), 0.0.into(), 0.0.into()));
            }
            if basis.contains("rz") {
                moves.push(StandardGate::Rz(0.0.into()));
            }
            if basis.contains("sqrt_x") {
                moves.push(StandardGate::SqrtX);
            }
        }
        if moves.is_empty() {
            moves.push(StandardGate::U3(0.0.into(), 0.0.into(), 0.0.into()));
        }
        moves
    }
}

impl LayerGenerator for SingleQuditLayerGenerator {
    fn initial_layer(&self, target: &UnitaryMatrix, _data: &PassData) -> Circuit {
        assert_eq!(target.num_qudits(), 1, "single-qudit layer generator only");
        Circuit::with_size("layer", 1, 0)
    }

    fn successors(&self, circuit: &Circuit, data: &PassData) -> Vec<Circuit> {
        Self::native_moves(data)
            .into_iter()
            .map(|gate| {
                let mut next = circuit.copy();
                next.gate(gate, [QubitId(0)]).unwrap();
                next
            })
            .collect()
    }
}

/// Overrides the initial layer and the first `seeds.len() - 1` levels of
/// expansion with a fixed chain of seed circuits, then delegates to `inner`
/// once the chain is exhausted. Seeds must have strictly increasing op
/// counts — the position in the chain is looked up by `circuit.num_ops()`
/// since `Circuit` has no identity-preserving equality.
pub struct SeedLayerGenerator {
    seeds: Vec<Circuit>,
    inner: Box<dyn LayerGenerator>,
}

impl SeedLayerGenerator {
    pub fn new(seeds: Vec<Circuit>, inner: Box<dyn LayerGenerator>) -> Self {
        Self { seeds, inner }
    }

    fn seed_position(&self, circuit: &Circuit) -> Option<usize> {
        self.seeds
            .iter()
            .position(|seed| seed.dag().num_ops() == circuit.dag().num_ops())
    }
}

impl LayerGenerator for SeedLayerGenerator {
    fn initial_layer(&self, target: &UnitaryMatrix, data: &PassData) -> Circuit {
        self.seeds
            .first()
            .map(Circuit::copy)
            .unwrap_or_else(|| self.inner.initial_layer(target, data))
    }

    fn successors(&self, circuit: &Circuit, data: &PassData) -> Vec<Circuit> {
        match self.seed_position(circuit) {
            Some(pos) if pos + 1 < self.seeds.len() => vec![self.seeds[pos + 1].copy()],
            _ => self.inner.successors(circuit, data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::CouplingMap;

    #[test]
    fn test_simple_layer_generator_initial_layer_has_one_u3_per_qudit() {
        let gen = SimpleLayerGenerator::new(StandardGate::Cnot);
        let target = UnitaryMatrix::identity(2);
        let data = PassData::new();
        let layer = gen.initial_layer(&target, &data);
        assert_eq!(layer.dag().num_ops(), 2);
    }

    #[test]
    fn test_simple_layer_generator_successors_one_per_edge() {
        let gen = SimpleLayerGenerator::new(StandardGate::Cnot);
        let mut data = PassData::new();
        data.coupling_map = Some(CouplingMap::linear(3));
        let circuit = Circuit::with_size("layer", 3, 0);

        let successors = gen.successors(&circuit, &data);
        assert_eq!(successors.len(), 2);
        assert_eq!(successors[0].dag().num_ops(), 3);
    }

    #[test]
    fn test_simple_layer_generator_falls_back_to_full_connectivity() {
        let gen = SimpleLayerGenerator::new(StandardGate::Cnot);
        let circuit = Circuit::with_size("layer", 3, 0);
        let data = PassData::new();

        let successors = gen.successors(&circuit, &data);
        assert_eq!(successors.len(), 3);
    }

    #[test]
    fn test_four_param_generator_appends_four_rz_and_one_cnot() {
        let gen = FourParamGenerator;
        let mut data = PassData::new();
        data.coupling_map = Some(CouplingMap::linear(2));
        let circuit = Circuit::with_size("layer", 2, 0);

        let successors = gen.successors(&circuit, &data);
        assert_eq!(successors.len(), 1);
        assert_eq!(successors[0].dag().num_ops(), 5);
    }

    #[test]
    fn test_wide_layer_generator_tries_every_gate_at_every_edge() {
        let gen = WideLayerGenerator::new(vec![StandardGate::Cnot, StandardGate::Swap]);
        let mut data = PassData::new();
        data.coupling_map = Some(CouplingMap::linear(2));
        let circuit = Circuit::with_size("layer", 2, 0);

        let successors = gen.successors(&circuit, &data);
        assert_eq!(successors.len(), 2);
    }

    #[test]
    fn test_single_qudit_layer_generator_uses_basis_gates() {
        let gen = SingleQuditLayerGenerator;
        let mut data = PassData::new();
        data.basis_gates = Some(crate::machine::BasisGates::rz_sqrt_x());
        let circuit = Circuit::with_size("layer", 1, 0);

        let successors = gen.successors(&circuit, &data);
        assert_eq!(successors.len(), 2);
    }

    #[test]
    fn test_seed_layer_generator_follows_seed_chain_then_delegates() {
        let mut seed0 = Circuit::with_size("seed0", 1, 0);
        seed0.sqrt_x(QubitId(0)).unwrap();
        let mut seed1 = Circuit::with_size("seed1", 1, 0);
        seed1.sqrt_x(QubitId(0)).unwrap();
        seed1.sqrt_x(QubitId(0)).unwrap();

        let gen = SeedLayerGenerator::new(
            vec![seed0.copy(), seed1.copy()],
            Box::new(SingleQuditLayerGenerator),
        );
        let data = PassData::new();

        let from_seed0 = gen.successors(&seed0, &data);
        assert_eq!(from_seed0.len(), 1);
        assert_eq!(from_seed0[0].dag().num_ops(), seed1.dag().num_ops());

        let from_seed1 = gen.successors(&seed1, &data);
        assert!(!from_seed1.is_empty());
        assert!(from_seed1[0].dag().num_ops() > seed1.dag().num_ops());
    }
}
