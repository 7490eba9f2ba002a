//! High-level circuit builder API.

use crate::dag::CircuitDag;
use crate::error::{IrError, IrResult};
use crate::gate::{CircuitGate, Gate, GateKind, StandardGate};
use crate::instruction::Instruction;
use crate::parameter::ParameterExpression;
use crate::qubit::{Clbit, ClbitId, Qubit, QubitId};
use crate::unitary::UnitaryMatrix;

/// Fits a circuit's continuous parameters to minimize cost against a target
/// unitary. Defined here as a contract; the actual least-squares/gradient
/// minimiser lives in the compiler crate that drives synthesis, keeping this
/// crate free of an optimisation dependency.
pub trait Instantiator {
    /// Return a parameter vector, in the order of [`Circuit::parameters`],
    /// that minimizes `circuit`'s distance to `target`.
    fn optimize(&self, circuit: &Circuit, target: &UnitaryMatrix) -> Vec<f64>;
}

/// A quantum circuit.
///
/// This provides a high-level API for building quantum circuits,
/// with convenient methods for the closed gate catalog.
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    /// Qubits in the circuit.
    qubits: Vec<Qubit>,
    /// Classical bits in the circuit.
    clbits: Vec<Clbit>,
    /// The underlying DAG representation.
    dag: CircuitDag,
    /// Counter for generating qubit IDs.
    next_qubit_id: u32,
    /// Counter for generating classical bit IDs.
    next_clbit_id: u32,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qubits: vec![],
            clbits: vec![],
            dag: CircuitDag::new(),
            next_qubit_id: 0,
            next_clbit_id: 0,
        }
    }

    /// Create a circuit with a given number of qubits and classical bits.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        let mut circuit = Self::new(name);
        for _ in 0..num_qubits {
            circuit.add_qubit();
        }
        for _ in 0..num_clbits {
            circuit.add_clbit();
        }
        circuit
    }

    /// Add a single qubit to the circuit.
    pub fn add_qubit(&mut self) -> QubitId {
        let id = QubitId(self.next_qubit_id);
        self.next_qubit_id += 1;
        let qubit = Qubit::new(id);
        self.qubits.push(qubit);
        self.dag.add_qubit(id);
        id
    }

    /// Add a quantum register with multiple qubits.
    pub fn add_qreg(&mut self, name: impl Into<String>, size: u32) -> Vec<QubitId> {
        let name = name.into();
        let mut ids = vec![];
        for i in 0..size {
            let id = QubitId(self.next_qubit_id);
            self.next_qubit_id += 1;
            let qubit = Qubit::with_register(id, &name, i);
            self.qubits.push(qubit);
            self.dag.add_qubit(id);
            ids.push(id);
        }
        ids
    }

    /// Add a single classical bit to the circuit.
    pub fn add_clbit(&mut self) -> ClbitId {
        let id = ClbitId(self.next_clbit_id);
        self.next_clbit_id += 1;
        let clbit = Clbit::new(id);
        self.clbits.push(clbit);
        self.dag.add_clbit(id);
        id
    }

    /// Add a classical register with multiple bits.
    pub fn add_creg(&mut self, name: impl Into<String>, size: u32) -> Vec<ClbitId> {
        let name = name.into();
        let mut ids = vec![];
        for i in 0..size {
            let id = ClbitId(self.next_clbit_id);
            self.next_clbit_id += 1;
            let clbit = Clbit::with_register(id, &name, i);
            self.clbits.push(clbit);
            self.dag.add_clbit(id);
            ids.push(id);
        }
        ids
    }

    // =========================================================================
    // Closed gate catalog
    // =========================================================================

    /// Apply the universal single-qubit gate U3(θ, φ, λ).
    pub fn u3(
        &mut self,
        theta: impl Into<ParameterExpression>,
        phi: impl Into<ParameterExpression>,
        lambda: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::single_qubit_gate(
            StandardGate::U3(theta.into(), phi.into(), lambda.into()),
            qubit,
        ))?;
        Ok(self)
    }

    /// Apply an Rz rotation gate.
    pub fn rz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::single_qubit_gate(
            StandardGate::Rz(theta.into()),
            qubit,
        ))?;
        Ok(self)
    }

    /// Apply the sqrt(X) gate.
    pub fn sqrt_x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.dag
            .apply(Instruction::single_qubit_gate(StandardGate::SqrtX, qubit))?;
        Ok(self)
    }

    /// Apply a CNOT gate.
    pub fn cnot(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::two_qubit_gate(
            StandardGate::Cnot,
            control,
            target,
        ))?;
        Ok(self)
    }

    /// Apply a SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.dag
            .apply(Instruction::two_qubit_gate(StandardGate::Swap, q1, q2))?;
        Ok(self)
    }

    // =========================================================================
    // Other operations
    // =========================================================================

    /// Apply a gate (standard or a nested `CircuitGate` block) to qubits.
    pub fn gate(
        &mut self,
        gate: impl Into<Gate>,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::gate(gate, qubits))?;
        Ok(self)
    }

    /// Measure a qubit to a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::measure(qubit, clbit))?;
        Ok(self)
    }

    /// Measure all qubits to corresponding classical bits.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        // Ensure we have enough classical bits
        while self.clbits.len() < self.qubits.len() {
            self.add_clbit();
        }

        let qubits: Vec<_> = self.qubits.iter().map(|q| q.id).collect();
        let clbits: Vec<_> = self
            .clbits
            .iter()
            .map(|c| c.id)
            .take(qubits.len())
            .collect();

        self.dag.apply(Instruction::measure_all(qubits, clbits))?;
        Ok(self)
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::reset(qubit))?;
        Ok(self)
    }

    /// Apply a barrier to specified qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::barrier(qubits))?;
        Ok(self)
    }

    /// Apply a barrier to all qubits.
    pub fn barrier_all(&mut self) -> IrResult<&mut Self> {
        let qubits: Vec<_> = self.qubits.iter().map(|q| q.id).collect();
        self.dag.apply(Instruction::barrier(qubits))?;
        Ok(self)
    }

    /// Apply a delay to a qubit.
    pub fn delay(&mut self, qubit: QubitId, duration: u64) -> IrResult<&mut Self> {
        self.dag.apply(Instruction::delay(qubit, duration))?;
        Ok(self)
    }

    // =========================================================================
    // Sequence-style editing (append/insert/remove/replace/count)
    // =========================================================================

    /// Append an instruction at the end of the circuit.
    pub fn append(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        self.dag.apply(instruction)?;
        Ok(self)
    }

    /// Insert an instruction at `index` in topological order, shifting later
    /// ops down. Rebuilds the DAG from scratch, same approach the compiler's
    /// rebase passes use when an in-place substitution would scramble
    /// ordering.
    pub fn insert(&mut self, index: usize, instruction: Instruction) -> IrResult<&mut Self> {
        let mut ops: Vec<Instruction> = self.ops_in_order();
        if index > ops.len() {
            return Err(IrError::InvalidNode);
        }
        ops.insert(index, instruction);
        self.rebuild_from_ops(ops)?;
        Ok(self)
    }

    /// Remove the `index`-th instruction in topological order, returning it.
    pub fn remove(&mut self, index: usize) -> IrResult<Instruction> {
        let mut ops: Vec<Instruction> = self.ops_in_order();
        if index >= ops.len() {
            return Err(IrError::InvalidNode);
        }
        let removed = ops.remove(index);
        self.rebuild_from_ops(ops)?;
        Ok(removed)
    }

    /// Replace the `index`-th instruction in topological order with a
    /// replacement sequence of instructions (a single gate, or the unrolled
    /// body of a subcircuit).
    pub fn replace(
        &mut self,
        index: usize,
        replacement: impl IntoIterator<Item = Instruction>,
    ) -> IrResult<&mut Self> {
        let mut ops: Vec<Instruction> = self.ops_in_order();
        if index >= ops.len() {
            return Err(IrError::InvalidNode);
        }
        ops.splice(index..=index, replacement);
        self.rebuild_from_ops(ops)?;
        Ok(self)
    }

    /// Count operations whose gate is structurally equal to `gate` (same
    /// name and arity, bound parameter values ignored).
    pub fn count(&self, gate: &GateKind) -> usize {
        self.dag
            .topological_ops()
            .filter(|(_, inst)| {
                inst.as_gate()
                    .is_some_and(|g| g.kind.structurally_eq(gate))
            })
            .count()
    }

    /// Deep copy of this circuit.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    fn ops_in_order(&self) -> Vec<Instruction> {
        self.dag
            .topological_ops()
            .map(|(_, inst)| inst.clone())
            .collect()
    }

    fn rebuild_from_ops(&mut self, ops: Vec<Instruction>) -> IrResult<()> {
        let mut dag = CircuitDag::new();
        for qubit in self.qubits.iter().map(|q| q.id) {
            dag.add_qubit(qubit);
        }
        for clbit in self.clbits.iter().map(|c| c.id) {
            dag.add_clbit(clbit);
        }
        dag.set_global_phase(self.dag.global_phase());
        dag.set_level(self.dag.level());
        for inst in ops {
            dag.apply(inst)?;
        }
        self.dag = dag;
        Ok(())
    }

    // =========================================================================
    // Instantiation and unitary round-trip
    // =========================================================================

    /// Flattened values of every bound continuous parameter, in topological
    /// order, in the order each gate reports its own
    /// [`StandardGate::parameters`](crate::gate::StandardGate::parameters).
    /// Symbolic (unbound) parameters contribute `0.0` as a placeholder.
    pub fn parameters(&self) -> Vec<f64> {
        self.dag
            .topological_ops()
            .filter_map(|(_, inst)| inst.as_gate())
            .filter_map(|g| match &g.kind {
                GateKind::Standard(s) => Some(s.parameters()),
                GateKind::Circuit(_) => None,
            })
            .flat_map(|params| params.into_iter().map(|p| p.as_f64().unwrap_or(0.0)))
            .collect()
    }

    /// Rebind every continuous parameter in topological order from a flat
    /// vector (the inverse of [`Circuit::parameters`]). Errors if the count
    /// does not match.
    pub fn set_parameters(&mut self, params: &[f64]) -> IrResult<()> {
        let ops = self.ops_in_order();
        let mut cursor = 0usize;
        let mut rebuilt = Vec::with_capacity(ops.len());
        for mut inst in ops {
            if let Some(gate) = inst.gate_mut() {
                if let GateKind::Standard(s) = &gate.kind {
                    let n = s.parameters().len();
                    if n > 0 {
                        let slice = params.get(cursor..cursor + n).ok_or_else(|| {
                            IrError::InvalidDag(
                                "set_parameters: parameter vector too short".into(),
                            )
                        })?;
                        gate.kind = GateKind::Standard(rebind(s, slice));
                        cursor += n;
                    }
                }
            }
            rebuilt.push(inst);
        }
        self.rebuild_from_ops(rebuilt)
    }

    /// Fit this circuit's parameters against `target` using `instantiator`,
    /// returning a new circuit with the optimised parameters bound.
    pub fn instantiate(
        &self,
        target: &UnitaryMatrix,
        instantiator: &dyn Instantiator,
    ) -> IrResult<Self> {
        let params = instantiator.optimize(self, target);
        let mut out = self.clone();
        out.set_parameters(&params)?;
        Ok(out)
    }

    /// Wrap `u` as a single pending [`CircuitGate`] over `log2(dim)` qudits,
    /// with no body yet — the starting point for a partitioning/synthesis
    /// workflow before a search pass fills in the block.
    pub fn from_unitary(u: UnitaryMatrix) -> Self {
        let n = u.num_qudits();
        let mut circuit = Self::with_size("from_unitary", n, 0);
        let qubits: Vec<_> = circuit.qubits.iter().map(|q| q.id).collect();
        let block = CircuitGate::pending("block", n, u);
        circuit
            .gate(block, qubits)
            .expect("freshly built circuit always accepts its own block gate");
        circuit
    }

    /// Compose this circuit's unitary by tensor-lifting each gate's matrix
    /// to full width and multiplying in circuit order. `Measure`/`Reset`/
    /// `Barrier`/`Delay` contribute identity.
    ///
    /// # Panics
    ///
    /// Panics if a [`StandardGate`] has an unbound (symbolic) parameter —
    /// callers should [`instantiate`](Self::instantiate) first.
    pub fn get_unitary(&self) -> UnitaryMatrix {
        let n = self.num_qubits() as u32;
        let mut total = UnitaryMatrix::identity(n);
        for inst in self.ops_in_order() {
            let Some(gate) = inst.as_gate() else {
                continue;
            };
            let arity = inst.qubits.len() as u32;
            let op_matrix = match &gate.kind {
                GateKind::Standard(s) => {
                    let flat = s
                        .matrix()
                        .expect("get_unitary requires every parameter to be bound");
                    UnitaryMatrix::from_flat(1usize << arity, flat)
                }
                GateKind::Circuit(cg) => cg.body.get_unitary(),
            };
            let local_qudits: Vec<u32> = inst.qubits.iter().map(|q| q.0).collect();
            let lifted = UnitaryMatrix::lift(&op_matrix, &local_qudits, n);
            total = lifted.dot(&total);
        }
        total
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.clbits.len()
    }

    /// Get the circuit depth.
    pub fn depth(&self) -> usize {
        self.dag.depth()
    }

    /// Get a reference to the underlying DAG.
    pub fn dag(&self) -> &CircuitDag {
        &self.dag
    }

    /// Get a mutable reference to the underlying DAG.
    pub fn dag_mut(&mut self) -> &mut CircuitDag {
        &mut self.dag
    }

    /// Consume the circuit and return the DAG.
    pub fn into_dag(self) -> CircuitDag {
        self.dag
    }

    /// Create a circuit from a DAG.
    pub fn from_dag(dag: CircuitDag) -> Self {
        let num_qubits = dag.num_qubits() as u32;
        let num_clbits = dag.num_clbits() as u32;

        let qubits: Vec<_> = dag.qubits().map(Qubit::new).collect();
        let clbits: Vec<_> = dag.clbits().map(Clbit::new).collect();

        Self {
            name: "circuit".into(),
            qubits,
            clbits,
            dag,
            next_qubit_id: num_qubits,
            next_clbit_id: num_clbits,
        }
    }

    /// Get the qubits in the circuit.
    pub fn qubits(&self) -> &[Qubit] {
        &self.qubits
    }

    /// Get the classical bits in the circuit.
    pub fn clbits(&self) -> &[Clbit] {
        &self.clbits
    }

    // =========================================================================
    // Pre-built circuits
    // =========================================================================

    /// Create a Bell state circuit.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        let q0 = QubitId(0);
        let q1 = QubitId(1);
        let c0 = ClbitId(0);
        let c1 = ClbitId(1);

        circuit
            .u3(std::f64::consts::FRAC_PI_2, 0.0, std::f64::consts::PI, q0)?
            .cnot(q0, q1)?
            .measure(q0, c0)?
            .measure(q1, c1)?;

        Ok(circuit)
    }

    /// Create a GHZ state circuit.
    pub fn ghz(n: u32) -> IrResult<Self> {
        if n == 0 {
            return Ok(Self::new("ghz_0"));
        }

        let mut circuit = Self::with_size("ghz", n, n);

        circuit.u3(
            std::f64::consts::FRAC_PI_2,
            0.0,
            std::f64::consts::PI,
            QubitId(0),
        )?;

        for i in 0..n - 1 {
            circuit.cnot(QubitId(i), QubitId(i + 1))?;
        }

        for i in 0..n {
            circuit.measure(QubitId(i), ClbitId(i))?;
        }

        Ok(circuit)
    }
}

/// Rebuild a [`StandardGate`] with the same variant as `gate`, bound to the
/// values in `params`, in the order [`StandardGate::parameters`] reports.
fn rebind(gate: &StandardGate, params: &[f64]) -> StandardGate {
    match gate {
        StandardGate::U3(..) => StandardGate::U3(
            ParameterExpression::constant(params[0]),
            ParameterExpression::constant(params[1]),
            ParameterExpression::constant(params[2]),
        ),
        StandardGate::Rz(_) => StandardGate::Rz(ParameterExpression::constant(params[0])),
        StandardGate::SqrtX | StandardGate::Cnot | StandardGate::Swap => gate.clone(),
    }
}

impl Clone for Circuit {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            qubits: self.qubits.clone(),
            clbits: self.clbits.clone(),
            dag: self.dag.clone(),
            next_qubit_id: self.next_qubit_id,
            next_clbit_id: self.next_clbit_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_new_circuit() {
        let circuit = Circuit::new("test");
        assert_eq!(circuit.name(), "test");
        assert_eq!(circuit.num_qubits(), 0);
        assert_eq!(circuit.num_clbits(), 0);
    }

    #[test]
    fn test_circuit_with_size() {
        let circuit = Circuit::with_size("test", 3, 2);
        assert_eq!(circuit.num_qubits(), 3);
        assert_eq!(circuit.num_clbits(), 2);
    }

    #[test]
    fn test_add_registers() {
        let mut circuit = Circuit::new("test");
        let qreg = circuit.add_qreg("q", 4);
        let creg = circuit.add_creg("c", 4);

        assert_eq!(qreg.len(), 4);
        assert_eq!(creg.len(), 4);
        assert_eq!(circuit.num_qubits(), 4);
        assert_eq!(circuit.num_clbits(), 4);
    }

    #[test]
    fn test_bell_state() {
        let circuit = Circuit::bell().unwrap();
        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.depth(), 3); // U3, CNOT, parallel measures
    }

    #[test]
    fn test_ghz_state() {
        let circuit = Circuit::ghz(5).unwrap();
        assert_eq!(circuit.num_qubits(), 5);
        assert_eq!(circuit.num_clbits(), 5);
    }

    #[test]
    fn test_parameterized_gate() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.rz(PI / 2.0, QubitId(0)).unwrap();
        circuit
            .rz(ParameterExpression::symbol("theta"), QubitId(0))
            .unwrap();

        assert_eq!(circuit.depth(), 2);
    }

    #[test]
    fn test_fluent_api() {
        let mut circuit = Circuit::with_size("test", 2, 2);
        circuit
            .sqrt_x(QubitId(0))
            .unwrap()
            .cnot(QubitId(0), QubitId(1))
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap()
            .measure(QubitId(1), ClbitId(1))
            .unwrap();

        assert_eq!(circuit.depth(), 3); // SqrtX, CNOT, parallel measures
    }

    #[test]
    fn test_append_insert_remove_replace() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.sqrt_x(QubitId(0)).unwrap();
        circuit
            .insert(0, Instruction::single_qubit_gate(StandardGate::Rz(0.5.into()), QubitId(0)))
            .unwrap();
        assert_eq!(circuit.depth(), 2);

        let removed = circuit.remove(0).unwrap();
        assert_eq!(removed.name(), "rz");
        assert_eq!(circuit.depth(), 1);

        circuit
            .replace(
                0,
                [Instruction::single_qubit_gate(StandardGate::Rz(0.1.into()), QubitId(0))],
            )
            .unwrap();
        assert_eq!(circuit.count(&GateKind::Standard(StandardGate::Rz(0.0.into()))), 1);
    }

    #[test]
    fn test_count_structural() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        circuit.cnot(QubitId(1), QubitId(0)).unwrap();
        circuit.swap(QubitId(0), QubitId(1)).unwrap();

        assert_eq!(
            circuit.count(&GateKind::Standard(StandardGate::Cnot)),
            2
        );
        assert_eq!(
            circuit.count(&GateKind::Standard(StandardGate::Swap)),
            1
        );
    }

    #[test]
    fn test_parameters_round_trip() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.rz(1.23, QubitId(0)).unwrap();
        let params = circuit.parameters();
        assert_eq!(params, vec![1.23]);

        circuit.set_parameters(&[4.56]).unwrap();
        assert_eq!(circuit.parameters(), vec![4.56]);
    }

    #[test]
    fn test_from_unitary_wraps_pending_block() {
        let u = UnitaryMatrix::identity(1);
        let circuit = Circuit::from_unitary(u);
        assert_eq!(circuit.num_qubits(), 1);
        assert_eq!(circuit.depth(), 1);
    }

    #[test]
    fn test_copy_is_deep() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.sqrt_x(QubitId(0)).unwrap();
        let mut copy = circuit.copy();
        copy.sqrt_x(QubitId(0)).unwrap();
        assert_eq!(circuit.depth(), 1);
        assert_eq!(copy.depth(), 2);
    }

    #[test]
    fn test_get_unitary_empty_is_identity() {
        let circuit = Circuit::with_size("test", 2, 0);
        assert_eq!(circuit.get_unitary(), UnitaryMatrix::identity(2));
    }

    #[test]
    fn test_get_unitary_cnot_is_not_identity() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        let u = circuit.get_unitary();
        assert!(u.is_unitary());
        assert_ne!(u, UnitaryMatrix::identity(2));
    }

    #[test]
    fn test_get_unitary_nested_circuit_gate() {
        let mut inner = Circuit::with_size("block", 1, 0);
        inner.sqrt_x(QubitId(0)).unwrap();
        let expected = inner.get_unitary();

        let block = CircuitGate {
            name: "block".to_string(),
            body: Box::new(inner),
            target: None,
        };
        let mut outer = Circuit::with_size("outer", 1, 0);
        outer.gate(block, vec![QubitId(0)]).unwrap();

        assert_eq!(outer.get_unitary(), expected);
    }
}
