//! Pass trait and composable pass builders.
//!
//! All passes share the contract [`Pass::run`]: mutate a [`CircuitDag`] and
//! optionally the shared [`PassData`]. The composites below — [`PassGroup`],
//! [`IfThenElse`], [`WhileLoop`], [`ForEachBlock`] — build larger passes out
//! of smaller ones without introducing a class hierarchy; predicates are
//! plain `Fn(&CircuitDag, &PassData) -> bool` closures, not a predicate
//! trait.

use std::sync::Arc;

use qleap_ir::{Circuit, CircuitDag, CircuitGate, Gate, GateKind, InstructionKind, QubitId};

use crate::error::CompileResult;
use crate::pass_data::PassData;

/// The kind of compilation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Analysis pass that reads but does not modify the DAG.
    Analysis,
    /// Transformation pass that modifies the DAG.
    Transformation,
}

/// A compilation pass that operates on a circuit DAG.
///
/// Passes are the fundamental unit of compilation in qleap. Each pass
/// performs a specific transformation or analysis on the circuit.
pub trait Pass: Send + Sync {
    /// Get the name of this pass.
    fn name(&self) -> &str;

    /// Get the kind of this pass.
    fn kind(&self) -> PassKind;

    /// Run the pass on the given DAG.
    ///
    /// For analysis passes, this should not modify the DAG but may
    /// write to the `PassData`.
    ///
    /// For transformation passes, this modifies the DAG and may read
    /// from the `PassData`.
    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()>;

    /// Check if this pass should run based on current state.
    ///
    /// This can be overridden to skip passes that are not needed.
    fn should_run(&self, _dag: &CircuitDag, _pass_data: &PassData) -> bool {
        true
    }
}

/// Marker trait for analysis passes.
///
/// Analysis passes read the DAG and write to the `PassData`.
/// They should NOT modify the DAG.
pub trait AnalysisPass: Send + Sync {
    /// Get the name of this analysis pass.
    fn name(&self) -> &str;

    /// Analyze the circuit and update pass_data.
    fn analyze(&self, dag: &CircuitDag, pass_data: &mut PassData) -> CompileResult<()>;

    /// Check if this pass should run.
    fn should_run(&self, _dag: &CircuitDag, _pass_data: &PassData) -> bool {
        true
    }
}

/// Marker trait for transformation passes.
///
/// Transformation passes modify the DAG.
/// They may read from the `PassData` but should NOT modify it.
pub trait TransformationPass: Send + Sync {
    /// Get the name of this transformation pass.
    fn name(&self) -> &str;

    /// Transform the circuit.
    fn transform(&self, dag: &mut CircuitDag, pass_data: &PassData) -> CompileResult<()>;

    /// Check if this pass should run.
    fn should_run(&self, _dag: &CircuitDag, _pass_data: &PassData) -> bool {
        true
    }
}

/// A pure inspector `(dag, data) -> bool` used by [`IfThenElse`] and
/// [`WhileLoop`]. Predicates must be idempotent-safe: evaluating one twice
/// in a row with no intervening mutation must return the same answer.
pub type Predicate = Arc<dyn Fn(&CircuitDag, &PassData) -> bool + Send + Sync>;

/// Decides whether a re-synthesized block replaces the original it came
/// from: `(new, old_block, old_body, location)`, where `location` maps the
/// block's local qudit indices `[0..m)` to the parent circuit's qudits (the
/// operation's operand list). See [`crate::replace_filter`] for the
/// standard implementation.
pub type ReplaceFilter =
    Arc<dyn Fn(&Circuit, &CircuitGate, &Circuit, &[QubitId]) -> bool + Send + Sync>;

/// Run a sequence of passes in order.
pub struct PassGroup {
    passes: Vec<Box<dyn Pass>>,
}

impl PassGroup {
    pub fn new(passes: Vec<Box<dyn Pass>>) -> Self {
        Self { passes }
    }
}

impl Pass for PassGroup {
    fn name(&self) -> &str {
        "pass_group"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        for pass in &self.passes {
            if pass.should_run(dag, pass_data) {
                pass.run(dag, pass_data)?;
            }
        }
        Ok(())
    }
}

/// Run `then` if `predicate` holds, else `else_pass` (if present).
pub struct IfThenElse {
    predicate: Predicate,
    then_pass: Box<dyn Pass>,
    else_pass: Option<Box<dyn Pass>>,
}

impl IfThenElse {
    pub fn new(predicate: Predicate, then_pass: Box<dyn Pass>) -> Self {
        Self {
            predicate,
            then_pass,
            else_pass: None,
        }
    }

    #[must_use]
    pub fn with_else(mut self, else_pass: Box<dyn Pass>) -> Self {
        self.else_pass = Some(else_pass);
        self
    }
}

impl Pass for IfThenElse {
    fn name(&self) -> &str {
        "if_then_else"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        if (self.predicate)(dag, pass_data) {
            self.then_pass.run(dag, pass_data)
        } else if let Some(else_pass) = &self.else_pass {
            else_pass.run(dag, pass_data)
        } else {
            Ok(())
        }
    }
}

/// Repeat `body` while `predicate` holds.
pub struct WhileLoop {
    predicate: Predicate,
    body: Box<dyn Pass>,
    /// Safety valve against a non-terminating predicate; `0` means unbounded.
    max_iterations: usize,
}

impl WhileLoop {
    pub fn new(predicate: Predicate, body: Box<dyn Pass>) -> Self {
        Self {
            predicate,
            body,
            max_iterations: 0,
        }
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

impl Pass for WhileLoop {
    fn name(&self) -> &str {
        "while_loop"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        let mut iterations = 0usize;
        while (self.predicate)(dag, pass_data) {
            self.body.run(dag, pass_data)?;
            iterations += 1;
            if self.max_iterations != 0 && iterations >= self.max_iterations {
                break;
            }
        }
        Ok(())
    }
}

/// For every operation whose gate is a [`CircuitGate`], extract its body,
/// run `inner` on it with a forked `PassData`, and — if `replace_filter`
/// accepts the result — replace the block in place.
///
/// When `calculate_error_bound` is set, the Hilbert-Schmidt distance between
/// the old and new block unitaries is accumulated into `pass_data`'s error
/// entry via triangle inequality (blocks run in topological order, so the
/// accumulation is commutative for the bound being computed).
pub struct ForEachBlock {
    inner: Box<dyn Pass>,
    replace_filter: Option<ReplaceFilter>,
    calculate_error_bound: bool,
}

impl ForEachBlock {
    pub fn new(inner: Box<dyn Pass>) -> Self {
        Self {
            inner,
            replace_filter: None,
            calculate_error_bound: false,
        }
    }

    #[must_use]
    pub fn with_replace_filter(mut self, replace_filter: ReplaceFilter) -> Self {
        self.replace_filter = Some(replace_filter);
        self
    }

    #[must_use]
    pub fn with_error_bound(mut self, calculate_error_bound: bool) -> Self {
        self.calculate_error_bound = calculate_error_bound;
        self
    }
}

impl Pass for ForEachBlock {
    fn name(&self) -> &str {
        "for_each_block"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        let block_nodes: Vec<_> = dag
            .topological_ops()
            .filter_map(|(idx, inst)| match &inst.kind {
                InstructionKind::Gate(Gate {
                    kind: GateKind::Circuit(block),
                    ..
                }) => Some((idx, block.clone(), inst.qubits.clone())),
                _ => None,
            })
            .collect();

        let mut total_error = 0.0f64;

        for (idx, old_block, location) in block_nodes {
            let org = (*old_block.body).clone();
            let mut nested_dag = org.clone().into_dag();
            // Forked data: the nested pipeline gets its own layout/coupling/basis
            // view seeded from the parent, merged back only via the replace. The
            // seed is derived per block so sibling blocks don't replay identical
            // search trajectories.
            let mut nested_data = PassData::new();
            nested_data.coupling_map = pass_data.coupling_map.clone();
            nested_data.basis_gates = pass_data.basis_gates.clone();
            nested_data.seed = pass_data.seed ^ (idx.index() as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);

            self.inner.run(&mut nested_dag, &mut nested_data)?;
            let new_circuit = Circuit::from_dag(nested_dag);

            let accept = match &self.replace_filter {
                Some(filter) => filter(&new_circuit, &old_block, &org, &location),
                None => true,
            };

            if accept {
                if self.calculate_error_bound {
                    let old_unitary = org.get_unitary();
                    let new_unitary = new_circuit.get_unitary();
                    total_error += old_unitary.distance(&new_unitary);
                }

                let new_block = CircuitGate {
                    name: old_block.name.clone(),
                    body: Box::new(new_circuit),
                    target: None,
                };

                if let Some(inst) = dag.get_instruction_mut(idx) {
                    if let InstructionKind::Gate(gate) = &mut inst.kind {
                        gate.kind = GateKind::Circuit(new_block);
                    }
                }
            }
        }

        if self.calculate_error_bound {
            pass_data.error += total_error;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qleap_ir::QubitId;

    struct TestPass;

    impl Pass for TestPass {
        fn name(&self) -> &'static str {
            "test"
        }

        fn kind(&self) -> PassKind {
            PassKind::Transformation
        }

        fn run(&self, _dag: &mut CircuitDag, _pass_data: &mut PassData) -> CompileResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_pass_kind() {
        let pass = TestPass;
        assert_eq!(pass.kind(), PassKind::Transformation);
        assert_eq!(pass.name(), "test");
    }

    /// Appends an `SqrtX` on qubit 0 each time it runs, so tests can observe
    /// how many times a composite actually invoked it.
    struct AppendSqrtX;

    impl Pass for AppendSqrtX {
        fn name(&self) -> &'static str {
            "append_sqrt_x"
        }

        fn kind(&self) -> PassKind {
            PassKind::Transformation
        }

        fn run(&self, dag: &mut CircuitDag, _pass_data: &mut PassData) -> CompileResult<()> {
            let mut circuit = Circuit::from_dag(std::mem::take(dag));
            circuit.sqrt_x(QubitId(0)).unwrap();
            *dag = circuit.into_dag();
            Ok(())
        }
    }

    #[test]
    fn test_pass_group_runs_in_order() {
        let circuit = Circuit::with_size("test", 1, 0);
        let mut dag = circuit.into_dag();

        let group = PassGroup::new(vec![Box::new(AppendSqrtX), Box::new(AppendSqrtX)]);
        let mut pass_data = PassData::new();
        group.run(&mut dag, &mut pass_data).unwrap();

        assert_eq!(dag.num_ops(), 2);
    }

    #[test]
    fn test_if_then_else_picks_branch() {
        let circuit = Circuit::with_size("test", 1, 0);
        let mut dag = circuit.into_dag();
        let always_true: Predicate = Arc::new(|_, _| true);

        let cond = IfThenElse::new(always_true, Box::new(AppendSqrtX))
            .with_else(Box::new(AppendSqrtX));
        let mut pass_data = PassData::new();
        cond.run(&mut dag, &mut pass_data).unwrap();

        assert_eq!(dag.num_ops(), 1);
    }

    #[test]
    fn test_if_then_else_falls_back_to_else() {
        let circuit = Circuit::with_size("test", 1, 0);
        let mut dag = circuit.into_dag();
        let always_false: Predicate = Arc::new(|_, _| false);

        let cond = IfThenElse::new(always_false, Box::new(AppendSqrtX));
        let mut pass_data = PassData::new();
        cond.run(&mut dag, &mut pass_data).unwrap();

        assert_eq!(dag.num_ops(), 0);
    }

    #[test]
    fn test_while_loop_respects_max_iterations() {
        let circuit = Circuit::with_size("test", 1, 0);
        let mut dag = circuit.into_dag();
        let always_true: Predicate = Arc::new(|_, _| true);

        let looped = WhileLoop::new(always_true, Box::new(AppendSqrtX)).with_max_iterations(3);
        let mut pass_data = PassData::new();
        looped.run(&mut dag, &mut pass_data).unwrap();

        assert_eq!(dag.num_ops(), 3);
    }

    #[test]
    fn test_while_loop_never_runs_when_predicate_false() {
        let circuit = Circuit::with_size("test", 1, 0);
        let mut dag = circuit.into_dag();
        let always_false: Predicate = Arc::new(|_, _| false);

        let looped = WhileLoop::new(always_false, Box::new(AppendSqrtX));
        let mut pass_data = PassData::new();
        looped.run(&mut dag, &mut pass_data).unwrap();

        assert_eq!(dag.num_ops(), 0);
    }

    #[test]
    fn test_for_each_block_replaces_body_and_tracks_error() {
        let mut inner = Circuit::with_size("block", 1, 0);
        inner.sqrt_x(QubitId(0)).unwrap();

        let block = CircuitGate {
            name: "block".to_string(),
            body: Box::new(inner),
            target: None,
        };
        let mut outer = Circuit::with_size("outer", 1, 0);
        outer.gate(block, vec![QubitId(0)]).unwrap();
        let mut dag = outer.into_dag();

        let for_each = ForEachBlock::new(Box::new(AppendSqrtX)).with_error_bound(true);
        let mut pass_data = PassData::new();
        for_each.run(&mut dag, &mut pass_data).unwrap();

        // The inner block now has two SqrtX ops (original + appended), and
        // the error bound should have accumulated a non-negative distance.
        assert_eq!(dag.num_ops(), 1);
        assert!(pass_data.error >= 0.0);
    }

    #[test]
    fn test_for_each_block_replace_filter_can_reject() {
        let mut inner = Circuit::with_size("block", 1, 0);
        inner.sqrt_x(QubitId(0)).unwrap();

        let block = CircuitGate {
            name: "block".to_string(),
            body: Box::new(inner.clone()),
            target: None,
        };
        let mut outer = Circuit::with_size("outer", 1, 0);
        outer.gate(block, vec![QubitId(0)]).unwrap();
        let mut dag = outer.into_dag();

        let reject_all: ReplaceFilter = Arc::new(|_, _, _, _| false);
        let for_each = ForEachBlock::new(Box::new(AppendSqrtX)).with_replace_filter(reject_all);
        let mut pass_data = PassData::new();
        for_each.run(&mut dag, &mut pass_data).unwrap();

        let (_, inst) = dag
            .topological_ops()
            .next()
            .expect("expected one instruction");
        let gate = inst.as_gate().expect("expected a gate instruction");
        match &gate.kind {
            GateKind::Circuit(cg) => assert_eq!(cg.body.dag().num_ops(), 1),
            _ => panic!("expected a circuit gate"),
        }
    }
}
