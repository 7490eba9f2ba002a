//! [`UnfoldPass`]: inline every `CircuitGate` block back into its parent.

use qleap_ir::{CircuitDag, Gate, GateKind, Instruction, InstructionKind};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::pass_data::PassData;

/// Replace every operation whose gate is a `CircuitGate` with its body's
/// instructions, remapped from the block's local qudit indices `[0..m)`
/// through the operation's own qudit list (the block's `location`).
///
/// Runs to a fixed point: a block's body may itself contain nested blocks
/// (e.g. after `ExtendBlockSizePass` fused several blocks together), so one
/// substitution pass is not always enough.
pub struct UnfoldPass;

impl Pass for UnfoldPass {
    fn name(&self) -> &'static str {
        "unfold"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, _pass_data: &mut PassData) -> CompileResult<()> {
        loop {
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

            if block_nodes.is_empty() {
                break;
            }

            for (idx, block, location) in block_nodes {
                let replacement: Vec<Instruction> = block
                    .body
                    .dag()
                    .topological_ops()
                    .map(|(_, inst)| Instruction {
                        kind: inst.kind.clone(),
                        qubits: inst
                            .qubits
                            .iter()
                            .map(|q| location[q.0 as usize])
                            .collect(),
                        clbits: inst.clbits.clone(),
                    })
                    .collect();
                dag.substitute_node(idx, replacement)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qleap_ir::{Circuit, CircuitGate, QubitId};

    #[test]
    fn test_unfold_inlines_single_block() {
        let mut inner = Circuit::with_size("block", 1, 0);
        inner.sqrt_x(QubitId(0)).unwrap();
        inner.sqrt_x(QubitId(0)).unwrap();

        let block = CircuitGate::new("block", inner);
        let mut outer = Circuit::with_size("outer", 1, 0);
        outer.gate(block, vec![QubitId(0)]).unwrap();
        let mut dag = outer.into_dag();

        UnfoldPass.run(&mut dag, &mut PassData::new()).unwrap();

        assert_eq!(dag.num_ops(), 2);
        assert!(dag.topological_ops().all(|(_, inst)| inst.name() == "sqrt_x"));
    }

    #[test]
    fn test_unfold_remaps_qudits_through_location() {
        let mut inner = Circuit::with_size("block", 2, 0);
        inner.cnot(QubitId(0), QubitId(1)).unwrap();

        let block = CircuitGate::new("block", inner);
        let mut outer = Circuit::with_size("outer", 3, 0);
        outer
            .gate(block, vec![QubitId(2), QubitId(0)])
            .unwrap();
        let mut dag = outer.into_dag();

        UnfoldPass.run(&mut dag, &mut PassData::new()).unwrap();

        let (_, inst) = dag.topological_ops().next().unwrap();
        assert_eq!(inst.qubits, vec![QubitId(2), QubitId(0)]);
    }

    #[test]
    fn test_unfold_is_idempotent_on_plain_circuits() {
        let mut circuit = Circuit::with_size("plain", 1, 0);
        circuit.sqrt_x(QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        UnfoldPass.run(&mut dag, &mut PassData::new()).unwrap();
        assert_eq!(dag.num_ops(), 1);
    }

    #[test]
    fn test_unfold_resolves_nested_blocks() {
        let mut innermost = Circuit::with_size("innermost", 1, 0);
        innermost.sqrt_x(QubitId(0)).unwrap();
        let inner_block = CircuitGate::new("inner", innermost);

        let mut middle = Circuit::with_size("middle", 1, 0);
        middle.gate(inner_block, vec![QubitId(0)]).unwrap();
        let outer_block = CircuitGate::new("outer_block", middle);

        let mut outer = Circuit::with_size("outer", 1, 0);
        outer.gate(outer_block, vec![QubitId(0)]).unwrap();
        let mut dag = outer.into_dag();

        UnfoldPass.run(&mut dag, &mut PassData::new()).unwrap();

        assert_eq!(dag.num_ops(), 1);
        let (_, inst) = dag.topological_ops().next().unwrap();
        assert_eq!(inst.name(), "sqrt_x");
    }
}
