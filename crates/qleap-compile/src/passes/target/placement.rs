//! [`ApplyPlacement`]: rename qudits from logical to physical indices
//! according to `pass_data.layout`.

use qleap_ir::{CircuitDag, Instruction, QubitId};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::pass_data::PassData;

/// Rewrite every instruction's qubits from logical to physical indices using
/// `pass_data.layout`. This is the last pass in every workflow pipeline
/// (§4.12): after this point the circuit's qubit indices are physical, and
/// no further pass should consult `layout`.
pub struct ApplyPlacement;

impl Pass for ApplyPlacement {
    fn name(&self) -> &'static str {
        "apply_placement"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        let layout = pass_data.layout.as_ref().ok_or(CompileError::MissingLayout)?;

        let num_physical = pass_data
            .coupling_map
            .as_ref()
            .map_or(dag.num_qubits() as u32, |c| c.num_qubits());

        let mut new_dag = CircuitDag::new();
        for physical in 0..num_physical {
            new_dag.add_qubit(QubitId(physical));
        }
        for clbit in dag.clbits() {
            new_dag.add_clbit(clbit);
        }
        new_dag.set_global_phase(dag.global_phase());
        new_dag.set_level(dag.level());

        for (_, inst) in dag.topological_ops() {
            let qubits = inst
                .qubits
                .iter()
                .map(|q| QubitId(layout.get_physical(*q).unwrap_or(q.0)))
                .collect();
            new_dag.apply(Instruction {
                kind: inst.kind.clone(),
                qubits,
                clbits: inst.clbits.clone(),
            })?;
        }

        *dag = new_dag;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qleap_ir::Circuit;

    use crate::machine::CouplingMap;
    use crate::pass_data::Layout;

    #[test]
    fn test_apply_placement_remaps_qubits() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();

        let mut layout = Layout::new();
        layout.add(QubitId(0), 2);
        layout.add(QubitId(1), 0);
        let mut pass_data = PassData::new().with_layout(layout);
        pass_data.coupling_map = Some(CouplingMap::linear(3));

        ApplyPlacement.run(&mut dag, &mut pass_data).unwrap();

        let (_, inst) = dag.topological_ops().next().unwrap();
        assert_eq!(inst.qubits, vec![QubitId(2), QubitId(0)]);
        assert_eq!(dag.num_qubits(), 3);
    }

    #[test]
    fn test_apply_placement_errors_without_layout() {
        let mut dag = Circuit::with_size("test", 1, 0).into_dag();
        let mut pass_data = PassData::new();
        let err = ApplyPlacement.run(&mut dag, &mut pass_data).unwrap_err();
        assert!(matches!(err, CompileError::MissingLayout));
    }
}
