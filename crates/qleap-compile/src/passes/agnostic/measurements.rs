//! [`ExtractMeasurements`] / [`RestoreMeasurements`]: detach terminal
//! measurements before synthesis passes run, re-attach them afterward.
//!
//! Synthesis and block-replacement passes reason about unitaries; a
//! `Measure` instruction has no unitary, so it has to be out of the circuit
//! before those passes run. The workflow brackets its whole pipeline with
//! this pair (§4.12).

use qleap_ir::{CircuitDag, ClbitId, InstructionKind, QubitId};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::pass_data::PassData;

/// The `(qubit, clbit)` pairs removed by [`ExtractMeasurements`], stashed in
/// `PassData`'s custom store for [`RestoreMeasurements`] to consume.
#[derive(Debug, Clone, Default)]
struct StashedMeasurements(Vec<(QubitId, ClbitId)>);

/// Remove every `Measure` instruction from the circuit, recording its
/// `(qubit, clbit)` pair in `pass_data` for later restoration.
///
/// Measurements are assumed terminal (nothing depends on their output wire);
/// this pass does not verify that, it only relies on it — `run` then
/// restores them at the tail of the circuit regardless of where in the
/// original circuit they sat.
pub struct ExtractMeasurements;

impl Pass for ExtractMeasurements {
    fn name(&self) -> &'static str {
        "extract_measurements"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        let measure_nodes: Vec<_> = dag
            .topological_ops()
            .filter(|(_, inst)| matches!(inst.kind, InstructionKind::Measure))
            .map(|(idx, inst)| (idx, inst.qubits[0], inst.clbits[0]))
            .collect();

        let mut stashed = pass_data.remove::<StashedMeasurements>().unwrap_or_default();
        for (idx, qubit, clbit) in measure_nodes {
            dag.remove_op(idx)?;
            stashed.0.push((qubit, clbit));
        }
        pass_data.insert(stashed);

        Ok(())
    }
}

/// Re-append every measurement stashed by [`ExtractMeasurements`].
pub struct RestoreMeasurements;

impl Pass for RestoreMeasurements {
    fn name(&self) -> &'static str {
        "restore_measurements"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        let Some(stashed) = pass_data.remove::<StashedMeasurements>() else {
            return Ok(());
        };
        for (qubit, clbit) in stashed.0 {
            dag.apply(qleap_ir::Instruction::measure(qubit, clbit))?;
        }
        Ok(())
    }
}
