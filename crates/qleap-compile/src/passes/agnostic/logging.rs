//! Diagnostic and no-op passes: [`LogPass`], [`LogErrorPass`], [`NOOPPass`].

use tracing::info;

use qleap_ir::CircuitDag;

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::pass_data::PassData;

/// Emit a structured log line with the circuit's current size, tagged with
/// a caller-supplied label (e.g. the workflow stage it ran after).
pub struct LogPass {
    label: String,
}

impl LogPass {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Pass for LogPass {
    fn name(&self) -> &'static str {
        "log"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, _pass_data: &mut PassData) -> CompileResult<()> {
        info!(
            label = %self.label,
            num_qubits = dag.num_qubits(),
            num_ops = dag.num_ops(),
            depth = dag.depth(),
            "circuit state",
        );
        Ok(())
    }
}

/// Emit `pass_data.error`, the accumulated synthesis error bound, at its
/// current value.
pub struct LogErrorPass;

impl Pass for LogErrorPass {
    fn name(&self) -> &'static str {
        "log_error"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, _dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        info!(error = pass_data.error, "accumulated synthesis error bound");
        Ok(())
    }
}

/// Does nothing. Useful as the `else` branch of an `IfThenElse`, or as a
/// placeholder while assembling a pipeline.
pub struct NOOPPass;

impl Pass for NOOPPass {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, _dag: &mut CircuitDag, _pass_data: &mut PassData) -> CompileResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qleap_ir::{Circuit, QubitId};

    #[test]
    fn test_log_pass_does_not_mutate() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.sqrt_x(QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        LogPass::new("after_mapping")
            .run(&mut dag, &mut PassData::new())
            .unwrap();

        assert_eq!(dag.num_ops(), 1);
    }

    #[test]
    fn test_log_error_pass_does_not_mutate_error() {
        let mut pass_data = PassData::new();
        pass_data.error = 0.01;
        let mut dag = Circuit::with_size("test", 1, 0).into_dag();

        LogErrorPass.run(&mut dag, &mut pass_data).unwrap();
        assert_eq!(pass_data.error, 0.01);
    }

    #[test]
    fn test_noop_pass_is_inert() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.sqrt_x(QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();
        let mut pass_data = PassData::new();
        pass_data.seed = 7;

        NOOPPass.run(&mut dag, &mut pass_data).unwrap();

        assert_eq!(dag.num_ops(), 1);
        assert_eq!(pass_data.seed, 7);
    }
}
