//! [`SetModelPass`]: seed `pass_data` with the machine model a workflow run
//! is targeting.

use qleap_ir::CircuitDag;

use crate::error::CompileResult;
use crate::machine::Model;
use crate::pass::{Pass, PassKind};
use crate::pass_data::PassData;

/// Populate `pass_data.coupling_map` / `pass_data.basis_gates` from a
/// [`Model`]. Always the first pass in a workflow pipeline (§4.12) so every
/// later pass can assume both fields are set.
pub struct SetModelPass {
    model: Model,
}

impl SetModelPass {
    pub fn new(model: Model) -> Self {
        Self { model }
    }
}

impl Pass for SetModelPass {
    fn name(&self) -> &'static str {
        "set_model"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, _dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        pass_data.coupling_map = Some(self.model.coupling_map.clone());
        pass_data.basis_gates = Some(self.model.gate_set.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qleap_ir::Circuit;

    #[test]
    fn test_set_model_populates_coupling_map_and_basis_gates() {
        let mut dag = Circuit::with_size("test", 3, 0).into_dag();
        let mut pass_data = PassData::new();

        SetModelPass::new(Model::all_to_all(3))
            .run(&mut dag, &mut pass_data)
            .unwrap();

        assert!(pass_data.coupling_map.unwrap().is_connected(0, 1));
        assert!(pass_data.basis_gates.unwrap().contains("cnot"));
    }
}
