//! Public entry point (§6): [`compile`] turns a [`CompileInput`] into a
//! circuit native to [`CompileOptions::model`]'s gate set and topology.

use num_complex::Complex64;
use tracing::warn;

use qleap_ir::{Circuit, UnitaryMatrix};

use crate::error::{CompileError, CompileResult};
use crate::machine::Model;
use crate::pass::Pass;
use crate::pass_data::PassData;
use crate::workflow;

/// A target state vector to prepare. Carried only so [`CompileInput`] is
/// complete per §6 — state-preparation synthesis stays an unimplemented
/// stub (Non-goals, §9).
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector(Vec<Complex64>);

impl StateVector {
    /// `amplitudes.len()` must be a power of two (`2^n` qudits).
    pub fn new(amplitudes: Vec<Complex64>) -> CompileResult<Self> {
        if amplitudes.is_empty() || !amplitudes.len().is_power_of_two() {
            return Err(CompileError::InvalidInput(format!(
                "state vector length {} is not a power of two",
                amplitudes.len()
            )));
        }
        Ok(Self(amplitudes))
    }

    pub fn amplitudes(&self) -> &[Complex64] {
        &self.0
    }

    pub fn num_qudits(&self) -> u32 {
        self.0.len().trailing_zeros()
    }
}

/// The dynamically-typed `input` parameter (§6), modelled as a tagged union
/// since Rust has no runtime type dispatch: a circuit, a target unitary to
/// synthesize from scratch, or a target state to prepare.
pub enum CompileInput {
    Circuit(Circuit),
    Unitary(UnitaryMatrix),
    State(StateVector),
}

impl From<Circuit> for CompileInput {
    fn from(circuit: Circuit) -> Self {
        Self::Circuit(circuit)
    }
}

impl From<UnitaryMatrix> for CompileInput {
    fn from(unitary: UnitaryMatrix) -> Self {
        Self::Unitary(unitary)
    }
}

impl From<StateVector> for CompileInput {
    fn from(state: StateVector) -> Self {
        Self::State(state)
    }
}

/// Tunables for [`compile`] (§6); defaults mirror the distilled spec's
/// keyword defaults (`optimization_level=1`, `max_synthesis_size=3`,
/// `synthesis_epsilon=1e-10`, `error_sim_size=8`). `model` defaults to an
/// all-to-all `{CNOT, U3}` machine sized to the input when left `None`.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub model: Option<Model>,
    pub optimization_level: u8,
    pub max_synthesis_size: u32,
    pub synthesis_epsilon: f64,
    pub error_threshold: Option<f64>,
    pub error_sim_size: u32,
    pub seed: u64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            model: None,
            optimization_level: 1,
            max_synthesis_size: 3,
            synthesis_epsilon: 1e-10,
            error_threshold: None,
            error_sim_size: 8,
            seed: 0,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub fn with_optimization_level(mut self, level: u8) -> Self {
        self.optimization_level = level;
        self
    }

    #[must_use]
    pub fn with_max_synthesis_size(mut self, size: u32) -> Self {
        self.max_synthesis_size = size;
        self
    }

    #[must_use]
    pub fn with_synthesis_epsilon(mut self, epsilon: f64) -> Self {
        self.synthesis_epsilon = epsilon;
        self
    }

    #[must_use]
    pub fn with_error_threshold(mut self, threshold: f64) -> Self {
        self.error_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn with_error_sim_size(mut self, size: u32) -> Self {
        self.error_sim_size = size;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Width of the widest actual gate in `circuit` (`Measure`/`Reset`/
/// `Barrier`/`Delay` don't count — §6's "gate wider than max_synthesis_size"
/// case only concerns what a partitioner would have to fit in one block).
fn widest_gate(circuit: &Circuit) -> u32 {
    circuit
        .dag()
        .topological_ops()
        .filter_map(|(_, inst)| inst.as_gate().map(|_| inst.qubits.len() as u32))
        .max()
        .unwrap_or(0)
}

/// Compile `input` against `options.model`. Returns a circuit whose gates
/// are native to the model's basis and whose two-qudit gates respect its
/// coupling graph — §6's success criterion: `cost(circuit, input) ≤
/// synthesis_epsilon`, or per-block cost bounds for every replaced block.
///
/// Failure modes (§6): [`CompileError::CircuitTooLarge`] when the model has
/// fewer qudits than the input or the input contains a gate wider than
/// `max_synthesis_size`; [`CompileError::NoEntanglingGate`] when the model
/// exposes no multi-qudit gate for `n > 1`; [`CompileError::UnsupportedStatePrep`]
/// for [`CompileInput::State`] (Non-goal); [`CompileError::UnsupportedOptimizationLevel`]
/// for any level outside `{1, 2, 3}`.
pub fn compile(input: CompileInput, options: &CompileOptions) -> CompileResult<Circuit> {
    let circuit = match input {
        CompileInput::Circuit(circuit) => circuit,
        CompileInput::Unitary(unitary) => Circuit::from_unitary(unitary),
        CompileInput::State(_) => return Err(CompileError::UnsupportedStatePrep),
    };

    let num_qudits = circuit.num_qubits() as u32;
    let model = options
        .model
        .clone()
        .unwrap_or_else(|| Model::all_to_all(num_qudits.max(1)));

    if model.num_qudits < num_qudits {
        return Err(CompileError::CircuitTooLarge {
            required: num_qudits,
            available: model.num_qudits,
        });
    }
    if num_qudits > 1 && !model.has_entangling_gate() {
        return Err(CompileError::NoEntanglingGate);
    }
    let widest = widest_gate(&circuit);
    if widest > options.max_synthesis_size {
        return Err(CompileError::CircuitTooLarge {
            required: widest,
            available: options.max_synthesis_size,
        });
    }

    let pipeline = workflow::build(
        options.optimization_level,
        &model,
        options.max_synthesis_size,
        options.synthesis_epsilon,
    )?;

    let mut dag = circuit.into_dag();
    let mut pass_data = PassData::new();
    pass_data.seed = options.seed;
    pipeline.run(&mut dag, &mut pass_data)?;

    if let Some(threshold) = options.error_threshold {
        if pass_data.error > threshold {
            warn!(
                error = pass_data.error,
                threshold, "cumulative synthesis error exceeds the requested threshold"
            );
        }
    }

    Ok(Circuit::from_dag(dag))
}
