//! Error types for the compilation crate.

use qleap_ir::error::IrError;
use thiserror::Error;

/// Errors that can occur during compilation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// A routing or translation pass ran before a coupling map was set.
    #[error("no coupling map set in pass data; run SetModel first")]
    MissingCouplingMap,

    /// A pass that depends on a placement ran before layout.
    #[error("no layout set in pass data; run a layout pass first")]
    MissingLayout,

    /// The router could not find a path between two qubits under the
    /// current coupling map.
    #[error("routing failed between qubits {qubit1} and {qubit2}: no path in coupling map")]
    RoutingFailed {
        /// First physical qubit.
        qubit1: u32,
        /// Second physical qubit.
        qubit2: u32,
    },

    /// The input circuit has more qudits than the machine model provides.
    #[error("circuit requires {required} qudits but only {available} are available")]
    CircuitTooLarge {
        /// Qudits required by the input.
        required: u32,
        /// Qudits available on the model.
        available: u32,
    },

    /// A measurement appeared somewhere other than the end of the circuit,
    /// or survived into a block handed to a synthesis pass.
    #[error("measurement violation on qubit {qubit} ('{gate_name}'): {detail}")]
    MeasurementViolation {
        /// Name of the gate that violates measurement placement.
        gate_name: String,
        /// The offending qubit (raw index).
        qubit: u32,
        /// Human-readable description of the violation.
        detail: String,
    },

    /// An underlying IR operation failed.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// A rebase/translation pass ran before basis gates were set.
    #[error("no basis gates set in pass data; run SetModel first")]
    MissingBasisGates,

    /// A gate has no template or closed-form decomposition into the native set.
    #[error("gate '{0}' has no decomposition into the target basis")]
    GateNotInBasis(String),

    /// `optimization_level` outside `{1, 2, 3, 4}`, or `4` (reserved, unimplemented).
    #[error("unsupported optimization level {0}")]
    UnsupportedOptimizationLevel(u8),

    /// State-preparation synthesis was requested; it is a reserved, unimplemented hook.
    #[error("state-preparation synthesis is not implemented")]
    UnsupportedStatePrep,

    /// A qudit of local dimension other than 2 appeared in the input.
    #[error("non-qubit radix encountered; only qubit systems (radix 2) are supported")]
    NonQubitRadix,

    /// Generic invalid-input error raised by the preamble before any pass runs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The machine model has no entangling gate but the circuit has more than one qudit.
    #[error("model exposes no multi-qudit gate for n > 1")]
    NoEntanglingGate,
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
