//! Built-in compilation passes.
//!
//! Passes are organized into two categories:
//! - [`agnostic`]: Target-agnostic passes that operate purely on DAG structure
//! - [`target`]: Target-specific passes that require hardware pass_data

pub mod agnostic;
pub mod target;

// Re-exports for convenient top-level access.
pub use agnostic::{
    ExtractMeasurements, LogErrorPass, LogPass, MeasurementBarrierVerification, NOOPPass,
    RestoreMeasurements, UnfoldPass, VerificationResult,
};
pub use target::{
    ApplyPlacement, GeneralizedSabreLayoutPass, GeneralizedSabreRoutingPass, GreedyPlacementPass,
    Rebase2QuditGatePass, SetModelPass, U3Decomposition, ZXZXZDecomposition,
};
