//! Target-agnostic compilation passes.
//!
//! These passes operate purely on the DAG structure without consulting
//! target-specific pass_data (coupling map, basis gates). They are safe
//! to run on any circuit regardless of the target hardware.

pub mod logging;
pub mod measurements;
pub mod unfold;
pub mod verification;

pub use logging::{LogErrorPass, LogPass, NOOPPass};
pub use measurements::{ExtractMeasurements, RestoreMeasurements};
pub use unfold::UnfoldPass;
pub use verification::{MeasurementBarrierVerification, VerificationResult};
