//! Target-specific compilation passes.
//!
//! These passes require target hardware pass_data from the PassData
//! (coupling map, basis gates, layout) and produce hardware-compatible
//! circuits for specific quantum devices.

pub mod mapper;
pub mod model;
pub mod placement;
pub mod rebase;

pub use mapper::{GeneralizedSabreLayoutPass, GeneralizedSabreRoutingPass, GreedyPlacementPass};
pub use model::SetModelPass;
pub use placement::ApplyPlacement;
pub use rebase::{Rebase2QuditGatePass, U3Decomposition, ZXZXZDecomposition};
