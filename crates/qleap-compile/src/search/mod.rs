//! Search-based unitary synthesis (§4.5, §4.6): turn a target unitary into
//! a circuit by best-first tree search over [`LayerGenerator`](crate::layer::LayerGenerator)
//! expansions, interleaved with continuous parameter fitting.

pub mod leap;
pub mod qsearch;

pub use leap::Leap;
pub use qsearch::QSearch;
