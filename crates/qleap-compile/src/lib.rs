//! qleap Compilation and Transpilation Framework
//!
//! This crate provides the compilation infrastructure for transforming
//! quantum circuits to run on target hardware. It implements a pass-based
//! architecture similar to LLVM, enabling modular and extensible compilation.
//!
//! # Overview
//!
//! [`compile`] turns an input circuit, target unitary, or target state (a
//! [`CompileInput`]) into a circuit whose gates are native to a
//! [`Model`]'s basis and whose two-qudit gates respect its coupling graph.
//! Internally it runs a fixed [`workflow`] of passes that:
//! 1. **Synthesis**: turn any target-unitary block into native gates (LEAP/QSearch)
//! 2. **Mapping**: place logical qudits onto physical qudits and route around the topology
//! 3. **Retargeting**: rebase gates outside the native set onto it
//! 4. **Optimization**: partition, re-synthesize, and keep only strict improvements
//!
//! # Architecture
//!
//! ```text
//! CompileInput (Circuit | Unitary | State)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  workflow   │ ◄── PassData (coupling map, basis gates, layout, seed, error)
//! └─────────────┘
//!       │
//!       ├── ExtractMeasurements / SetModel / ResolvePendingBlocks
//!       ├── GreedyPlacementPass / GeneralizedSabreLayoutPass / GeneralizedSabreRoutingPass
//!       ├── Rebase2QuditGatePass / U3Decomposition / ZXZXZDecomposition
//!       ├── QuickPartitioner + ForEachBlock(resynthesize) + UnfoldPass  (opt ≥ 2)
//!       └── LogErrorPass / ApplyPlacement / RestoreMeasurements
//!       │
//!       ▼
//! Output Circuit (hardware-native)
//! ```
//!
//! # Example: Basic Compilation
//!
//! ```rust
//! use qleap_compile::{compile, CompileOptions, CouplingMap, BasisGates, Model};
//! use qleap_ir::Circuit;
//!
//! let mut circuit = Circuit::with_size("bell", 2, 0);
//! circuit.sqrt_x(qleap_ir::QubitId(0)).unwrap();
//! circuit.cnot(qleap_ir::QubitId(0), qleap_ir::QubitId(1)).unwrap();
//!
//! let model = Model::new(5, CouplingMap::star(5), BasisGates::cnot_u3());
//! let options = CompileOptions::new().with_model(model).with_optimization_level(2);
//!
//! let compiled = compile(circuit.into(), &options).unwrap();
//! println!("compiled depth: {}", compiled.depth());
//! ```
//!
//! # Optimization Levels (§4.12)
//!
//! | Level | Stages |
//! |-------|--------|
//! | 1 | Mapping + Retarget-MQ + Retarget-SQ |
//! | 2 | + delete loop (partition, re-synthesize, keep strict improvements) |
//! | 3 | + pre-delete loop (before mapping) and a deeper resynth loop |
//! | 4 | reserved, unimplemented ([`CompileError::UnsupportedOptimizationLevel`]) |
//!
//! # Built-in Passes
//!
//! ## Mapping Passes
//! - [`passes::GreedyPlacementPass`]: initial logical→physical assignment
//! - [`passes::GeneralizedSabreLayoutPass`]: forward/backward sweep refinement
//! - [`passes::GeneralizedSabreRoutingPass`]: SWAP insertion for connectivity
//!
//! ## Retargeting Passes
//! - [`passes::Rebase2QuditGatePass`]: two-qudit template rebase
//! - [`passes::U3Decomposition`] / [`passes::ZXZXZDecomposition`]: single-qudit rebase
//!
//! ## Structural Passes
//! - [`partition::QuickPartitioner`] / [`partition::ExtendBlockSizePass`]: block partitioning
//! - [`passes::UnfoldPass`]: inline blocks back into their parent
//! - [`passes::ExtractMeasurements`] / [`passes::RestoreMeasurements`]: measurement bracketing
//!
//! # Custom Passes
//!
//! Implement the [`Pass`] trait to create custom compilation passes:
//!
//! ```rust
//! use qleap_compile::{Pass, PassKind, CompileResult, PassData};
//! use qleap_ir::CircuitDag;
//!
//! struct MyCustomPass;
//!
//! impl Pass for MyCustomPass {
//!     fn name(&self) -> &str { "my_custom_pass" }
//!     fn kind(&self) -> PassKind { PassKind::Transformation }
//!
//!     fn run(&self, dag: &mut CircuitDag, props: &mut PassData) -> CompileResult<()> {
//!         // Your pass logic here
//!         Ok(())
//!     }
//! }
//! ```

pub mod compile;
pub mod error;
pub mod frontier;
pub mod instantiate;
pub mod layer;
pub mod machine;
pub mod partition;
pub mod pass;
pub mod pass_data;
pub mod predicates;
pub mod replace_filter;
pub mod runtime;
pub mod search;
pub mod unitary;
pub mod workflow;

// Built-in passes
pub mod passes;

pub use compile::{compile, CompileInput, CompileOptions, StateVector};
pub use error::{CompileError, CompileResult};
pub use instantiate::LeastSquaresInstantiator;
pub use machine::{BasisGates, CouplingMap, Model};
pub use pass::{AnalysisPass, Pass, PassKind, TransformationPass};
pub use pass_data::{Layout, PassData};
pub use runtime::{Runtime, SequentialRuntime, ThreadRuntime};
pub use search::{Leap, QSearch};
