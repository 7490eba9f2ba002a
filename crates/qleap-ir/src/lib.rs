//! qleap circuit intermediate representation.
//!
//! This crate provides the core data structures for representing quantum
//! circuits: a DAG-backed [`Circuit`] with a high-level builder API, a
//! closed gate catalog, and the dense unitary algebra used by the search
//! engine to score and compose partial solutions.
//!
//! # Core Components
//!
//! - **Qubits**: [`QubitId`] for addressing.
//! - **Gates**: [`StandardGate`] for the closed catalog (U3, Rz, SqrtX,
//!   Cnot, Swap) and [`CircuitGate`] for composite block gates.
//! - **Parameters**: [`ParameterExpression`] for symbolic circuit templates.
//! - **Instructions**: [`Instruction`] combining gates with their operands.
//! - **DAG**: [`CircuitDag`] for the internal graph representation.
//! - **Circuit**: [`Circuit`] high-level builder API.
//! - **Unitary algebra**: [`unitary::UnitaryMatrix`] for dense `2^n × 2^n`
//!   matrices, distance cost, and tensor composition.
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use qleap_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell_state", 2, 2);
//! circuit.u3(std::f64::consts::FRAC_PI_2, 0.0, std::f64::consts::PI, QubitId(0)).unwrap();
//! circuit.cnot(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! ```

pub mod circuit;
pub mod dag;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod parameter;
pub mod qubit;
pub mod unitary;

pub use circuit::Circuit;
pub use dag::{CircuitDag, CircuitLevel, DagEdge, DagNode, NodeIndex, WireId};
pub use error::{IrError, IrResult};
pub use gate::{CircuitGate, ClassicalCondition, Gate, GateKind, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use parameter::ParameterExpression;
pub use qubit::{Clbit, ClbitId, Qubit, QubitId};
pub use unitary::UnitaryMatrix;
