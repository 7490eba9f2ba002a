//! `PassData` and related types for pass communication.
//!
//! This module provides the [`PassData`] type, which enables compilation passes
//! to share data with each other: the qubit [`Layout`] and arbitrary
//! custom entries keyed by type. The machine model ([`CouplingMap`](crate::machine::CouplingMap),
//! [`BasisGates`](crate::machine::BasisGates)) lives in [`crate::machine`].
//!
//! # Overview
//!
//! During quantum circuit compilation, multiple passes need to share information:
//! - **Layout pass** determines which logical qubits map to which physical qubits
//! - **Routing pass** uses the coupling map to insert SWAP gates
//! - **Translation pass** uses basis gates to decompose unsupported gates
//!
//! The `PassData` acts as a shared context passed through all compilation passes.
//!
//! # Examples
//!
//! ## Basic usage with target configuration
//!
//! ```
//! use qleap_compile::{PassData, machine::{CouplingMap, BasisGates}};
//!
//! let props = PassData::new()
//!     .with_target(
//!         CouplingMap::linear(5),
//!         BasisGates::rz_sqrt_x_cnot(),
//!     );
//!
//! assert!(props.coupling_map.is_some());
//! assert!(props.basis_gates.as_ref().unwrap().contains("cnot"));
//! ```
//!
//! ## Custom pass_data for pass communication
//!
//! ```
//! use qleap_compile::PassData;
//!
//! // Define a custom property type
//! #[derive(Debug, Clone, PartialEq)]
//! struct OptimizationStats {
//!     gates_removed: usize,
//!     depth_reduction: usize,
//! }
//!
//! let mut props = PassData::new();
//!
//! // Insert custom property
//! props.insert(OptimizationStats {
//!     gates_removed: 15,
//!     depth_reduction: 3,
//! });
//!
//! // Retrieve it later
//! let stats = props.get::<OptimizationStats>().unwrap();
//! assert_eq!(stats.gates_removed, 15);
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};

use qleap_ir::QubitId;

use crate::machine::{BasisGates, CouplingMap};

/// A mapping from logical qubits to physical qubits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    /// Map from logical qubit to physical qubit index.
    logical_to_physical: FxHashMap<QubitId, u32>,
    /// Map from physical qubit index to logical qubit.
    physical_to_logical: FxHashMap<u32, QubitId>,
}

impl Layout {
    /// Create a new empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trivial layout (logical qubit i -> physical qubit i).
    pub fn trivial(num_qubits: u32) -> Self {
        let mut layout = Self::new();
        for i in 0..num_qubits {
            layout.add(QubitId(i), i);
        }
        layout
    }

    /// Add a mapping from logical to physical qubit.
    ///
    /// If the physical qubit is already mapped to a different logical qubit,
    /// the old mapping is removed first to keep both maps consistent.
    /// Similarly, if the logical qubit is already mapped to a different physical
    /// qubit, that old physical mapping is removed.
    pub fn add(&mut self, logical: QubitId, physical: u32) {
        // Remove conflicting physical → logical mapping if it exists.
        if let Some(&old_logical) = self.physical_to_logical.get(&physical) {
            if old_logical != logical {
                self.logical_to_physical.remove(&old_logical);
            }
        }
        // Remove conflicting logical → physical mapping if it exists.
        if let Some(&old_physical) = self.logical_to_physical.get(&logical) {
            if old_physical != physical {
                self.physical_to_logical.remove(&old_physical);
            }
        }
        self.logical_to_physical.insert(logical, physical);
        self.physical_to_logical.insert(physical, logical);
    }

    /// Get the physical qubit for a logical qubit.
    pub fn get_physical(&self, logical: QubitId) -> Option<u32> {
        self.logical_to_physical.get(&logical).copied()
    }

    /// Get the logical qubit for a physical qubit.
    pub fn get_logical(&self, physical: u32) -> Option<QubitId> {
        self.physical_to_logical.get(&physical).copied()
    }

    /// Swap two physical qubits in the layout.
    pub fn swap(&mut self, p1: u32, p2: u32) {
        let l1 = self.physical_to_logical.get(&p1).copied();
        let l2 = self.physical_to_logical.get(&p2).copied();

        if let Some(l1) = l1 {
            self.logical_to_physical.insert(l1, p2);
            self.physical_to_logical.insert(p2, l1);
        } else {
            self.physical_to_logical.remove(&p2);
        }

        if let Some(l2) = l2 {
            self.logical_to_physical.insert(l2, p1);
            self.physical_to_logical.insert(p1, l2);
        } else {
            self.physical_to_logical.remove(&p1);
        }
    }

    /// Get the number of mapped qubits.
    pub fn len(&self) -> usize {
        self.logical_to_physical.len()
    }

    /// Check if the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.logical_to_physical.is_empty()
    }

    /// Iterate over (logical, physical) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (QubitId, u32)> + '_ {
        self.logical_to_physical.iter().map(|(&l, &p)| (l, p))
    }
}

/// Properties shared between compilation passes.
///
/// The `PassData` allows passes to communicate by storing and retrieving
/// typed values. Standard pass_data like layout, coupling map, and basis
/// gates have dedicated public fields for convenience.
///
/// # Standard Properties
///
/// | Field | Type | Description |
/// |-------|------|-------------|
/// | `layout` | [`Layout`] | Logical-to-physical qubit mapping |
/// | `coupling_map` | [`CouplingMap`] | Device connectivity graph |
/// | `basis_gates` | [`BasisGates`] | Native gate set for the target |
///
/// # Custom Properties
///
/// Passes can store arbitrary data using the type-safe [`insert`](Self::insert)
/// and [`get`](Self::get) methods. Each type can have at most one value stored.
///
/// # Examples
///
/// ```
/// use qleap_compile::{PassData, Layout, machine::{CouplingMap, BasisGates}};
///
/// let mut props = PassData::new();
///
/// // Set up target device
/// props.coupling_map = Some(CouplingMap::linear(5));
/// props.basis_gates = Some(BasisGates::rz_sqrt_x_cnot());
///
/// // Layout is typically set by the layout pass
/// props.layout = Some(Layout::trivial(5));
///
/// // Check connectivity
/// let cm = props.coupling_map.as_ref().unwrap();
/// assert!(cm.is_connected(0, 1));
/// assert!(!cm.is_connected(0, 2));
/// ```
#[derive(Debug, Default)]
pub struct PassData {
    /// The unitary this compilation run is implementing, when synthesizing
    /// against a target rather than retargeting an existing circuit.
    pub target: Option<qleap_ir::UnitaryMatrix>,

    /// Qubit layout mapping (logical → physical), i.e. `placement`.
    ///
    /// Set by layout passes, used by routing and translation passes.
    pub layout: Option<Layout>,

    /// Target coupling map defining allowed two-qubit interactions.
    ///
    /// Should be set before running routing passes.
    pub coupling_map: Option<CouplingMap>,

    /// Target basis gates for gate decomposition, i.e. `gate_set`.
    ///
    /// Should be set before running translation passes.
    pub basis_gates: Option<BasisGates>,

    /// PRNG seed, propagated explicitly to every stochastic procedure.
    pub seed: u64,

    /// Accumulated upper-bound distance from cumulative block replacement,
    /// updated by [`ForEachBlock`](crate::pass::ForEachBlock) and
    /// `LogErrorPass`.
    pub error: f64,

    /// Custom pass_data storage (type-erased) — e.g. `psols`, `seed_circuits`.
    custom: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl PassData {
    /// Create a new empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a property set with target configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use qleap_compile::{PassData, machine::{CouplingMap, BasisGates}};
    ///
    /// let props = PassData::new()
    ///     .with_target(CouplingMap::linear(5), BasisGates::cnot_u3());
    ///
    /// assert!(props.coupling_map.is_some());
    /// assert!(props.basis_gates.is_some());
    /// ```
    #[must_use]
    pub fn with_target(mut self, coupling_map: CouplingMap, basis_gates: BasisGates) -> Self {
        self.coupling_map = Some(coupling_map);
        self.basis_gates = Some(basis_gates);
        self
    }

    /// Set the layout.
    ///
    /// # Example
    ///
    /// ```
    /// use qleap_compile::{PassData, Layout};
    ///
    /// let props = PassData::new()
    ///     .with_layout(Layout::trivial(3));
    ///
    /// assert!(props.layout.is_some());
    /// ```
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Insert a custom property.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.custom.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a custom property.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.custom
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Get a mutable custom property.
    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.custom
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Remove a custom property.
    pub fn remove<T: Any>(&mut self) -> Option<T> {
        self.custom
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|v| *v)
    }
}
