//! Machine model: coupling map, native gate set, qudit count.
//!
//! A [`Model`] is the hardware contract a workflow compiles against: how many
//! qudits are available, which pairs of them can host a two-qudit gate
//! ([`CouplingMap`]), and which gates are physically realizable
//! ([`BasisGates`]). [`CouplingMap`] precomputes all-pairs distances so the
//! router's swap-scoring never falls back to per-gate BFS.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Target device coupling map.
///
/// The coupling map defines which pairs of physical qubits can
/// interact with two-qubit gates.
///
/// ## Performance
///
/// On construction, a distance matrix is precomputed using BFS from each
/// node. This enables O(1) `distance()` lookups and O(distance) path
/// reconstruction during routing, eliminating per-gate BFS.
///
/// ## Deserialization
///
/// After deserialization, call [`rebuild_caches()`](Self::rebuild_caches) to
/// recompute the adjacency list and distance/predecessor matrices (which are
/// skipped during serialization). Without this call, `distance()` will fall
/// back to per-query BFS, and `shortest_path()` will return `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingMap {
    /// List of connected qubit pairs (bidirectional).
    edges: Vec<(u32, u32)>,
    /// Number of physical qubits.
    num_qubits: u32,
    /// Adjacency list for fast lookup.
    #[serde(skip)]
    adjacency: FxHashMap<u32, Vec<u32>>,
    /// Precomputed all-pairs distance matrix. `dist_matrix[from][to]` is the
    /// shortest-path distance, or `u32::MAX` if unreachable.
    #[serde(skip)]
    dist_matrix: Vec<Vec<u32>>,
    /// Precomputed predecessor matrix for shortest-path reconstruction.
    /// `pred_matrix[from][to]` is the next hop on the shortest path from→to.
    #[serde(skip)]
    pred_matrix: Vec<Vec<u32>>,
}

impl CouplingMap {
    /// Create a new coupling map with the given number of qubits.
    pub fn new(num_qubits: u32) -> Self {
        Self {
            edges: vec![],
            num_qubits,
            adjacency: FxHashMap::default(),
            dist_matrix: vec![],
            pred_matrix: vec![],
        }
    }

    /// Add an edge between two qubits (bidirectional).
    ///
    /// Duplicate edges (including reversed pairs) are silently ignored.
    pub fn add_edge(&mut self, q1: u32, q2: u32) {
        if self
            .edges
            .iter()
            .any(|&(a, b)| (a == q1 && b == q2) || (a == q2 && b == q1))
        {
            return;
        }
        self.edges.push((q1, q2));
        self.adjacency.entry(q1).or_default().push(q2);
        self.adjacency.entry(q2).or_default().push(q1);
    }

    /// Precompute all-pairs shortest paths using BFS from each node.
    /// Called automatically by factory methods (linear, star, full).
    fn precompute_distances(&mut self) {
        let n = self.num_qubits as usize;
        self.dist_matrix = vec![vec![u32::MAX; n]; n];
        self.pred_matrix = vec![vec![u32::MAX; n]; n];

        for src in 0..n {
            self.dist_matrix[src][src] = 0;
            let mut queue = std::collections::VecDeque::new();
            queue.push_back(src as u32);

            while let Some(current) = queue.pop_front() {
                let cur = current as usize;
                for &neighbor in self.adjacency.get(&current).into_iter().flatten() {
                    let nb = neighbor as usize;
                    if self.dist_matrix[src][nb] == u32::MAX {
                        self.dist_matrix[src][nb] = self.dist_matrix[src][cur] + 1;
                        self.pred_matrix[src][nb] = current;
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    /// Rebuild the adjacency list and distance/predecessor matrices from the
    /// edge list. Must be called after deserialization to restore O(1) distance
    /// lookups and shortest-path reconstruction.
    pub fn rebuild_caches(&mut self) {
        self.adjacency.clear();
        for &(q1, q2) in &self.edges {
            self.adjacency.entry(q1).or_default().push(q2);
            self.adjacency.entry(q2).or_default().push(q1);
        }
        self.precompute_distances();
    }

    /// Check if two qubits are directly connected.
    #[inline]
    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        self.adjacency
            .get(&q1)
            .is_some_and(|neighbors| neighbors.contains(&q2))
    }

    /// Get the number of physical qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Get the coupling edges.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Get neighbors of a qubit.
    pub fn neighbors(&self, qubit: u32) -> impl Iterator<Item = u32> + '_ {
        self.adjacency
            .get(&qubit)
            .map(|v| v.iter().copied())
            .into_iter()
            .flatten()
    }

    /// Create a linear coupling map (0-1-2-3-...).
    pub fn linear(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n.saturating_sub(1) {
            map.add_edge(i, i + 1);
        }
        map.precompute_distances();
        map
    }

    /// Create a fully connected coupling map.
    pub fn full(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                map.add_edge(i, j);
            }
        }
        map.precompute_distances();
        map
    }

    /// Create a star topology (center qubit connected to all others).
    pub fn star(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 1..n {
            map.add_edge(0, i);
        }
        map.precompute_distances();
        map
    }

    /// O(1) shortest-path distance lookup using the precomputed matrix.
    /// Falls back to BFS if the matrix has not been precomputed.
    pub fn distance(&self, from: u32, to: u32) -> Option<u32> {
        if from == to {
            return Some(0);
        }

        let (f, t) = (from as usize, to as usize);
        if f < self.dist_matrix.len() && t < self.dist_matrix[f].len() {
            let d = self.dist_matrix[f][t];
            return if d == u32::MAX { None } else { Some(d) };
        }

        self.distance_bfs(from, to)
    }

    /// Reconstruct shortest path from→to using the predecessor matrix.
    /// Returns `None` if no path exists.
    pub fn shortest_path(&self, from: u32, to: u32) -> Option<Vec<u32>> {
        if from == to {
            return Some(vec![from]);
        }

        let (f, t) = (from as usize, to as usize);
        if f >= self.pred_matrix.len() || t >= self.pred_matrix[f].len() {
            return None;
        }

        if self.dist_matrix[f][t] == u32::MAX {
            return None;
        }

        let mut path = vec![to];
        let mut current = to;
        while current != from {
            let pred = self.pred_matrix[f][current as usize];
            if pred == u32::MAX {
                return None;
            }
            path.push(pred);
            current = pred;
        }
        path.reverse();
        Some(path)
    }

    /// BFS fallback for distance computation.
    fn distance_bfs(&self, from: u32, to: u32) -> Option<u32> {
        let mut visited = FxHashMap::default();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((from, 0u32));
        visited.insert(from, 0u32);

        while let Some((current, dist)) = queue.pop_front() {
            for &neighbor in self.adjacency.get(&current).into_iter().flatten() {
                if neighbor == to {
                    return Some(dist + 1);
                }
                if let std::collections::hash_map::Entry::Vacant(e) = visited.entry(neighbor) {
                    e.insert(dist + 1);
                    queue.push_back((neighbor, dist + 1));
                }
            }
        }

        None
    }
}

/// Named subset of the closed gate catalog, naming what a machine model or a
/// rebase target can realize directly.
///
/// `"measure"` and `"barrier"` are always implicitly native; they are not
/// subject to rebase and need not be listed explicitly, though
/// [`universal`](Self::universal) lists them anyway for completeness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasisGates {
    gates: Vec<String>,
}

impl BasisGates {
    /// Create a basis from an explicit gate-name list.
    pub fn new(gates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            gates: gates.into_iter().map(std::convert::Into::into).collect(),
        }
    }

    /// Check if a gate is in the basis.
    pub fn contains(&self, gate: &str) -> bool {
        self.gates.iter().any(|g| g == gate)
    }

    /// Get the basis gates.
    pub fn gates(&self) -> &[String] {
        &self.gates
    }

    /// `{CNOT, U3}`: the default model's native set (§6).
    pub fn cnot_u3() -> Self {
        Self::new(["cnot", "u3", "measure", "barrier"])
    }

    /// `{RZ, SqrtX, CNOT}`: a common hardware-native rotation/entangler pair.
    pub fn rz_sqrt_x_cnot() -> Self {
        Self::new(["rz", "sqrt_x", "cnot", "measure", "barrier"])
    }

    /// Single-qubit basis of exactly `{U3}`, the closed-form target of
    /// [`U3Decomposition`](crate::passes::target::rebase::U3Decomposition).
    pub fn u3_only() -> Self {
        Self::new(["u3", "measure", "barrier"])
    }

    /// Single-qubit basis of exactly `{RZ, SqrtX}`, the closed-form target of
    /// [`ZXZXZDecomposition`](crate::passes::target::rebase::ZXZXZDecomposition).
    pub fn rz_sqrt_x() -> Self {
        Self::new(["rz", "sqrt_x", "measure", "barrier"])
    }

    /// Every gate in the closed catalog.
    pub fn universal() -> Self {
        Self::new(["u3", "rz", "sqrt_x", "cnot", "swap", "measure", "barrier"])
    }
}

/// The machine model `M = (num_qudits, coupling_graph, gate_set)` (§3).
///
/// Invariants enforced by callers (`compile`, not this type): `num_qudits ≥
/// input.num_qudits`; at least one entangling gate present when
/// `num_qudits > 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub num_qudits: u32,
    pub coupling_map: CouplingMap,
    pub gate_set: BasisGates,
}

impl Model {
    pub fn new(num_qudits: u32, coupling_map: CouplingMap, gate_set: BasisGates) -> Self {
        Self {
            num_qudits,
            coupling_map,
            gate_set,
        }
    }

    /// All-to-all `n`-qubit hardware with `{CNOT, U3}` native set — the
    /// default model used by [`compile`](crate::compile::compile) when none
    /// is supplied.
    pub fn all_to_all(num_qudits: u32) -> Self {
        Self::new(num_qudits, CouplingMap::full(num_qudits), BasisGates::cnot_u3())
    }

    /// True iff the model has at least one entangling (multi-qudit) gate
    /// in its native set.
    pub fn has_entangling_gate(&self) -> bool {
        self.gate_set.contains("cnot") || self.gate_set.contains("swap")
    }
}
