//! Quantum gate types.
//!
//! The catalog is deliberately closed: every circuit in this crate is built
//! from [`StandardGate`] plus one composite, [`CircuitGate`], whose body is a
//! nested [`Circuit`](crate::circuit::Circuit). Partitioning and synthesis
//! both operate on `CircuitGate` as their unit of work, so there is no open
//! "custom gate" escape hatch.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;
use crate::parameter::ParameterExpression;
use crate::unitary::UnitaryMatrix;

/// Standard gates with known semantics.
///
/// `U3` and `Rz` are differentiable (see [`StandardGate::grad`]); the rest
/// are constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Universal single-qubit gate U3(θ, φ, λ).
    U3(
        ParameterExpression,
        ParameterExpression,
        ParameterExpression,
    ),
    /// Rotation around the Z axis.
    Rz(ParameterExpression),
    /// sqrt(X) gate — constant, no parameters.
    SqrtX,
    /// Controlled-X (CNOT) gate.
    Cnot,
    /// SWAP gate.
    Swap,
}

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::U3(..) => "u3",
            StandardGate::Rz(_) => "rz",
            StandardGate::SqrtX => "sqrt_x",
            StandardGate::Cnot => "cnot",
            StandardGate::Swap => "swap",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::U3(..) | StandardGate::Rz(_) | StandardGate::SqrtX => 1,
            StandardGate::Cnot | StandardGate::Swap => 2,
        }
    }

    /// Check if this gate has symbolic (unbound) parameters.
    pub fn is_parameterized(&self) -> bool {
        match self {
            StandardGate::U3(a, b, c) => a.is_symbolic() || b.is_symbolic() || c.is_symbolic(),
            StandardGate::Rz(p) => p.is_symbolic(),
            StandardGate::SqrtX | StandardGate::Cnot | StandardGate::Swap => false,
        }
    }

    /// Whether this gate's unitary depends on its parameters.
    ///
    /// `SqrtX`, `Cnot` and `Swap` are constant; `U3` and `Rz` are
    /// differentiable with respect to their angles.
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            StandardGate::SqrtX | StandardGate::Cnot | StandardGate::Swap
        )
    }

    /// Get parameters of this gate.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            StandardGate::U3(a, b, c) => vec![a, b, c],
            StandardGate::Rz(p) => vec![p],
            StandardGate::SqrtX | StandardGate::Cnot | StandardGate::Swap => vec![],
        }
    }

    /// Dense unitary matrix (row-major), evaluated at the gate's own bound
    /// parameter values. Returns `None` if any parameter is still symbolic;
    /// use [`StandardGate::matrix_at`] to evaluate at an external parameter
    /// vector instead.
    pub fn matrix(&self) -> Option<Vec<Complex64>> {
        match self {
            StandardGate::U3(t, p, l) => {
                Some(u3_matrix(t.as_f64()?, p.as_f64()?, l.as_f64()?))
            }
            StandardGate::Rz(t) => Some(rz_matrix(t.as_f64()?)),
            StandardGate::SqrtX => Some(sqrt_x_matrix()),
            StandardGate::Cnot => Some(cnot_matrix()),
            StandardGate::Swap => Some(swap_matrix()),
        }
    }

    /// Dense unitary matrix evaluated at an externally supplied parameter
    /// vector, in the order returned by [`StandardGate::parameters`].
    pub fn matrix_at(&self, params: &[f64]) -> Vec<Complex64> {
        match self {
            StandardGate::U3(..) => u3_matrix(params[0], params[1], params[2]),
            StandardGate::Rz(_) => rz_matrix(params[0]),
            StandardGate::SqrtX => sqrt_x_matrix(),
            StandardGate::Cnot => cnot_matrix(),
            StandardGate::Swap => swap_matrix(),
        }
    }

    /// Partial derivatives of the unitary with respect to each parameter,
    /// evaluated at `params`. Returns `None` for constant gates.
    pub fn grad(&self, params: &[f64]) -> Option<Vec<Vec<Complex64>>> {
        match self {
            StandardGate::U3(..) => {
                let (t, p, l) = (params[0], params[1], params[2]);
                Some(vec![
                    u3_matrix_dtheta(t, p, l),
                    u3_matrix_dphi(t, p, l),
                    u3_matrix_dlambda(t, p, l),
                ])
            }
            StandardGate::Rz(_) => Some(vec![rz_matrix_dtheta(params[0])]),
            StandardGate::SqrtX | StandardGate::Cnot | StandardGate::Swap => None,
        }
    }
}

fn u3_matrix(theta: f64, phi: f64, lambda: f64) -> Vec<Complex64> {
    let (s, c) = (theta / 2.0).sin_cos();
    let eil = Complex64::from_polar(1.0, lambda);
    let eip = Complex64::from_polar(1.0, phi);
    let eipl = Complex64::from_polar(1.0, phi + lambda);
    vec![
        Complex64::new(c, 0.0),
        -eil * s,
        eip * s,
        eipl * c,
    ]
}

fn u3_matrix_dtheta(theta: f64, phi: f64, lambda: f64) -> Vec<Complex64> {
    let dc = -0.5 * (theta / 2.0).sin();
    let ds = 0.5 * (theta / 2.0).cos();
    let eil = Complex64::from_polar(1.0, lambda);
    let eip = Complex64::from_polar(1.0, phi);
    let eipl = Complex64::from_polar(1.0, phi + lambda);
    vec![
        Complex64::new(dc, 0.0),
        -eil * ds,
        eip * ds,
        eipl * dc,
    ]
}

fn u3_matrix_dphi(theta: f64, phi: f64, lambda: f64) -> Vec<Complex64> {
    let s = (theta / 2.0).sin();
    let c = (theta / 2.0).cos();
    let ieip = Complex64::i() * Complex64::from_polar(1.0, phi);
    let ieipl = Complex64::i() * Complex64::from_polar(1.0, phi + lambda);
    vec![
        Complex64::new(0.0, 0.0),
        Complex64::new(0.0, 0.0),
        ieip * s,
        ieipl * c,
    ]
}

fn u3_matrix_dlambda(theta: f64, phi: f64, lambda: f64) -> Vec<Complex64> {
    let s = (theta / 2.0).sin();
    let c = (theta / 2.0).cos();
    let ieil = Complex64::i() * Complex64::from_polar(1.0, lambda);
    let ieipl = Complex64::i() * Complex64::from_polar(1.0, phi + lambda);
    vec![
        Complex64::new(0.0, 0.0),
        -ieil * s,
        Complex64::new(0.0, 0.0),
        ieipl * c,
    ]
}

fn rz_matrix(theta: f64) -> Vec<Complex64> {
    let em = Complex64::from_polar(1.0, -theta / 2.0);
    let ep = Complex64::from_polar(1.0, theta / 2.0);
    vec![em, Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0), ep]
}

fn rz_matrix_dtheta(theta: f64) -> Vec<Complex64> {
    let dem = Complex64::i() * -0.5 * Complex64::from_polar(1.0, -theta / 2.0);
    let dep = Complex64::i() * 0.5 * Complex64::from_polar(1.0, theta / 2.0);
    vec![dem, Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0), dep]
}

fn sqrt_x_matrix() -> Vec<Complex64> {
    let half = Complex64::new(0.5, 0.5);
    let half_c = Complex64::new(0.5, -0.5);
    vec![half, half_c, half_c, half]
}

fn cnot_matrix() -> Vec<Complex64> {
    let o = Complex64::new(1.0, 0.0);
    let z = Complex64::new(0.0, 0.0);
    vec![
        o, z, z, z, //
        z, o, z, z, //
        z, z, z, o, //
        z, z, o, z, //
    ]
}

fn swap_matrix() -> Vec<Complex64> {
    let o = Complex64::new(1.0, 0.0);
    let z = Complex64::new(0.0, 0.0);
    vec![
        o, z, z, z, //
        z, z, o, z, //
        z, o, z, z, //
        z, z, z, o, //
    ]
}

/// A gate whose body is a nested circuit — the unit of block partitioning.
///
/// `CircuitGate` is how [`super::partition`](crate)-style passes represent a
/// synthesized or to-be-synthesized block: a subcircuit over a contiguous
/// set of locations, addressed through `qubits` relative to the parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitGate {
    /// Name for diagnostics (e.g. `"block_3"`).
    pub name: String,
    /// The nested circuit implementing this gate's body.
    pub body: Box<Circuit>,
    /// Unitary this block must realize, set by
    /// [`Circuit::from_unitary`](crate::circuit::Circuit::from_unitary) before
    /// a synthesis pass has filled in `body`. `None` once synthesized.
    #[serde(skip)]
    pub target: Option<UnitaryMatrix>,
}

impl CircuitGate {
    /// Wrap a circuit as a composite gate.
    pub fn new(name: impl Into<String>, body: Circuit) -> Self {
        Self {
            name: name.into(),
            body: Box::new(body),
            target: None,
        }
    }

    /// Wrap a target unitary with no body yet, pending synthesis.
    pub fn pending(name: impl Into<String>, num_qudits: u32, target: UnitaryMatrix) -> Self {
        Self {
            name: name.into(),
            body: Box::new(Circuit::with_size("pending", num_qudits, 0)),
            target: Some(target),
        }
    }

    /// Number of qudits the nested circuit occupies.
    pub fn num_qubits(&self) -> u32 {
        self.body.num_qubits() as u32
    }

    /// Whether this block still awaits synthesis (has a target but no body ops).
    pub fn is_pending(&self) -> bool {
        self.target.is_some()
    }
}

/// A gate, either standard or a composite `CircuitGate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    /// A standard gate with known semantics.
    Standard(StandardGate),
    /// A composite gate whose body is a nested circuit.
    Circuit(CircuitGate),
}

impl GateKind {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            GateKind::Standard(g) => g.name(),
            GateKind::Circuit(g) => &g.name,
        }
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            GateKind::Standard(g) => g.num_qubits(),
            GateKind::Circuit(g) => g.num_qubits(),
        }
    }

    /// Whether the gate is structurally equal to another: same name, arity
    /// and parameter count. Used by the gate-set-closure invariant rather
    /// than full `PartialEq`, which also compares bound parameter values.
    pub fn structurally_eq(&self, other: &GateKind) -> bool {
        self.name() == other.name() && self.num_qubits() == other.num_qubits()
    }

    /// Whether this gate is constant (no synthesizable parameters).
    pub fn is_constant(&self) -> bool {
        match self {
            GateKind::Standard(g) => g.is_constant(),
            GateKind::Circuit(_) => false,
        }
    }
}

/// Classical condition for conditional gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassicalCondition {
    /// The name of the classical register.
    pub register: String,
    /// The value to compare against.
    pub value: u64,
}

impl ClassicalCondition {
    /// Create a new classical condition.
    pub fn new(register: impl Into<String>, value: u64) -> Self {
        Self {
            register: register.into(),
            value,
        }
    }
}

/// A gate with associated metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// The kind of gate.
    pub kind: GateKind,
    /// Optional label for the gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Optional classical condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ClassicalCondition>,
}

impl Gate {
    /// Create a new gate from a standard gate.
    pub fn standard(gate: StandardGate) -> Self {
        Self {
            kind: GateKind::Standard(gate),
            label: None,
            condition: None,
        }
    }

    /// Create a new composite gate from a nested circuit.
    pub fn circuit(gate: CircuitGate) -> Self {
        Self {
            kind: GateKind::Circuit(gate),
            label: None,
            condition: None,
        }
    }

    /// Add a label to the gate.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a classical condition to the gate.
    #[must_use]
    pub fn with_condition(mut self, condition: ClassicalCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Get the name of this gate.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.kind.num_qubits()
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::standard(gate)
    }
}

impl From<CircuitGate> for Gate {
    fn from(gate: CircuitGate) -> Self {
        Gate::circuit(gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_gate_properties() {
        assert_eq!(StandardGate::SqrtX.num_qubits(), 1);
        assert_eq!(StandardGate::Cnot.num_qubits(), 2);
        assert!(StandardGate::Cnot.is_constant());
        assert!(!StandardGate::Rz(ParameterExpression::symbol("theta")).is_constant());
        assert!(StandardGate::Rz(ParameterExpression::symbol("theta")).is_parameterized());
    }

    #[test]
    fn test_gate_creation() {
        let rz = Gate::standard(StandardGate::Rz(ParameterExpression::constant(0.3)));
        assert_eq!(rz.name(), "rz");
        assert_eq!(rz.num_qubits(), 1);
        assert!(rz.label.is_none());

        let labeled = Gate::standard(StandardGate::SqrtX).with_label("entry");
        assert_eq!(labeled.label, Some("entry".to_string()));
    }

    #[test]
    fn test_structural_equality_ignores_params() {
        let a = GateKind::Standard(StandardGate::Rz(ParameterExpression::constant(0.1)));
        let b = GateKind::Standard(StandardGate::Rz(ParameterExpression::constant(0.9)));
        assert!(a.structurally_eq(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_cnot_matrix_is_unitary_permutation() {
        let m = StandardGate::Cnot.matrix().unwrap();
        assert_eq!(m.len(), 16);
        // Row 2 and row 3 are swapped relative to identity.
        assert_eq!(m[2 * 4 + 3].re, 1.0);
        assert_eq!(m[3 * 4 + 2].re, 1.0);
    }
}
