//! Dense unitary algebra over `2^n × 2^n` matrices.
//!
//! Generalizes the compiler's 2x2 single-qubit unitary helper to arbitrary
//! qudit count, using `ndarray` for storage. This is the type the search
//! engine scores partial solutions against and composes block unitaries
//! with.

use ndarray::Array2;
use num_complex::Complex64;

/// Tolerance used by [`UnitaryMatrix::is_unitary`].
pub const UNITARY_TOLERANCE: f64 = 1e-8;

/// A dense `2^n × 2^n` unitary matrix over qudits of radix 2.
#[derive(Debug, Clone)]
pub struct UnitaryMatrix {
    data: Array2<Complex64>,
}

impl UnitaryMatrix {
    /// Wrap a dense matrix. The dimension must be a power of two.
    ///
    /// # Panics
    ///
    /// Panics if `data` is not square or its dimension is not a power of two.
    pub fn new(data: Array2<Complex64>) -> Self {
        let (rows, cols) = data.dim();
        assert_eq!(rows, cols, "unitary matrix must be square");
        assert!(rows.is_power_of_two(), "dimension {rows} is not a power of two");
        Self { data }
    }

    /// The identity matrix on `num_qudits` qudits.
    pub fn identity(num_qudits: u32) -> Self {
        let dim = 1usize << num_qudits;
        Self::new(Array2::eye(dim))
    }

    /// Build from a flat row-major buffer of length `dim * dim`.
    pub fn from_flat(dim: usize, flat: Vec<Complex64>) -> Self {
        let data = Array2::from_shape_vec((dim, dim), flat)
            .expect("flat buffer length must equal dim * dim");
        Self::new(data)
    }

    /// Matrix dimension (`2^n`).
    pub fn dim(&self) -> usize {
        self.data.nrows()
    }

    /// Number of qudits this unitary acts on.
    pub fn num_qudits(&self) -> u32 {
        self.dim().trailing_zeros()
    }

    /// Read-only access to the underlying dense matrix.
    pub fn as_array(&self) -> &Array2<Complex64> {
        &self.data
    }

    /// Conjugate transpose.
    pub fn dagger(&self) -> Self {
        Self::new(self.data.t().mapv(|v| v.conj()))
    }

    /// Matrix product `self * other`.
    pub fn dot(&self, other: &Self) -> Self {
        Self::new(self.data.dot(&other.data))
    }

    /// Check unitarity: `U† U ≈ I` within [`UNITARY_TOLERANCE`].
    pub fn is_unitary(&self) -> bool {
        let product = self.dagger().dot(self);
        let dim = self.dim();
        for i in 0..dim {
            for j in 0..dim {
                let expected = if i == j { 1.0 } else { 0.0 };
                if (product.data[[i, j]] - Complex64::new(expected, 0.0)).norm()
                    > UNITARY_TOLERANCE
                {
                    return false;
                }
            }
        }
        true
    }

    /// Hilbert-Schmidt distance cost between two same-size unitaries:
    /// `1 − |tr(A · B†)| / dim`. Zero when `A` and `B` are equal up to
    /// global phase, approaching one as they diverge.
    pub fn distance(&self, other: &Self) -> f64 {
        let dim = self.dim() as f64;
        let product = self.dot(&other.dagger());
        let trace: Complex64 = (0..self.dim()).map(|i| product.data[[i, i]]).sum();
        1.0 - trace.norm() / dim
    }

    /// Residuals form of the distance: `A · B† − I`, flattened to a real
    /// vector of `2 · dim²` entries (real, imaginary interleaved per cell).
    /// Used by least-squares instantiators in place of the scalar cost.
    pub fn residuals(&self, target: &Self) -> Vec<f64> {
        let dim = self.dim();
        let product = self.dot(&target.dagger());
        let mut out = Vec::with_capacity(2 * dim * dim);
        for i in 0..dim {
            for j in 0..dim {
                let expected = if i == j { 1.0 } else { 0.0 };
                let diff = product.data[[i, j]] - Complex64::new(expected, 0.0);
                out.push(diff.re);
                out.push(diff.im);
            }
        }
        out
    }

    /// Tensor-lift a smaller unitary acting on `local_qudits` (indices into
    /// the full `num_qudits`-qudit space, big-endian/MSB-first like the rest
    /// of this crate) into the full `2^num_qudits × 2^num_qudits` space,
    /// identity elsewhere. This is how block unitaries compose into a
    /// whole-circuit unitary without materializing a full tensor product
    /// for every intermediate step.
    pub fn lift(local: &UnitaryMatrix, local_qudits: &[u32], num_qudits: u32) -> Self {
        let full_dim = 1usize << num_qudits;
        let local_dim = local.dim();
        debug_assert_eq!(local_dim, 1usize << local_qudits.len());

        let mut data = Array2::<Complex64>::zeros((full_dim, full_dim));
        let other_qudits: Vec<u32> = (0..num_qudits)
            .filter(|q| !local_qudits.contains(q))
            .collect();
        let other_dim = 1usize << other_qudits.len();

        for local_row in 0..local_dim {
            for local_col in 0..local_dim {
                let amp = local.data[[local_row, local_col]];
                if amp == Complex64::new(0.0, 0.0) {
                    continue;
                }
                for spectator in 0..other_dim {
                    let row = scatter_bits(local_row, local_qudits, num_qudits)
                        | scatter_bits(spectator, &other_qudits, num_qudits);
                    let col = scatter_bits(local_col, local_qudits, num_qudits)
                        | scatter_bits(spectator, &other_qudits, num_qudits);
                    data[[row, col]] = amp;
                }
            }
        }
        Self::new(data)
    }
}

/// Scatter the bits of `value` (indexed 0..qudits.len(), MSB-first within
/// `value`) into a `num_qudits`-wide big-endian bit position set named by
/// `qudits`.
fn scatter_bits(value: usize, qudits: &[u32], num_qudits: u32) -> usize {
    let mut out = 0usize;
    for (i, &q) in qudits.iter().enumerate() {
        let bit_pos = num_qudits - 1 - q;
        let bit = (value >> (qudits.len() - 1 - i)) & 1;
        out |= bit << bit_pos;
    }
    out
}

impl PartialEq for UnitaryMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_unitary() {
        let i = UnitaryMatrix::identity(2);
        assert!(i.is_unitary());
        assert_eq!(i.distance(&i), 0.0);
    }

    #[test]
    fn test_distance_orthogonal_is_one() {
        // X on one qubit vs identity: trace(X · I†) = tr(X) = 0.
        let x = UnitaryMatrix::from_flat(
            2,
            vec![
                Complex64::new(0.0, 0.0),
                Complex64::new(1.0, 0.0),
                Complex64::new(1.0, 0.0),
                Complex64::new(0.0, 0.0),
            ],
        );
        let i = UnitaryMatrix::identity(1);
        assert!((x.distance(&i) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_lift_single_qubit_into_two() {
        let x = UnitaryMatrix::from_flat(
            2,
            vec![
                Complex64::new(0.0, 0.0),
                Complex64::new(1.0, 0.0),
                Complex64::new(1.0, 0.0),
                Complex64::new(0.0, 0.0),
            ],
        );
        let lifted = UnitaryMatrix::lift(&x, &[1], 2);
        assert!(lifted.is_unitary());
        // X on qubit 1 (LSB) with qubit 0 untouched: |00> -> |01>.
        assert_eq!(lifted.as_array()[[1, 0]].re, 1.0);
    }
}
