//! Standard [`ReplaceFilter`] implementations for
//! [`ForEachBlock`](crate::pass::ForEachBlock).
//!
//! A replace filter decides whether a re-synthesized block should overwrite
//! the block it came from. There is no filter trait, only the function
//! shape `(new, old_block, old_body, location) -> bool`, mirroring
//! [`crate::predicates`].

use std::sync::Arc;

use qleap_ir::{Circuit, CircuitGate, QubitId};

use crate::machine::{BasisGates, CouplingMap};
use crate::pass::ReplaceFilter;

/// Always replace, regardless of the result.
pub fn always_accept() -> ReplaceFilter {
    Arc::new(|_new, _old_block, _old_body, _location| true)
}

/// Count `(multi_qudit_ops, single_qudit_ops)` in a circuit, ignoring
/// `Measure`/`Reset`/`Barrier`/`Delay`.
fn mq_sq_counts(circuit: &Circuit) -> (usize, usize) {
    let (mut mq, mut sq) = (0, 0);
    for (_, inst) in circuit.dag().topological_ops() {
        if let Some(gate) = inst.as_gate() {
            if gate.num_qubits() >= 2 {
                mq += 1;
            } else {
                sq += 1;
            }
        }
    }
    (mq, sq)
}

/// Whether every gate in `circuit` is in `basis`.
fn all_native(circuit: &Circuit, basis: &BasisGates) -> bool {
    circuit
        .dag()
        .topological_ops()
        .all(|(_, inst)| inst.as_gate().is_none_or(|g| basis.contains(g.name())))
}

/// Whether every two-qudit operation's location, translated through
/// `old_location`, lands on an edge of `coupling`.
fn all_on_topology(circuit: &Circuit, old_location: &[QubitId], coupling: &CouplingMap) -> bool {
    circuit.dag().topological_ops().all(|(_, inst)| {
        let Some(gate) = inst.as_gate() else {
            return true;
        };
        if gate.num_qubits() < 2 {
            return true;
        }
        inst.qubits.windows(2).all(|pair| {
            let (Some(&a), Some(&b)) = (
                old_location.get(pair[0].0 as usize),
                old_location.get(pair[1].0 as usize),
            ) else {
                return false;
            };
            a == b || coupling.is_connected(a.0, b.0)
        })
    })
}

/// The canonical replace filter: accept a re-synthesized block `new` over
/// its original body `org` iff either the original was already illegal
/// (non-native gate, or an edge off the coupling graph — in which case any
/// attempt at improvement is welcome) or `new` strictly reduces
/// `(multi_qudit_count, single_qudit_count)` compared lexicographically.
/// Ties are rejected deliberately — equal counts are not an improvement.
///
/// `location` maps the block's local qudit indices `[0..m)` to the qudits
/// of the parent circuit the block operates on (`old.location` in the data
/// model); it is what lets criterion 3 check topology.
pub fn standard(basis_gates: BasisGates, coupling_map: CouplingMap) -> ReplaceFilter {
    Arc::new(move |new, _old_block, org, location| {
        if !all_native(org, &basis_gates) {
            return true;
        }
        if !all_on_topology(org, location, &coupling_map) {
            return true;
        }
        mq_sq_counts(new) < mq_sq_counts(org)
    })
}

/// Replace only if the new block has strictly fewer operations than the one
/// it replaces, independent of any machine model.
pub fn accept_if_fewer_gates() -> ReplaceFilter {
    Arc::new(|new, _old_block, old_body, _location| {
        new.dag().num_ops() < old_body.dag().num_ops()
    })
}

/// Replace only if the new block's unitary is within `epsilon` Hilbert-Schmidt
/// distance of the original block's unitary.
pub fn accept_if_within_distance(epsilon: f64) -> ReplaceFilter {
    Arc::new(move |new, _old_block, old_body, _location| {
        old_body.get_unitary().distance(&new.get_unitary()) <= epsilon
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qleap_ir::QubitId;

    fn one_sqrt_x_block() -> CircuitGate {
        let mut body = Circuit::with_size("block", 1, 0);
        body.sqrt_x(QubitId(0)).unwrap();
        CircuitGate {
            name: "block".to_string(),
            body: Box::new(body),
            target: None,
        }
    }

    #[test]
    fn test_always_accept() {
        let block = one_sqrt_x_block();
        let filter = always_accept();
        assert!(filter(&block.body, &block, &block.body, &[QubitId(0)]));
    }

    #[test]
    fn test_accept_if_fewer_gates() {
        let block = one_sqrt_x_block();
        let mut bigger = Circuit::with_size("block", 1, 0);
        bigger.sqrt_x(QubitId(0)).unwrap();
        bigger.sqrt_x(QubitId(0)).unwrap();

        let filter = accept_if_fewer_gates();
        assert!(!filter(&bigger, &block, &block.body, &[QubitId(0)]));
        assert!(!filter(&block.body, &block, &block.body, &[QubitId(0)]));

        let smaller = Circuit::with_size("block", 1, 0);
        assert!(filter(&smaller, &block, &block.body, &[QubitId(0)]));
    }

    #[test]
    fn test_accept_if_within_distance_identical_is_zero() {
        let block = one_sqrt_x_block();
        let filter = accept_if_within_distance(1e-9);
        assert!(filter(&block.body, &block, &block.body, &[QubitId(0)]));
    }

    #[test]
    fn test_standard_rejects_tie() {
        let block = one_sqrt_x_block();
        // rz_sqrt_x basis includes "sqrt_x", so org is native here; `new`
        // identical in shape to `org` means sq_count ties at 1, so reject.
        let filter = standard(BasisGates::rz_sqrt_x(), CouplingMap::linear(1));
        assert!(!filter(&block.body, &block, &block.body, &[QubitId(0)]));
    }

    #[test]
    fn test_standard_accepts_when_original_non_native() {
        let block = one_sqrt_x_block();
        // cnot_u3 basis has no "sqrt_x" entry, so org is non-native: always accept.
        let filter = standard(BasisGates::cnot_u3(), CouplingMap::linear(1));
        assert!(filter(&block.body, &block, &block.body, &[QubitId(0)]));
    }

    #[test]
    fn test_standard_accepts_strict_improvement() {
        let mut org = Circuit::with_size("block", 2, 0);
        org.cnot(QubitId(0), QubitId(1)).unwrap();
        org.cnot(QubitId(0), QubitId(1)).unwrap();
        let block = CircuitGate {
            name: "block".to_string(),
            body: Box::new(org.clone()),
            target: None,
        };

        let improved = Circuit::with_size("block", 2, 0);
        let filter = standard(BasisGates::cnot_u3(), CouplingMap::full(2));
        assert!(filter(&improved, &block, &org, &[QubitId(0), QubitId(1)]));
    }
}
