//! Standard predicates for [`IfThenElse`](crate::pass::IfThenElse) and
//! [`WhileLoop`](crate::pass::WhileLoop).
//!
//! Each function here builds a [`Predicate`] closure rather than a type —
//! there is no predicate trait to implement, only the function shape
//! `(dag, data) -> bool`.

use std::cell::Cell;
use std::sync::Arc;

use qleap_ir::CircuitDag;

use crate::pass::Predicate;
use crate::pass_data::PassData;

/// True iff the circuit has fewer than `n` qudits.
pub fn width_predicate(n: u32) -> Predicate {
    Arc::new(move |dag, _data| (dag.num_qubits() as u32) < n)
}

/// True iff every single-qudit gate in the circuit is already native to the
/// pass data's basis gates. A circuit with no coupling map set has nothing
/// to disqualify it, so this degrades to a pure basis check.
pub fn single_physical_predicate() -> Predicate {
    Arc::new(|dag, data| {
        let Some(basis) = &data.basis_gates else {
            return false;
        };
        dag.topological_ops().all(|(_, inst)| {
            let Some(gate) = inst.as_gate() else {
                return true;
            };
            if gate.num_qubits() != 1 {
                return true;
            }
            basis.contains(gate.name())
        })
    })
}

/// True iff every multi-qudit gate in the circuit is already native to the
/// basis gates *and* respects the coupling map (adjacent physical qubits).
pub fn multi_physical_predicate() -> Predicate {
    Arc::new(|dag, data| {
        let (Some(basis), Some(coupling)) = (&data.basis_gates, &data.coupling_map) else {
            return false;
        };
        dag.topological_ops().all(|(_, inst)| {
            let Some(gate) = inst.as_gate() else {
                return true;
            };
            if gate.num_qubits() < 2 {
                return true;
            }
            if !basis.contains(gate.name()) {
                return false;
            }
            inst.qubits.windows(2).all(|pair| {
                coupling.is_connected(pair[0].0, pair[1].0) || pair[0] == pair[1]
            })
        })
    })
}

/// Negate another predicate.
pub fn not_predicate(inner: Predicate) -> Predicate {
    Arc::new(move |dag, data| !inner(dag, data))
}

/// True iff the circuit's operation count differs from the last time this
/// predicate was evaluated. Always true on the first call, so a `WhileLoop`
/// guarded by a fresh `ChangePredicate` runs its body at least once.
pub fn change_predicate() -> Predicate {
    let last = Cell::new(None::<usize>);
    Arc::new(move |dag, _data| {
        let current = dag.num_ops();
        let changed = last.get() != Some(current);
        last.set(Some(current));
        changed
    })
}

/// True iff the combined count of the named gates has decreased since the
/// last time this predicate was evaluated. Always true on the first call.
pub fn gate_count_predicate(gates: Vec<String>) -> Predicate {
    let last = Cell::new(None::<usize>);
    Arc::new(move |dag, _data| {
        let current = dag
            .topological_ops()
            .filter(|(_, inst)| {
                inst.as_gate()
                    .is_some_and(|g| gates.iter().any(|name| name == g.name()))
            })
            .count();
        let decreased = last.get().is_none_or(|prev| current < prev);
        last.set(Some(current));
        decreased
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qleap_ir::{Circuit, QubitId};

    use crate::machine::{BasisGates, CouplingMap};

    fn dag_with_ops(n: usize) -> CircuitDag {
        let mut circuit = Circuit::with_size("test", 2, 0);
        for _ in 0..n {
            circuit.sqrt_x(QubitId(0)).unwrap();
        }
        circuit.into_dag()
    }

    #[test]
    fn test_width_predicate() {
        let dag = dag_with_ops(0);
        let pred = width_predicate(3);
        let data = PassData::new();
        assert!(pred(&dag, &data));
        assert!(!width_predicate(2)(&dag, &data));
    }

    #[test]
    fn test_single_physical_predicate_requires_basis() {
        let dag = dag_with_ops(1);
        let data = PassData::new();
        assert!(!single_physical_predicate()(&dag, &data));

        let data = PassData::new().with_target(CouplingMap::linear(2), BasisGates::cnot_u3());
        assert!(single_physical_predicate()(&dag, &data));
    }

    #[test]
    fn test_not_predicate_inverts() {
        let dag = dag_with_ops(0);
        let data = PassData::new();
        let always_true: Predicate = Arc::new(|_, _| true);
        assert!(!not_predicate(always_true)(&dag, &data));
    }

    #[test]
    fn test_change_predicate_true_first_then_tracks() {
        let pred = change_predicate();
        let data = PassData::new();

        let dag0 = dag_with_ops(0);
        assert!(pred(&dag0, &data));

        let dag1 = dag_with_ops(0);
        assert!(!pred(&dag1, &data));

        let dag2 = dag_with_ops(1);
        assert!(pred(&dag2, &data));
    }

    #[test]
    fn test_gate_count_predicate_tracks_decrease() {
        let pred = gate_count_predicate(vec!["sqrt_x".to_string()]);
        let data = PassData::new();

        let dag2 = dag_with_ops(2);
        assert!(pred(&dag2, &data));

        let dag2_again = dag_with_ops(2);
        assert!(!pred(&dag2_again, &data));

        let dag1 = dag_with_ops(1);
        assert!(pred(&dag1, &data));
    }
}
