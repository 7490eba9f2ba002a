//! Mapper / router (§4.9): [`GreedyPlacementPass`] chooses an initial
//! logical→physical assignment, [`GeneralizedSabreLayoutPass`] refines it
//! with forward/backward sweeps, and [`GeneralizedSabreRoutingPass`] inserts
//! the SWAPs the chosen layout still leaves unsatisfied.
//!
//! All three share one scoring primitive: a candidate physical swap is
//! ranked by the coupling-graph distance it leaves between the pair it was
//! chosen for, plus a decayed contribution from a lookahead window of
//! upcoming two-qudit interactions. [`CouplingMap`]'s precomputed all-pairs
//! distances make every such probe O(1).

use rustc_hash::FxHashMap;

use qleap_ir::{CircuitDag, Instruction, InstructionKind, QubitId, StandardGate};

use crate::error::{CompileError, CompileResult};
use crate::machine::CouplingMap;
use crate::pass::{Pass, PassKind};
use crate::pass_data::{Layout, PassData};

/// Every two-qudit interaction in topological order, as logical qubit pairs.
fn two_qudit_interactions(dag: &CircuitDag) -> Vec<(QubitId, QubitId)> {
    dag.topological_ops()
        .filter_map(|(_, inst)| match &inst.kind {
            InstructionKind::Gate(_) if inst.qubits.len() == 2 => {
                Some((inst.qubits[0], inst.qubits[1]))
            }
            _ => None,
        })
        .collect()
}

/// Score a candidate physical swap `(u, v)`: the coupling distance it leaves
/// between `current`, plus a decayed sum over `lookahead`'s distances.
/// Lower is better.
fn score_swap(
    layout: &Layout,
    coupling_map: &CouplingMap,
    candidate: (u32, u32),
    current: (QubitId, QubitId),
    lookahead: &[(QubitId, QubitId)],
) -> f64 {
    let mut trial = layout.clone();
    trial.swap(candidate.0, candidate.1);

    let dist = |pair: (QubitId, QubitId)| -> f64 {
        let (Some(p1), Some(p2)) = (trial.get_physical(pair.0), trial.get_physical(pair.1))
        else {
            return 0.0;
        };
        f64::from(coupling_map.distance(p1, p2).unwrap_or(u32::MAX))
    };

    let mut cost = dist(current);
    for (i, pair) in lookahead.iter().enumerate() {
        cost += dist(*pair) / (2.0 + i as f64);
    }
    cost
}

/// Candidate physical swaps for resolving `current`: every coupling-graph
/// edge touching either endpoint's current physical position.
fn candidate_swaps(layout: &Layout, coupling_map: &CouplingMap, current: (QubitId, QubitId)) -> Vec<(u32, u32)> {
    let p1 = layout.get_physical(current.0);
    let p2 = layout.get_physical(current.1);
    let mut candidates: Vec<(u32, u32)> = p1
        .into_iter()
        .flat_map(|p| coupling_map.neighbors(p).map(move |n| (p, n)))
        .chain(p2.into_iter().flat_map(|p| coupling_map.neighbors(p).map(move |n| (p, n))))
        .collect();
    candidates.sort_unstable();
    candidates.dedup();
    candidates
}

/// Apply swaps to `layout` (in place) until `current` is realizable on the
/// coupling graph, scoring each candidate against `lookahead`. Returns the
/// physical swap sequence applied, in order.
fn resolve_pair(
    layout: &mut Layout,
    coupling_map: &CouplingMap,
    current: (QubitId, QubitId),
    lookahead: &[(QubitId, QubitId)],
) -> CompileResult<Vec<(u32, u32)>> {
    let mut applied = vec![];
    let max_swaps = coupling_map.num_qubits() as usize * coupling_map.num_qubits() as usize;

    loop {
        let p1 = layout.get_physical(current.0).ok_or(CompileError::MissingLayout)?;
        let p2 = layout.get_physical(current.1).ok_or(CompileError::MissingLayout)?;
        if coupling_map.is_connected(p1, p2) {
            return Ok(applied);
        }
        if applied.len() >= max_swaps {
            return Err(CompileError::RoutingFailed {
                qubit1: current.0 .0,
                qubit2: current.1 .0,
            });
        }

        let candidates = candidate_swaps(layout, coupling_map, current);
        let best = candidates
            .into_iter()
            .min_by(|&a, &b| {
                score_swap(layout, coupling_map, a, current, lookahead)
                    .total_cmp(&score_swap(layout, coupling_map, b, current, lookahead))
                    .then(a.cmp(&b))
            })
            .ok_or(CompileError::RoutingFailed {
                qubit1: current.0 .0,
                qubit2: current.1 .0,
            })?;

        layout.swap(best.0, best.1);
        applied.push(best);
    }
}

/// Initial placement (§4.9): score every logical qubit's physical candidate
/// by how many two-qudit interactions it would satisfy given everything
/// already placed, assigning greedily in order of total interaction weight.
/// Ties broken by physical index.
pub struct GreedyPlacementPass;

impl Pass for GreedyPlacementPass {
    fn name(&self) -> &'static str {
        "greedy_placement"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        let coupling_map = pass_data
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;

        let num_logical = dag.num_qubits() as u32;
        let num_physical = coupling_map.num_qubits();
        if num_physical < num_logical {
            return Err(CompileError::CircuitTooLarge {
                required: num_logical,
                available: num_physical,
            });
        }

        let mut weight: FxHashMap<(QubitId, QubitId), u32> = FxHashMap::default();
        for (a, b) in two_qudit_interactions(dag) {
            let key = if a.0 <= b.0 { (a, b) } else { (b, a) };
            *weight.entry(key).or_insert(0) += 1;
        }

        let mut total_weight: FxHashMap<QubitId, u32> = FxHashMap::default();
        for (&(a, b), &w) in &weight {
            *total_weight.entry(a).or_insert(0) += w;
            *total_weight.entry(b).or_insert(0) += w;
        }

        let mut logical_order: Vec<QubitId> = (0..num_logical).map(QubitId).collect();
        logical_order.sort_by_key(|q| (std::cmp::Reverse(total_weight.get(q).copied().unwrap_or(0)), q.0));

        let mut layout = Layout::new();
        let mut used_physical: Vec<u32> = vec![];

        for &logical in &logical_order {
            let best_physical = (0..num_physical)
                .filter(|p| !used_physical.contains(p))
                .max_by_key(|&candidate| {
                    let satisfied: u32 = used_physical
                        .iter()
                        .filter(|&&placed_physical| {
                            let Some(placed_logical) = layout.get_logical(placed_physical) else {
                                return false;
                            };
                            let key = if logical.0 <= placed_logical.0 {
                                (logical, placed_logical)
                            } else {
                                (placed_logical, logical)
                            };
                            weight.contains_key(&key) && coupling_map.is_connected(candidate, placed_physical)
                        })
                        .count() as u32;
                    (satisfied, std::cmp::Reverse(candidate))
                })
                .expect("num_physical >= num_logical guarantees an unused physical qubit remains");

            layout.add(logical, best_physical);
            used_physical.push(best_physical);
        }

        pass_data.layout = Some(layout);
        Ok(())
    }
}

/// Refine the placement from [`GreedyPlacementPass`] with alternating
/// forward/backward sweeps (§4.9): each sweep simulates routing the circuit
/// (or its reverse) against the current layout, keeping only the resulting
/// layout, not the SWAPs the simulation would have inserted. Over several
/// sweeps this settles the initial layout toward one that needs fewer real
/// SWAPs during [`GeneralizedSabreRoutingPass`].
pub struct GeneralizedSabreLayoutPass {
    pub num_sweeps: u32,
    pub lookahead_window: usize,
}

impl GeneralizedSabreLayoutPass {
    pub fn new() -> Self {
        Self {
            num_sweeps: 4,
            lookahead_window: 10,
        }
    }

    #[must_use]
    pub fn with_num_sweeps(mut self, num_sweeps: u32) -> Self {
        self.num_sweeps = num_sweeps;
        self
    }
}

impl Default for GeneralizedSabreLayoutPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for GeneralizedSabreLayoutPass {
    fn name(&self) -> &'static str {
        "generalized_sabre_layout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        let coupling_map = pass_data
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?
            .clone();
        let mut layout = pass_data.layout.clone().ok_or(CompileError::MissingLayout)?;

        let forward = two_qudit_interactions(dag);
        let mut backward = forward.clone();
        backward.reverse();

        for sweep in 0..self.num_sweeps {
            let pairs = if sweep % 2 == 0 { &forward } else { &backward };
            for (i, &pair) in pairs.iter().enumerate() {
                let lookahead = &pairs[i + 1..(i + 1 + self.lookahead_window).min(pairs.len())];
                resolve_pair(&mut layout, &coupling_map, pair, lookahead)?;
            }
        }

        pass_data.layout = Some(layout);
        Ok(())
    }
}

/// Insert SWAPs so every two-qudit gate lands on a coupling-graph edge
/// (§4.9). Walks the circuit once, resolving each unsatisfied interaction
/// against the current layout with the same lookahead-weighted scoring
/// [`GeneralizedSabreLayoutPass`] used to choose the layout, inserting a
/// `Swap` gate (on the logical qubits currently occupying the chosen
/// physical pair) for every swap it applies. Qubit indices stay logical;
/// [`crate::passes::target::ApplyPlacement`] does the final logical→physical
/// rename.
pub struct GeneralizedSabreRoutingPass {
    pub lookahead_window: usize,
}

impl GeneralizedSabreRoutingPass {
    pub fn new() -> Self {
        Self { lookahead_window: 10 }
    }
}

impl Default for GeneralizedSabreRoutingPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for GeneralizedSabreRoutingPass {
    fn name(&self) -> &'static str {
        "generalized_sabre_routing"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, pass_data: &mut PassData) -> CompileResult<()> {
        let coupling_map = pass_data
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?
            .clone();
        let mut layout = pass_data.layout.clone().ok_or(CompileError::MissingLayout)?;

        let ops: Vec<Instruction> = dag.topological_ops().map(|(_, inst)| inst.clone()).collect();
        let interactions = two_qudit_interactions(dag);

        let mut new_dag = CircuitDag::new();
        for qubit in dag.qubits() {
            new_dag.add_qubit(qubit);
        }
        for clbit in dag.clbits() {
            new_dag.add_clbit(clbit);
        }
        new_dag.set_global_phase(dag.global_phase());
        new_dag.set_level(dag.level());

        let mut interaction_cursor = 0usize;
        for inst in ops {
            if matches!(&inst.kind, InstructionKind::Gate(_)) && inst.qubits.len() == 2 {
                let current = interactions[interaction_cursor];
                interaction_cursor += 1;
                let lookahead_end =
                    (interaction_cursor + self.lookahead_window).min(interactions.len());
                let lookahead = interactions[interaction_cursor..lookahead_end].to_vec();

                let applied = resolve_pair(&mut layout, &coupling_map, current, &lookahead)?;
                for (p1, p2) in applied {
                    let lq1 = layout
                        .get_logical(p1)
                        .expect("just-swapped physical qubit has a logical occupant");
                    let lq2 = layout
                        .get_logical(p2)
                        .expect("just-swapped physical qubit has a logical occupant");
                    new_dag.apply(Instruction::two_qubit_gate(StandardGate::Swap, lq1, lq2))?;
                }
            }
            new_dag.apply(inst)?;
        }

        pass_data.layout = Some(layout);
        *dag = new_dag;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qleap_ir::Circuit;

    #[test]
    fn test_greedy_placement_errors_without_coupling_map() {
        let mut dag = Circuit::with_size("test", 2, 0).into_dag();
        let mut pass_data = PassData::new();
        let err = GreedyPlacementPass.run(&mut dag, &mut pass_data).unwrap_err();
        assert!(matches!(err, CompileError::MissingCouplingMap));
    }

    #[test]
    fn test_greedy_placement_errors_when_machine_too_small() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();
        let mut pass_data = PassData::new();
        pass_data.coupling_map = Some(CouplingMap::linear(2));

        let err = GreedyPlacementPass.run(&mut dag, &mut pass_data).unwrap_err();
        assert!(matches!(err, CompileError::CircuitTooLarge { .. }));
    }

    #[test]
    fn test_greedy_placement_satisfies_single_interaction_on_line() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();
        let mut pass_data = PassData::new();
        pass_data.coupling_map = Some(CouplingMap::linear(3));

        GreedyPlacementPass.run(&mut dag, &mut pass_data).unwrap();
        let layout = pass_data.layout.unwrap();
        let p0 = layout.get_physical(QubitId(0)).unwrap();
        let p1 = layout.get_physical(QubitId(1)).unwrap();
        assert!(pass_data.coupling_map.as_ref().unwrap().is_connected(p0, p1));
    }

    #[test]
    fn test_sabre_layout_requires_prior_placement() {
        let mut dag = Circuit::with_size("test", 2, 0).into_dag();
        let mut pass_data = PassData::new();
        pass_data.coupling_map = Some(CouplingMap::linear(2));
        let err = GeneralizedSabreLayoutPass::new().run(&mut dag, &mut pass_data).unwrap_err();
        assert!(matches!(err, CompileError::MissingLayout));
    }

    #[test]
    fn test_routing_inserts_swaps_for_distant_interaction() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.cnot(QubitId(0), QubitId(2)).unwrap();
        let mut dag = circuit.into_dag();
        let mut pass_data = PassData::new();
        pass_data.coupling_map = Some(CouplingMap::linear(3));
        pass_data.layout = Some(Layout::trivial(3));

        GeneralizedSabreRoutingPass::new().run(&mut dag, &mut pass_data).unwrap();

        let layout = pass_data.layout.as_ref().unwrap();
        for (_, inst) in dag.topological_ops() {
            if inst.qubits.len() == 2 {
                let p1 = layout.get_physical(inst.qubits[0]).unwrap();
                let p2 = layout.get_physical(inst.qubits[1]).unwrap();
                assert!(pass_data.coupling_map.as_ref().unwrap().is_connected(p1, p2));
            }
        }
    }

    #[test]
    fn test_routing_noop_when_already_connected() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();
        let mut pass_data = PassData::new();
        pass_data.coupling_map = Some(CouplingMap::linear(2));
        pass_data.layout = Some(Layout::trivial(2));

        GeneralizedSabreRoutingPass::new().run(&mut dag, &mut pass_data).unwrap();
        assert_eq!(dag.num_ops(), 1);
    }
}
