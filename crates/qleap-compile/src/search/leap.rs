//! LEAP (§4.6): QSearch plus *prefix freezing* — once a new best circuit's
//! distance trend predicts diminishing returns, collapse the frontier down
//! to just that circuit and keep searching only its descendants.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use qleap_ir::{Circuit, UnitaryMatrix};

use crate::frontier::{Frontier, Heuristic};
use crate::instantiate::LeastSquaresInstantiator;
use crate::layer::LayerGenerator;
use crate::pass_data::PassData;
use crate::runtime::Runtime;

/// One scored candidate kept in `psols[depth]`.
#[derive(Clone)]
pub struct PartialSolution {
    pub circuit: Circuit,
    pub cost: f64,
}

/// Fit `dist ~= m * layer + b` by ordinary least squares over `points`.
/// Returns `None` (never freeze) when there are fewer than two points or
/// the layers have zero variance.
fn linear_regression(points: &[(u32, f64)]) -> Option<(f64, f64)> {
    let n = points.len() as f64;
    if points.len() < 2 {
        return None;
    }

    let sum_x: f64 = points.iter().map(|(l, _)| f64::from(*l)).sum();
    let sum_y: f64 = points.iter().map(|(_, d)| d).sum();
    let sum_xx: f64 = points.iter().map(|(l, _)| f64::from(*l) * f64::from(*l)).sum();
    let sum_xy: f64 = points.iter().map(|(l, d)| f64::from(*l) * d).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom == 0.0 {
        return None;
    }

    let m = (n * sum_xy - sum_x * sum_y) / denom;
    let b = (sum_y - m * sum_x) / n;
    if m.is_nan() || b.is_nan() {
        return None;
    }
    Some((m, b))
}

/// LEAP's configuration (§4.6's input list).
pub struct Leap<G: LayerGenerator> {
    pub heuristic: Heuristic,
    pub layer_generator: G,
    pub success_threshold: f64,
    pub max_layer: u32,
    pub no_progress_layers_allowed: u32,
    pub min_prefix_size: u32,
    pub store_partial_solutions: bool,
    pub partials_per_depth: usize,
    pub instantiator: LeastSquaresInstantiator,
}

/// Bookkeeping for one `synthesize` call, returned alongside the result so
/// callers (and tests) can inspect freeze history without LEAP itself
/// needing to be `PassData`-resident.
#[derive(Default)]
pub struct SynthesisTrace {
    pub best_dists: Vec<f64>,
    pub last_prefix_layer: u32,
    pub froze_at_least_once: bool,
    pub partial_solutions: HashMap<u32, Vec<PartialSolution>>,
}

impl<G: LayerGenerator> Leap<G> {
    pub fn new(layer_generator: G) -> Self {
        Self {
            heuristic: Heuristic::AStar { alpha: 0.1 },
            layer_generator,
            success_threshold: 1e-10,
            max_layer: 20,
            no_progress_layers_allowed: 5,
            min_prefix_size: 3,
            store_partial_solutions: false,
            partials_per_depth: 8,
            instantiator: LeastSquaresInstantiator::new(),
        }
    }

    #[must_use]
    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    #[must_use]
    pub fn with_success_threshold(mut self, threshold: f64) -> Self {
        self.success_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_max_layer(mut self, max_layer: u32) -> Self {
        self.max_layer = max_layer;
        self
    }

    #[must_use]
    pub fn with_min_prefix_size(mut self, min_prefix_size: u32) -> Self {
        self.min_prefix_size = min_prefix_size;
        self
    }

    #[must_use]
    pub fn with_partial_solutions(mut self, enabled: bool, partials_per_depth: usize) -> Self {
        self.store_partial_solutions = enabled;
        self.partials_per_depth = partials_per_depth;
        self
    }

    fn instantiate_and_score(
        &self,
        candidate: Circuit,
        target: &UnitaryMatrix,
        instantiator: &LeastSquaresInstantiator,
    ) -> (Circuit, f64) {
        let fitted = candidate.instantiate(target, instantiator).unwrap_or(candidate);
        let dist = fitted.get_unitary().distance(target);
        (fitted, dist)
    }

    /// Literal new-best rule from §4.6: first clause improves distance
    /// without regressing depth unless success is still out of reach;
    /// second clause, once successful, prefers a shorter circuit.
    fn is_new_best(&self, dist: f64, layer: u32, best_dist: f64, best_layer: u32) -> bool {
        (dist < best_dist && (best_dist >= self.success_threshold || layer <= best_layer))
            || (dist < self.success_threshold && layer < best_layer)
    }

    fn record_partial(&self, trace: &mut SynthesisTrace, layer: u32, circuit: &Circuit, cost: f64) {
        if !self.store_partial_solutions {
            return;
        }
        let bucket = trace.partial_solutions.entry(layer).or_default();
        bucket.push(PartialSolution {
            circuit: circuit.copy(),
            cost,
        });
        if bucket.len() > self.partials_per_depth {
            bucket.sort_by(|a, b| a.cost.total_cmp(&b.cost));
            bucket.truncate(self.partials_per_depth);
        }
    }

    /// Run LEAP, returning the best circuit found and a trace of freeze
    /// history useful for testing §8 scenario 5's monotonicity property.
    pub fn synthesize<R: Runtime>(
        &self,
        target: &UnitaryMatrix,
        data: &PassData,
        runtime: &R,
    ) -> (Circuit, SynthesisTrace) {
        let mut trace = SynthesisTrace::default();
        let instantiator = self.instantiator.clone().with_seed(data.seed);

        let initial = self.layer_generator.initial_layer(target, data);
        let (initial, initial_cost) = self.instantiate_and_score(initial, target, &instantiator);

        let mut best_circuit = initial.copy();
        let mut best_dist = initial_cost;
        let mut best_layer: u32 = 0;
        trace.best_dists.push(best_dist);
        self.record_partial(&mut trace, 0, &best_circuit, best_dist);

        if best_dist < self.success_threshold {
            return (best_circuit, trace);
        }

        let mut best_layers_history: Vec<(u32, f64)> = vec![(0, best_dist)];
        let mut warned_layers: HashSet<u32> = HashSet::new();

        let mut frontier = Frontier::new(self.heuristic);
        frontier.add(initial, 0, initial_cost);

        while let Some((circuit, layer, cost)) = frontier.pop() {
            if cost < self.success_threshold {
                return (circuit, trace);
            }
            if layer >= self.max_layer {
                continue;
            }

            if self.no_progress_layers_allowed > 0
                && layer > best_layer
                && (layer - best_layer) % self.no_progress_layers_allowed == 0
                && warned_layers.insert(layer)
            {
                warn!(
                    layer,
                    best_layer, "leap made no progress for no_progress_layers_allowed layers"
                );
            }

            let successors = self.layer_generator.successors(&circuit, data);
            let scored: Vec<(Circuit, f64)> = runtime.map(successors, |succ| {
                self.instantiate_and_score(succ, target, &instantiator)
            });

            for (fitted, dist) in scored {
                let next_layer = layer + 1;
                self.record_partial(&mut trace, next_layer, &fitted, dist);

                if dist < self.success_threshold {
                    return (fitted, trace);
                }

                if self.is_new_best(dist, next_layer, best_dist, best_layer) {
                    best_dist = dist;
                    best_layer = next_layer;
                    best_circuit = fitted.copy();
                    trace.best_dists.push(best_dist);

                    let regression = linear_regression(&best_layers_history);
                    best_layers_history.push((next_layer, best_dist));

                    if let Some((m, b)) = regression {
                        let predicted = m * f64::from(next_layer) + b;
                        let delta = predicted - best_dist;
                        if delta < 0.0 && (next_layer - trace.last_prefix_layer) >= self.min_prefix_size
                        {
                            trace.last_prefix_layer = next_layer;
                            trace.froze_at_least_once = true;
                            frontier.clear();
                            if next_layer + 1 <= self.max_layer {
                                frontier.add(fitted.copy(), next_layer + 1, best_dist);
                            }
                            continue;
                        }
                    }
                }

                if next_layer <= self.max_layer {
                    frontier.add(fitted, next_layer, dist);
                }
            }
        }

        warn!(
            best_dist,
            success_threshold = self.success_threshold,
            "leap exhausted frontier without reaching success threshold"
        );
        (best_circuit, trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::SingleQuditLayerGenerator;
    use crate::runtime::SequentialRuntime;
    use qleap_ir::{QubitId, StandardGate};

    #[test]
    fn test_linear_regression_fits_line() {
        let (m, b) = linear_regression(&[(0, 1.0), (1, 0.0)]).unwrap();
        assert!((m - (-1.0)).abs() < 1e-9);
        assert!((b - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_regression_none_for_single_point() {
        assert!(linear_regression(&[(0, 1.0)]).is_none());
    }

    #[test]
    fn test_linear_regression_none_for_zero_variance() {
        assert!(linear_regression(&[(2, 1.0), (2, 0.5)]).is_none());
    }

    #[test]
    fn test_leap_new_best_first_clause() {
        let leap = Leap::new(SingleQuditLayerGenerator).with_success_threshold(1e-6);
        // dist improves, best_dist still not successful: depth can stay equal.
        assert!(leap.is_new_best(0.2, 3, 0.5, 3));
        // dist improves but depth regresses while already near success: rejected.
        assert!(!leap.is_new_best(0.2, 5, 0.3, 2));
    }

    #[test]
    fn test_leap_new_best_second_clause_prefers_shorter() {
        let leap = Leap::new(SingleQuditLayerGenerator).with_success_threshold(1e-6);
        assert!(leap.is_new_best(1e-9, 1, 1e-9, 3));
    }

    #[test]
    fn test_leap_finds_identity_immediately() {
        let leap = Leap::new(SingleQuditLayerGenerator).with_success_threshold(1e-9);
        let target = UnitaryMatrix::identity(1);
        let data = PassData::new();

        let (result, trace) = leap.synthesize(&target, &data, &SequentialRuntime);
        assert!(result.get_unitary().distance(&target) < 1e-9);
        assert!(!trace.best_dists.is_empty());
    }

    #[test]
    fn test_leap_best_dist_trace_is_non_increasing() {
        let mut target_circuit = Circuit::with_size("target", 1, 0);
        target_circuit.gate(StandardGate::SqrtX, [QubitId(0)]).unwrap();
        target_circuit.gate(StandardGate::SqrtX, [QubitId(0)]).unwrap();
        let target = target_circuit.get_unitary();

        let leap = Leap::new(SingleQuditLayerGenerator)
            .with_success_threshold(1e-9)
            .with_max_layer(6)
            .with_min_prefix_size(1);
        let data = PassData::new();

        let (_, trace) = leap.synthesize(&target, &data, &SequentialRuntime);
        for window in trace.best_dists.windows(2) {
            assert!(window[1] <= window[0] + 1e-12);
        }
    }

    #[test]
    fn test_leap_partial_solutions_bounded_by_partials_per_depth() {
        let leap = Leap::new(SingleQuditLayerGenerator)
            .with_success_threshold(1e-300)
            .with_max_layer(2)
            .with_partial_solutions(true, 1);
        let target = UnitaryMatrix::identity(1);
        let data = PassData::new();

        let (_, trace) = leap.synthesize(&target, &data, &SequentialRuntime);
        for bucket in trace.partial_solutions.values() {
            assert!(bucket.len() <= 1);
        }
    }
}
