//! Plain best-first synthesis (§4.5): QSearch is LEAP without prefix
//! freezing — kept as its own type since it is also `Rebase2QuditGatePass`'s
//! fallback search when no direct template matches.

use tracing::warn;

use qleap_ir::{Circuit, UnitaryMatrix};

use crate::frontier::{Frontier, Heuristic};
use crate::instantiate::LeastSquaresInstantiator;
use crate::layer::LayerGenerator;
use crate::pass_data::PassData;
use crate::runtime::Runtime;

/// Best-first search over `G`'s layerings: pop the lowest-cost candidate,
/// return it if it already meets `success_threshold`, otherwise expand,
/// instantiate every successor in parallel via `runtime`, and push them
/// back onto the frontier. Returns the best circuit found once the
/// frontier empties or `max_layer` is exhausted.
pub struct QSearch<G: LayerGenerator> {
    pub heuristic: Heuristic,
    pub layer_generator: G,
    pub success_threshold: f64,
    pub max_layer: u32,
    pub instantiator: LeastSquaresInstantiator,
}

impl<G: LayerGenerator> QSearch<G> {
    pub fn new(layer_generator: G) -> Self {
        Self {
            heuristic: Heuristic::AStar { alpha: 0.1 },
            layer_generator,
            success_threshold: 1e-10,
            max_layer: 20,
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

    /// Run the search. `data` supplies the coupling map / basis gates the
    /// layer generator reads and the PRNG seed every multistart draws from;
    /// `runtime` fans out successor instantiation.
    pub fn synthesize<R: Runtime>(
        &self,
        target: &UnitaryMatrix,
        data: &PassData,
        runtime: &R,
    ) -> Circuit {
        let instantiator = self.instantiator.clone().with_seed(data.seed);
        let initial = self.layer_generator.initial_layer(target, data);
        let (initial, initial_cost) = self.instantiate_and_score(initial, target, &instantiator);

        let mut best_circuit = initial.copy();
        let mut best_cost = initial_cost;

        if best_cost < self.success_threshold {
            return best_circuit;
        }

        let mut frontier = Frontier::new(self.heuristic);
        frontier.add(initial, 0, initial_cost);

        while let Some((circuit, layer, cost)) = frontier.pop() {
            if cost < self.success_threshold {
                return circuit;
            }
            if layer >= self.max_layer {
                continue;
            }

            let successors = self.layer_generator.successors(&circuit, data);
            let scored: Vec<(Circuit, f64)> = runtime.map(successors, |succ| {
                self.instantiate_and_score(succ, target, &instantiator)
            });

            for (fitted, dist) in scored {
                if dist < self.success_threshold {
                    return fitted;
                }
                if dist < best_cost {
                    best_cost = dist;
                    best_circuit = fitted.copy();
                }
                frontier.add(fitted, layer + 1, dist);
            }
        }

        warn!(
            best_cost,
            success_threshold = self.success_threshold,
            "qsearch exhausted frontier without reaching success threshold"
        );
        best_circuit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::SingleQuditLayerGenerator;
    use crate::runtime::SequentialRuntime;
    use qleap_ir::{QubitId, StandardGate};

    #[test]
    fn test_qsearch_finds_identity_immediately() {
        let search = QSearch::new(SingleQuditLayerGenerator).with_success_threshold(1e-9);
        let target = UnitaryMatrix::identity(1);
        let data = PassData::new();

        let result = search.synthesize(&target, &data, &SequentialRuntime);
        assert!(result.get_unitary().distance(&target) < 1e-9);
    }

    #[test]
    fn test_qsearch_finds_sqrt_x_within_one_layer() {
        let mut target_circuit = Circuit::with_size("target", 1, 0);
        target_circuit.gate(StandardGate::SqrtX, [QubitId(0)]).unwrap();
        let target = target_circuit.get_unitary();

        let search = QSearch::new(SingleQuditLayerGenerator)
            .with_success_threshold(1e-9)
            .with_max_layer(3);
        let data = PassData::new();

        let result = search.synthesize(&target, &data, &SequentialRuntime);
        assert!(result.get_unitary().distance(&target) < 1e-9);
    }

    #[test]
    fn test_qsearch_returns_best_effort_when_max_layer_too_small() {
        let mut target_circuit = Circuit::with_size("target", 1, 0);
        target_circuit.gate(StandardGate::SqrtX, [QubitId(0)]).unwrap();
        target_circuit.gate(StandardGate::SqrtX, [QubitId(0)]).unwrap();
        target_circuit.gate(StandardGate::SqrtX, [QubitId(0)]).unwrap();
        let target = target_circuit.get_unitary();

        let search = QSearch::new(SingleQuditLayerGenerator)
            .with_success_threshold(1e-12)
            .with_max_layer(0);
        let data = PassData::new();

        // With max_layer=0 only the instantiated initial layer is
        // considered; this should not panic and returns *some* circuit.
        let result = search.synthesize(&target, &data, &SequentialRuntime);
        assert_eq!(result.num_qubits(), 1);
    }
}
