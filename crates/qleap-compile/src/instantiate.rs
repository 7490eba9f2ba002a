//! Concrete [`Instantiator`](qleap_ir::circuit::Instantiator): fits a
//! circuit's continuous parameters against a target unitary (§4.2).
//!
//! `Circuit::instantiate` only needs something that returns a parameter
//! vector minimizing distance to target; this is the multistart gradient
//! descent that does that for every search pass in this crate.

use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use qleap_ir::circuit::Instantiator;
use qleap_ir::{Circuit, UnitaryMatrix};

/// Multistart local optimizer: from `multistarts` random initial parameter
/// vectors, runs finite-difference gradient descent with backtracking step
/// size until the cost stops improving by more than `ftol`, or the gradient
/// norm drops below `gtol`, or `max_iters` is hit; returns the best of the
/// `multistarts` runs.
///
/// Recognised options mirror §4.2/§9: `multistarts`, `ftol`, `gtol`,
/// `max_iters`, `seed`. `method`/`minimizer`/`cost_fn_gen` are not
/// represented as separate knobs — this type *is* the one minimizer this
/// crate ships, selected by constructing it.
#[derive(Debug, Clone)]
pub struct LeastSquaresInstantiator {
    pub multistarts: usize,
    pub ftol: f64,
    pub gtol: f64,
    pub max_iters: usize,
    pub seed: u64,
}

impl Default for LeastSquaresInstantiator {
    fn default() -> Self {
        Self {
            multistarts: 4,
            ftol: 1e-12,
            gtol: 1e-10,
            max_iters: 200,
            seed: 0,
        }
    }
}

impl LeastSquaresInstantiator {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_multistarts(mut self, multistarts: usize) -> Self {
        self.multistarts = multistarts;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_tolerances(mut self, ftol: f64, gtol: f64) -> Self {
        self.ftol = ftol;
        self.gtol = gtol;
        self
    }

    fn cost(circuit: &Circuit, params: &[f64], target: &UnitaryMatrix) -> f64 {
        let mut trial = circuit.copy();
        trial.set_parameters(params).expect("shape fixed by circuit");
        trial.get_unitary().distance(target)
    }

    fn gradient(circuit: &Circuit, params: &[f64], target: &UnitaryMatrix, f0: f64) -> Vec<f64> {
        const H: f64 = 1e-6;
        let mut grad = vec![0.0; params.len()];
        for i in 0..params.len() {
            let mut perturbed = params.to_vec();
            perturbed[i] += H;
            let f1 = Self::cost(circuit, &perturbed, target);
            grad[i] = (f1 - f0) / H;
        }
        grad
    }

    fn run_once(&self, circuit: &Circuit, target: &UnitaryMatrix, init: Vec<f64>) -> (Vec<f64>, f64) {
        let mut params = init;
        let mut cost = Self::cost(circuit, &params, target);
        let mut step = 1.0;

        for _ in 0..self.max_iters {
            let grad = Self::gradient(circuit, &params, target, cost);
            let grad_norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
            if grad_norm < self.gtol {
                break;
            }

            // Backtracking line search: halve the step until cost improves.
            let mut accepted = false;
            let mut trial_step = step;
            for _ in 0..20 {
                let candidate: Vec<f64> = params
                    .iter()
                    .zip(&grad)
                    .map(|(p, g)| p - trial_step * g)
                    .collect();
                let candidate_cost = Self::cost(circuit, &candidate, target);
                if candidate_cost < cost {
                    let improvement = cost - candidate_cost;
                    params = candidate;
                    cost = candidate_cost;
                    step = trial_step * 1.5;
                    accepted = improvement >= self.ftol;
                    break;
                }
                trial_step *= 0.5;
            }

            if !accepted {
                break;
            }
        }

        (params, cost)
    }
}

impl Instantiator for LeastSquaresInstantiator {
    fn optimize(&self, circuit: &Circuit, target: &UnitaryMatrix) -> Vec<f64> {
        let num_params = circuit.parameters().len();
        if num_params == 0 {
            return vec![];
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let starts = self.multistarts.max(1);

        let mut best_params = vec![0.0; num_params];
        let mut best_cost = f64::INFINITY;

        for start in 0..starts {
            let init: Vec<f64> = if start == 0 {
                circuit.parameters()
            } else {
                (0..num_params).map(|_| rng.gen_range(-PI..PI)).collect()
            };
            let (params, cost) = self.run_once(circuit, target, init);
            if cost < best_cost {
                best_cost = cost;
                best_params = params;
            }
        }

        best_params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qleap_ir::QubitId;

    #[test]
    fn test_instantiate_single_u3_against_identity() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.u3(0.3, 0.2, 0.1, QubitId(0)).unwrap();
        let target = circuit.get_unitary();

        let mut blank = Circuit::with_size("test", 1, 0);
        blank.u3(0.0, 0.0, 0.0, QubitId(0)).unwrap();

        let instantiator = LeastSquaresInstantiator::new().with_seed(7);
        let fitted = blank.instantiate(&target, &instantiator).unwrap();

        assert!(fitted.get_unitary().distance(&target) < 1e-6);
    }

    #[test]
    fn test_instantiate_returns_empty_for_parameter_free_circuit() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.sqrt_x(QubitId(0)).unwrap();
        let target = circuit.get_unitary();

        let instantiator = LeastSquaresInstantiator::new();
        let params = instantiator.optimize(&circuit, &target);
        assert!(params.is_empty());
    }

    #[test]
    fn test_more_multistarts_does_not_regress_cost() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.u3(1.0, 2.0, 3.0, QubitId(0)).unwrap();
        let target = circuit.get_unitary();

        let mut blank = Circuit::with_size("test", 1, 0);
        blank.u3(0.0, 0.0, 0.0, QubitId(0)).unwrap();

        let one_start = LeastSquaresInstantiator::new().with_multistarts(1).with_seed(1);
        let many_starts = LeastSquaresInstantiator::new().with_multistarts(8).with_seed(1);

        let cost_one = {
            let fitted = blank.copy().instantiate(&target, &one_start).unwrap();
            fitted.get_unitary().distance(&target)
        };
        let cost_many = {
            let fitted = blank.instantiate(&target, &many_starts).unwrap();
            fitted.get_unitary().distance(&target)
        };

        assert!(cost_many <= cost_one + 1e-9);
    }
}
