//! Synthetic trajectory generation for switching linear systems
//!
//! Simulates a regime sequence from the transition matrix and a state/
//! measurement trajectory from the active regime's dynamics. Used by the
//! integration tests and for end-to-end sanity checks of the filter/smoother
//! pipeline.

use crate::errors::SmootherError;
use crate::model::SwitchingModel;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

/// A simulated switching trajectory with its measurements
#[derive(Debug, Clone)]
pub struct SimulatedSequence {
    /// True continuous states, one per time step
    pub states: Vec<DVector<f64>>,
    /// True regime indices, one per time step
    pub regimes: Vec<usize>,
    /// Noisy measurements, one per time step
    pub measurements: Vec<DVector<f64>>,
}

fn sample_gaussian(
    rng: &mut StdRng,
    covar: &DMatrix<f64>,
    context: &str,
) -> Result<DVector<f64>, SmootherError> {
    let chol = covar
        .clone()
        .cholesky()
        .ok_or_else(|| SmootherError::SingularMatrix {
            context: context.to_string(),
        })?;
    let z = DVector::from_fn(covar.nrows(), |_, _| {
        StandardNormal.sample(rng)
    });
    Ok(chol.l() * z)
}

fn sample_regime(rng: &mut StdRng, row: &[f64]) -> usize {
    let u: f64 = rng.gen();
    let mut acc = 0.0;
    for (k, p) in row.iter().enumerate() {
        acc += p;
        if u < acc {
            return k;
        }
    }
    row.len() - 1
}

/// Simulate a switching trajectory and its measurements
///
/// # Arguments
/// * `model` - Switching model (dynamics, noise, regime transitions)
/// * `initial_state` - True state at time 0
/// * `initial_regime` - Active regime at time 0
/// * `len` - Number of time steps to generate
/// * `seed` - RNG seed for reproducibility
///
/// # Errors
/// `SingularMatrix` if a noise covariance admits no Cholesky factor (Q and R
/// must be positive-definite to sample from).
pub fn simulate_switching(
    model: &SwitchingModel,
    initial_state: &DVector<f64>,
    initial_regime: usize,
    len: usize,
    seed: u64,
) -> Result<SimulatedSequence, SmootherError> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut states = Vec::with_capacity(len);
    let mut regimes = Vec::with_capacity(len);
    let mut measurements = Vec::with_capacity(len);

    let mut state = initial_state.clone();
    let mut regime = initial_regime;

    for t in 0..len {
        if t > 0 {
            let row: Vec<f64> = model.transition.row(regime).iter().copied().collect();
            regime = sample_regime(&mut rng, &row);

            let m = &model.models[regime];
            state = &m.a * &state + sample_gaussian(&mut rng, &m.q, "process noise")?;
        }

        let m = &model.models[regime];
        let y = &m.h * &state + sample_gaussian(&mut rng, &m.r, "measurement noise")?;

        states.push(state.clone());
        regimes.push(regime);
        measurements.push(y);
    }

    Ok(SimulatedSequence {
        states,
        regimes,
        measurements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearModel;

    #[test]
    fn test_simulation_is_deterministic_per_seed() {
        let model = SwitchingModel::new(
            vec![
                LinearModel::random_walk(1, 0.01, 0.5),
                LinearModel::random_walk(1, 1.0, 0.5),
            ],
            DMatrix::from_row_slice(2, 2, &[0.9, 0.1, 0.1, 0.9]),
        )
        .unwrap();
        let x0 = DVector::from_vec(vec![0.0]);

        let a = simulate_switching(&model, &x0, 0, 25, 7).unwrap();
        let b = simulate_switching(&model, &x0, 0, 25, 7).unwrap();

        assert_eq!(a.regimes, b.regimes);
        for (ya, yb) in a.measurements.iter().zip(&b.measurements) {
            assert_eq!(ya[0], yb[0]);
        }
    }

    #[test]
    fn test_singular_noise_is_an_error() {
        let model = SwitchingModel::new(
            vec![LinearModel::random_walk(1, 0.0, 0.5)],
            DMatrix::from_row_slice(1, 1, &[1.0]),
        )
        .unwrap();
        let x0 = DVector::from_vec(vec![0.0]);

        let err = simulate_switching(&model, &x0, 0, 5, 1).unwrap_err();
        assert!(matches!(err, SmootherError::SingularMatrix { .. }));
    }
}
