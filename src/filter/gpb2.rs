//! Forward GPB2 filtering for a switching linear system
//!
//! Each step runs a Kalman update for every ordered regime pair (j at t-1,
//! k at t), weights the pairwise posteriors by measurement likelihood and the
//! regime-transition prior, and collapses back to one component per regime.
//! The pass records the per-pair filter cross-covariances the mixture
//! smoother consumes.

use crate::collapse::collapse;
use crate::common::linalg::log_sum_exp;
use crate::errors::SmootherError;
use crate::filter::kalman;
use crate::model::SwitchingModel;
use crate::sequence::GmmSequence;
use crate::types::{Gaussian, Gmm, Grid};
use nalgebra::{DMatrix, DVector};

/// Run the forward GPB2 pass over a measurement sequence
///
/// The prior mixture is the belief at time 0 before seeing
/// `measurements[0]`; the first step is a per-regime update only. Later
/// steps run the full N² pairwise predict/update, normalize the joint regime
/// posterior `P(S_{t-1}=j, S_t=k | y_{1:t})`, and collapse over predecessors
/// for each successor regime.
///
/// # Errors
/// `SingularMatrix` from any pairwise update; `DegenerateWeights` if the
/// joint regime posterior normalizes to zero; `DimensionMismatch` if the
/// prior disagrees with the model on the number of regimes.
pub fn filter_sequence(
    measurements: &[DVector<f64>],
    model: &SwitchingModel,
    prior: &Gmm,
) -> Result<GmmSequence, SmootherError> {
    let n = model.n_regimes();
    if prior.n_components() != n {
        return Err(SmootherError::DimensionMismatch {
            expected: n,
            actual: prior.n_components(),
            context: "prior mixture regime count".to_string(),
        });
    }
    if measurements.is_empty() {
        return Err(SmootherError::DimensionMismatch {
            expected: 1,
            actual: 0,
            context: "measurement count".to_string(),
        });
    }

    let len = measurements.len();
    let mut filtered: Vec<Gmm> = Vec::with_capacity(len);
    let mut crossvar: Grid<Vec<DMatrix<f64>>> =
        Grid::from_fn(n, |_, _| Vec::with_capacity(len));

    // Time 0: per-regime update of the prior, no transition.
    let mut first_components = Vec::with_capacity(n);
    let mut first_log_weights = Vec::with_capacity(n);
    for k in 0..n {
        let out = kalman::update(&prior.components[k], &measurements[0], &model.models[k])?;
        first_log_weights.push(prior.weights[k].ln() + out.log_likelihood);
        first_components.push(out.state);
    }
    let norm = log_sum_exp(&first_log_weights);
    if !norm.is_finite() {
        return Err(SmootherError::DegenerateWeights {
            context: "regime posterior at time 0".to_string(),
        });
    }
    let first_weights = DVector::from_fn(n, |k, _| (first_log_weights[k] - norm).exp());
    filtered.push(Gmm::with_transforms(
        first_components,
        first_weights,
        prior.transforms.clone(),
    ));
    for j in 0..n {
        for k in 0..n {
            // Pairwise cross terms live in regime k's space on both sides
            // (the predecessor is projected before prediction).
            let d_k = model.models[k].x_dim();
            crossvar.get_mut(j, k).push(DMatrix::zeros(d_k, d_k));
        }
    }

    for (t, y) in measurements.iter().enumerate().skip(1) {
        let previous = &filtered[t - 1];

        let mut pair_states: Vec<Gaussian> = Vec::with_capacity(n * n);
        let mut pair_crossvars: Vec<DMatrix<f64>> = Vec::with_capacity(n * n);
        let mut pair_log_weights: Vec<f64> = Vec::with_capacity(n * n);

        for j in 0..n {
            for k in 0..n {
                let regime = &model.models[k];
                let transform = previous.transforms.get(j, k);

                // Project the predecessor component into regime k's space.
                let x = transform * &previous.components[j].mean;
                let v = transform * &previous.components[j].covar * transform.transpose();

                let predicted = kalman::predict(&Gaussian::new(x, v.clone()), regime);
                let out = kalman::update(&predicted, y, regime)?;

                let d = regime.x_dim();
                let i_minus_kh = DMatrix::identity(d, d) - &out.gain * &regime.h;
                pair_crossvars.push(i_minus_kh * &regime.a * v);

                pair_log_weights.push(
                    previous.weights[j].ln()
                        + model.transition[(j, k)].ln()
                        + out.log_likelihood,
                );
                pair_states.push(out.state);
            }
        }

        let norm = log_sum_exp(&pair_log_weights);
        if !norm.is_finite() {
            return Err(SmootherError::DegenerateWeights {
                context: format!("joint regime posterior at time {}", t),
            });
        }
        let joint = DMatrix::from_fn(n, n, |j, k| (pair_log_weights[j * n + k] - norm).exp());

        // Marginal regime weights and per-successor responsibilities.
        let weights = DVector::from_fn(n, |k, _| joint.column(k).iter().sum());
        let mut components = Vec::with_capacity(n);
        for k in 0..n {
            if weights[k] <= 0.0 {
                return Err(SmootherError::DegenerateWeights {
                    context: format!("regime {} posterior at time {}", k, t),
                });
            }
            let responsibilities: Vec<f64> =
                (0..n).map(|j| joint[(j, k)] / weights[k]).collect();
            let states_k: Vec<Gaussian> =
                (0..n).map(|j| pair_states[j * n + k].clone()).collect();
            // Pairwise states for successor k already live in k's space.
            components.push(collapse(&states_k, &responsibilities, None)?);
        }

        for j in 0..n {
            for k in 0..n {
                crossvar.get_mut(j, k).push(pair_crossvars[j * n + k].clone());
            }
        }

        filtered.push(Gmm::with_transforms(
            components,
            weights,
            previous.transforms.clone(),
        ));
    }

    GmmSequence::new(filtered, crossvar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinearModel;

    fn two_regime_model() -> SwitchingModel {
        SwitchingModel::new(
            vec![
                LinearModel::random_walk(1, 0.01, 0.5),
                LinearModel::random_walk(1, 1.0, 0.5),
            ],
            DMatrix::from_row_slice(2, 2, &[0.95, 0.05, 0.05, 0.95]),
        )
        .unwrap()
    }

    fn uniform_prior() -> Gmm {
        Gmm::uniform(vec![
            Gaussian::isotropic(1, 10.0),
            Gaussian::isotropic(1, 10.0),
        ])
    }

    #[test]
    fn test_filter_populates_all_stores() {
        let model = two_regime_model();
        let ys: Vec<DVector<f64>> = [0.0, 0.1, 0.0, 3.0, 6.0]
            .iter()
            .map(|&v| DVector::from_vec(vec![v]))
            .collect();

        let seq = filter_sequence(&ys, &model, &uniform_prior()).unwrap();
        assert_eq!(seq.len(), 5);
        assert_eq!(seq.n_regimes(), 2);
        assert_eq!(seq.filtered_collapsed.len(), 5);
        for (_, _, cell) in seq.filter_crossvar.iter_indexed() {
            assert_eq!(cell.len(), 5);
        }
    }

    #[test]
    fn test_filter_weights_stay_normalized() {
        let model = two_regime_model();
        let ys: Vec<DVector<f64>> = (0..20)
            .map(|t| DVector::from_vec(vec![(t as f64 * 0.3).sin()]))
            .collect();

        let seq = filter_sequence(&ys, &model, &uniform_prior()).unwrap();
        for gmm in &seq.filtered {
            assert!((gmm.weights.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_volatile_data_favors_volatile_regime() {
        let model = two_regime_model();
        // Large jumps are far more likely under the high-noise regime.
        let ys: Vec<DVector<f64>> = (0..12)
            .map(|t| DVector::from_vec(vec![if t % 2 == 0 { 4.0 } else { -4.0 }]))
            .collect();

        let seq = filter_sequence(&ys, &model, &uniform_prior()).unwrap();
        let last = seq.filtered.last().unwrap();
        assert!(last.weights[1] > last.weights[0]);
    }
}
