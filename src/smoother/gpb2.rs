//! Generalized Pseudo-Bayes order-2 (GPB2) fixed-interval mixture smoothing
//!
//! One GPB2 step runs the linear RTS step for every ordered regime pair
//! (predecessor j at time t, successor k at time t+1), then collapses the N×N
//! component grid back to N components via the backward and forward regime
//! responsibilities. The N² pairwise computations are mutually independent;
//! with the `rayon` feature they run in parallel and the outputs are written
//! only after all pairs complete. The time axis stays strictly sequential.

use crate::collapse::{collapse, collapse_cross};
use crate::errors::SmootherError;
use crate::model::SwitchingModel;
use crate::sequence::GmmSequence;
use crate::smoother::rts;
use crate::types::{Gaussian, Gmm, Grid};
use nalgebra::{DMatrix, DVector};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Per-successor-regime cross-covariance bundle produced by one GPB2 step
///
/// Consumed by the sequence driver to build the fully collapsed (regime-free)
/// cross-covariance at (t+1, t).
#[derive(Debug, Clone)]
pub struct StepCross {
    /// Collapsed cross-covariance between t+1 and t, one per successor regime
    pub crossvar_by_successor: Vec<DMatrix<f64>>,
    /// Backward-responsibility-weighted smoothed mean at t, one per successor
    pub mean_by_successor: Vec<DVector<f64>>,
    /// Smoothed regime weights at t+1
    pub successor_weights: DVector<f64>,
}

/// Run the N² independent pairwise RTS steps for one time step
fn pairwise_smooth(
    smoothed_tplus1: &Gmm,
    filtered_t: &Gmm,
    filtered_tplus1: &Gmm,
    filter_crossvar: &Grid<DMatrix<f64>>,
    model: &SwitchingModel,
) -> Result<(Grid<Gaussian>, Grid<DMatrix<f64>>), SmootherError> {
    let n = model.n_regimes();

    #[cfg(feature = "rayon")]
    let results: Vec<(Gaussian, DMatrix<f64>)> = {
        let pairs: Vec<(usize, usize)> =
            (0..n).flat_map(|j| (0..n).map(move |k| (j, k))).collect();
        pairs
            .into_par_iter()
            .map(|(j, k)| {
                rts::smooth_step(
                    &smoothed_tplus1.components[k],
                    &filtered_t.components[j],
                    &filtered_tplus1.components[k],
                    filter_crossvar.get(j, k),
                    &model.models[k],
                    Some(smoothed_tplus1.transforms.get(j, k)),
                )
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    #[cfg(not(feature = "rayon"))]
    let results: Vec<(Gaussian, DMatrix<f64>)> = {
        let mut out = Vec::with_capacity(n * n);
        for j in 0..n {
            for k in 0..n {
                out.push(rts::smooth_step(
                    &smoothed_tplus1.components[k],
                    &filtered_t.components[j],
                    &filtered_tplus1.components[k],
                    filter_crossvar.get(j, k),
                    &model.models[k],
                    Some(smoothed_tplus1.transforms.get(j, k)),
                )?);
            }
        }
        out
    };

    let states = Grid::from_fn(n, |j, k| results[j * n + k].0.clone());
    let crossvars = Grid::from_fn(n, |j, k| results[j * n + k].1.clone());
    Ok((states, crossvars))
}

/// One backward GPB2 smoothing step
///
/// For every ordered regime pair (j, k) this runs [`rts::smooth_step`] with
/// filtered component j at t, smoothed/filtered component k at t+1, the
/// pairwise filter cross-covariance, model k, and the pairwise transform.
/// The N×N results are then combined:
///
/// - backward responsibility `U[j,k] ∝ M_t[j]·Z[j,k]` (column-normalized),
/// - joint smoothed mass `M_{t,t+1}[j,k] = U[j,k]·M_{t+1}[k]`,
/// - marginal smoothed weights `M_t[j] = Σ_k M_{t,t+1}[j,k]`,
/// - forward-in-regime responsibility `W_t[j,k]` (row-normalized),
/// - per-predecessor collapse of the pairwise states with weights `W_t[j,·]`,
/// - per-successor collapse of the pairwise cross-covariances with `U[·,k]`.
///
/// # Returns
/// The smoothed mixture at t (with `pr_stplus1_st = W_t`), the full N×N grid
/// of smoothed cross-covariances, and the [`StepCross`] bundle for the
/// sequence driver.
///
/// # Errors
/// `SingularMatrix` from any pairwise RTS step; `DegenerateWeights` if a
/// responsibility normalization denominator is zero; `DimensionMismatch` if
/// the mixtures disagree with the model on the number of regimes.
pub fn smooth_step(
    smoothed_tplus1: &Gmm,
    filtered_t: &Gmm,
    filtered_tplus1: &Gmm,
    filter_crossvar: &Grid<DMatrix<f64>>,
    model: &SwitchingModel,
) -> Result<(Gmm, Grid<DMatrix<f64>>, StepCross), SmootherError> {
    let n = model.n_regimes();
    for (count, what) in [
        (smoothed_tplus1.n_components(), "smoothed mixture at t+1"),
        (filtered_t.n_components(), "filtered mixture at t"),
        (filtered_tplus1.n_components(), "filtered mixture at t+1"),
        (filter_crossvar.n(), "filter cross-covariance grid"),
    ] {
        if count != n {
            return Err(SmootherError::DimensionMismatch {
                expected: n,
                actual: count,
                context: what.to_string(),
            });
        }
    }

    let (pair_states, pair_crossvars) = pairwise_smooth(
        smoothed_tplus1,
        filtered_t,
        filtered_tplus1,
        filter_crossvar,
        model,
    )?;

    // Backward responsibility U[j,k] = P(S_t = j | S_{t+1} = k, y_{1:t}).
    let m_t = &filtered_t.weights;
    let numerator = DMatrix::from_fn(n, n, |j, k| m_t[j] * model.transition[(j, k)]);
    let mut u = DMatrix::zeros(n, n);
    for k in 0..n {
        let col_sum: f64 = numerator.column(k).iter().sum();
        if !col_sum.is_finite() || col_sum <= 0.0 {
            return Err(SmootherError::DegenerateWeights {
                context: format!("column {} of the joint regime weights", k),
            });
        }
        for j in 0..n {
            u[(j, k)] = numerator[(j, k)] / col_sum;
        }
    }

    // Joint smoothed mass and its row marginal.
    let m_tplus1 = &smoothed_tplus1.weights;
    let m_t_tplus1 = DMatrix::from_fn(n, n, |j, k| u[(j, k)] * m_tplus1[k]);
    let m_t_smoothed = DVector::from_fn(n, |j, _| m_t_tplus1.row(j).iter().sum::<f64>());

    // Forward-in-regime responsibility W_t[j,k] = P(S_{t+1} = k | S_t = j, y_{1:T}).
    let mut w_t = DMatrix::zeros(n, n);
    for j in 0..n {
        if !m_t_smoothed[j].is_finite() || m_t_smoothed[j] <= 0.0 {
            return Err(SmootherError::DegenerateWeights {
                context: format!("row {} of the joint smoothed mass", j),
            });
        }
        for k in 0..n {
            w_t[(j, k)] = m_t_tplus1[(j, k)] / m_t_smoothed[j];
        }
    }

    // Collapse each predecessor row into that regime's smoothed component.
    let mut components = Vec::with_capacity(n);
    for j in 0..n {
        let row_states = pair_states.row_vec(j);
        let row_weights: Vec<f64> = (0..n).map(|k| w_t[(j, k)]).collect();
        let into_j = smoothed_tplus1.transforms.column_vec(j);
        components.push(collapse(&row_states, &row_weights, Some(&into_j))?);
    }

    let mut smoothed = Gmm::with_transforms(
        components,
        m_t_smoothed,
        smoothed_tplus1.transforms.clone(),
    );
    smoothed.pr_stplus1_st = Some(w_t);

    // Collapse cross-covariances per successor regime, and the U-weighted
    // smoothed means at t the driver needs for the regime-free cross term.
    let mut crossvar_by_successor = Vec::with_capacity(n);
    let mut mean_by_successor = Vec::with_capacity(n);
    for k in 0..n {
        let means_tplus1 = vec![smoothed_tplus1.components[k].mean.clone(); n];
        let means_t: Vec<DVector<f64>> =
            pair_states.column(k).map(|g| g.mean.clone()).collect();
        let crossvars = pair_crossvars.column_vec(k);
        let u_col: Vec<f64> = (0..n).map(|j| u[(j, k)]).collect();

        crossvar_by_successor.push(collapse_cross(
            &means_tplus1,
            &means_t,
            &crossvars,
            &u_col,
            None,
        )?);

        let mut mean_k = DVector::zeros(pair_states.get(0, k).dim());
        for j in 0..n {
            mean_k += &pair_states.get(j, k).mean * u[(j, k)];
        }
        mean_by_successor.push(mean_k);
    }

    Ok((
        smoothed,
        pair_crossvars,
        StepCross {
            crossvar_by_successor,
            mean_by_successor,
            successor_weights: m_tplus1.clone(),
        },
    ))
}

/// Run the full backward GPB2 pass over a filtered mixture sequence
///
/// Boundary: `smoothed[len-1] = filtered[len-1]` and likewise for the
/// collapsed estimate. The backward loop stores the smoothed mixture, its
/// collapsed Gaussian, the regime-free cross-covariance at (t+1, t), and the
/// full per-pair cross-covariance grid. Takes the buffer by value and returns
/// it populated.
pub fn smooth_sequence(
    mut sequence: GmmSequence,
    model: &SwitchingModel,
) -> Result<GmmSequence, SmootherError> {
    let len = sequence.len();
    let n = sequence.n_regimes();
    if n != model.n_regimes() {
        return Err(SmootherError::DimensionMismatch {
            expected: model.n_regimes(),
            actual: n,
            context: "sequence regime count".to_string(),
        });
    }

    sequence.smoothed[len - 1] = sequence.filtered[len - 1].clone();
    sequence.smoothed_collapsed[len - 1] = sequence.filtered_collapsed[len - 1].clone();

    for t in (0..len - 1).rev() {
        let filter_crossvar = sequence.filter_crossvar_at(t + 1);
        let (smoothed, pair_crossvars, step_cross) = smooth_step(
            &sequence.smoothed[t + 1],
            &sequence.filtered[t],
            &sequence.filtered[t + 1],
            &filter_crossvar,
            model,
        )?;

        // Smoothed means at t+1 were finalized by the previous iteration.
        let means_tplus1 = sequence.smoothed_means_at(t + 1);

        sequence.smoothed_collapsed[t] = smoothed.collapse()?;

        let into_first = smoothed.transforms.column_vec(0);
        sequence.smoothed_crossvar_collapsed[t + 1] = collapse_cross(
            &means_tplus1,
            &step_cross.mean_by_successor,
            &step_cross.crossvar_by_successor,
            step_cross.successor_weights.as_slice(),
            Some(&into_first),
        )?;

        for (j, k, crossvar) in pair_crossvars.iter_indexed() {
            sequence.smoothed_crossvar.get_mut(j, k)[t + 1] = crossvar.clone();
        }

        sequence.smoothed[t] = smoothed;
    }

    Ok(sequence)
}
