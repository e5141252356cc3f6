//! Rauch-Tung-Striebel fixed-interval smoothing for one linear regime
//!
//! The backward recursion converts filtered beliefs into smoothed beliefs
//! conditioning on the whole measurement sequence, and produces the
//! cross-time covariances the EM loop needs. One step is a pure function;
//! the sequence driver is a strictly sequential backward traversal (step t
//! requires the completed result of step t+1).

use crate::common::linalg::{checked_inverse, symmetrize};
use crate::errors::SmootherError;
use crate::model::LinearModel;
use crate::sequence::Sequence;
use crate::types::Gaussian;
use nalgebra::DMatrix;

/// One backward smoothing step for a linear-Gaussian regime
///
/// Combines the filtered belief at time t with the smoothed belief at t+1:
///
/// 1. project the filtered belief through `transform` (identity by default),
/// 2. predict one step forward (`x' = A·x`, `V' = A·V·Aᵀ + Q`),
/// 3. smoother gain `G = V·Aᵀ·V'⁻¹`,
/// 4. `x_s = x + G·(x_{t+1|T} - x')`, `V_s = V + G·(V_{t+1|T} - V')·Gᵀ`,
/// 5. smoothed cross-covariance
///    `C_s = C_f + (V_{t+1|T} - V_{t+1|t+1})·V_{t+1|t+1}⁻¹·C_f`.
///
/// # Arguments
/// * `smoothed_tplus1` - Smoothed belief at t+1
/// * `filtered_t` - Filtered belief at t
/// * `filtered_tplus1` - Filtered belief at t+1
/// * `filter_crossvar` - Filter cross-covariance between t+1 and t
/// * `model` - Regime dynamics (A, Q used; H, R untouched here)
/// * `transform` - Optional projection of the time-t belief into the model's
///   state space; identity when `None`
///
/// # Returns
/// The smoothed belief at t and the smoothed cross-covariance between t+1
/// and t.
///
/// # Errors
/// `SingularMatrix` if the predicted covariance or the filtered covariance at
/// t+1 is not invertible; `DimensionMismatch` if the inputs disagree on the
/// state dimension.
pub fn smooth_step(
    smoothed_tplus1: &Gaussian,
    filtered_t: &Gaussian,
    filtered_tplus1: &Gaussian,
    filter_crossvar: &DMatrix<f64>,
    model: &LinearModel,
    transform: Option<&DMatrix<f64>>,
) -> Result<(Gaussian, DMatrix<f64>), SmootherError> {
    let d = model.x_dim();

    let identity;
    let transform = match transform {
        Some(t) => t,
        None => {
            identity = DMatrix::identity(d, d);
            &identity
        }
    };

    if transform.ncols() != filtered_t.dim() {
        return Err(SmootherError::DimensionMismatch {
            expected: transform.ncols(),
            actual: filtered_t.dim(),
            context: "transform vs filtered state at t".to_string(),
        });
    }
    if transform.nrows() != d {
        return Err(SmootherError::DimensionMismatch {
            expected: d,
            actual: transform.nrows(),
            context: "transform vs model state dimension".to_string(),
        });
    }
    if smoothed_tplus1.dim() != d || filtered_tplus1.dim() != d {
        return Err(SmootherError::DimensionMismatch {
            expected: d,
            actual: smoothed_tplus1.dim(),
            context: "state at t+1".to_string(),
        });
    }
    if filter_crossvar.nrows() != d {
        return Err(SmootherError::DimensionMismatch {
            expected: d,
            actual: filter_crossvar.nrows(),
            context: "filter cross-covariance rows".to_string(),
        });
    }

    // Project the time-t belief into the model's state space.
    let x = transform * &filtered_t.mean;
    let v = transform * &filtered_t.covar * transform.transpose();

    // One-step prediction under this regime's dynamics.
    let x_predict = &model.a * &x;
    let v_predict = &model.a * &v * model.a.transpose() + &model.q;

    let v_predict_inv = checked_inverse(&v_predict, "predicted covariance")?;
    let gain = &v * model.a.transpose() * v_predict_inv;

    let x_smoothed = &x + &gain * (&smoothed_tplus1.mean - &x_predict);
    let v_smoothed = symmetrize(
        &(&v + &gain * (&smoothed_tplus1.covar - &v_predict) * gain.transpose()),
    );

    // Smoothed cross-covariance between t+1 and t.
    let v_f_tplus1_inv = checked_inverse(&filtered_tplus1.covar, "filtered covariance at t+1")?;
    let smooth_crossvar = filter_crossvar
        + (&smoothed_tplus1.covar - &filtered_tplus1.covar) * v_f_tplus1_inv * filter_crossvar;

    Ok((Gaussian::new(x_smoothed, v_smoothed), smooth_crossvar))
}

/// Run the full backward pass over a filtered sequence
///
/// Sets `smoothed[len-1] = filtered[len-1]`, then iterates from the
/// penultimate index down to 0, writing `smoothed[t]` and
/// `smooth_crossvar[t+1]` at each step. Takes the buffer by value and
/// returns it populated.
pub fn smooth_sequence(
    mut sequence: Sequence,
    model: &LinearModel,
) -> Result<Sequence, SmootherError> {
    let len = sequence.len();
    sequence.smoothed[len - 1] = sequence.filtered[len - 1].clone();

    for t in (0..len - 1).rev() {
        let (state, crossvar) = smooth_step(
            &sequence.smoothed[t + 1],
            &sequence.filtered[t],
            &sequence.filtered[t + 1],
            &sequence.filter_crossvar[t + 1],
            model,
            None,
        )?;
        sequence.smoothed[t] = state;
        sequence.smooth_crossvar[t + 1] = crossvar;
    }

    Ok(sequence)
}
