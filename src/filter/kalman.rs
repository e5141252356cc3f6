//! Forward Kalman filtering for a single linear regime
//!
//! Produces the filtered sequence and the filter cross-covariances the RTS
//! smoother consumes. The covariance update uses the Joseph form for
//! numerical stability.

use crate::common::linalg::{checked_inverse, log_gaussian_pdf, symmetrize};
use crate::errors::SmootherError;
use crate::model::LinearModel;
use crate::sequence::Sequence;
use crate::types::Gaussian;
use nalgebra::{DMatrix, DVector};

/// Result of a single measurement update
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    /// Updated (filtered) belief
    pub state: Gaussian,
    /// Kalman gain used in the update
    pub gain: DMatrix<f64>,
    /// Measurement log-likelihood under the predicted belief
    pub log_likelihood: f64,
}

/// Kalman measurement update of a predicted belief
///
/// # Errors
/// `SingularMatrix` if the innovation covariance is not invertible;
/// `DimensionMismatch` if the measurement does not match the model.
pub fn update(
    predicted: &Gaussian,
    measurement: &DVector<f64>,
    model: &LinearModel,
) -> Result<UpdateOutcome, SmootherError> {
    if measurement.len() != model.z_dim() {
        return Err(SmootherError::DimensionMismatch {
            expected: model.z_dim(),
            actual: measurement.len(),
            context: "measurement dimension".to_string(),
        });
    }
    if predicted.dim() != model.x_dim() {
        return Err(SmootherError::DimensionMismatch {
            expected: model.x_dim(),
            actual: predicted.dim(),
            context: "predicted state dimension".to_string(),
        });
    }

    let z_pred = &model.h * &predicted.mean;
    let innovation = measurement - &z_pred;
    let s = &model.h * &predicted.covar * model.h.transpose() + &model.r;

    let s_inv = checked_inverse(&s, "innovation covariance")?;
    let gain = &predicted.covar * model.h.transpose() * s_inv;

    let mean = &predicted.mean + &gain * &innovation;

    // Joseph form for numerical stability
    let d = model.x_dim();
    let i_minus_kh = DMatrix::identity(d, d) - &gain * &model.h;
    let covar = symmetrize(
        &(&i_minus_kh * &predicted.covar * i_minus_kh.transpose()
            + &gain * &model.r * gain.transpose()),
    );

    let log_likelihood = log_gaussian_pdf(&innovation, &DVector::zeros(innovation.len()), &s);

    Ok(UpdateOutcome {
        state: Gaussian::new(mean, covar),
        gain,
        log_likelihood,
    })
}

/// One-step prediction under the regime dynamics
pub fn predict(state: &Gaussian, model: &LinearModel) -> Gaussian {
    Gaussian::new(
        &model.a * &state.mean,
        symmetrize(&(&model.a * &state.covar * model.a.transpose() + &model.q)),
    )
}

/// Run the forward pass over a measurement sequence
///
/// The prior is the belief at time 0 before seeing `measurements[0]`; the
/// first step is an update only. Every later step predicts then updates, and
/// records the filter cross-covariance
/// `Cov(x_t, x_{t-1} | y_{1:t}) = (I - K·H)·A·V_{t-1|t-1}` at index t.
pub fn filter_sequence(
    measurements: &[DVector<f64>],
    model: &LinearModel,
    prior: &Gaussian,
) -> Result<Sequence, SmootherError> {
    if measurements.is_empty() {
        return Err(SmootherError::DimensionMismatch {
            expected: 1,
            actual: 0,
            context: "measurement count".to_string(),
        });
    }

    let d = model.x_dim();
    let mut filtered = Vec::with_capacity(measurements.len());
    let mut crossvar = Vec::with_capacity(measurements.len());

    let first = update(prior, &measurements[0], model)?;
    let mut previous = first.state.clone();
    filtered.push(first.state);
    crossvar.push(DMatrix::zeros(d, d));

    for y in &measurements[1..] {
        let predicted = predict(&previous, model);
        let outcome = update(&predicted, y, model)?;

        let i_minus_kh = DMatrix::identity(d, d) - &outcome.gain * &model.h;
        crossvar.push(i_minus_kh * &model.a * &previous.covar);
        previous = outcome.state.clone();
        filtered.push(outcome.state);
    }

    Sequence::new(filtered, crossvar)
}
