//! Model types for jump-Markov linear Gaussian systems
//!
//! A [`LinearModel`] holds the per-regime dynamics and measurement parameters;
//! a [`SwitchingModel`] bundles one model per regime with the regime-transition
//! probability matrix. Both are read-only during filtering and smoothing.

use crate::errors::SmootherError;
use nalgebra::DMatrix;
use serde::Serialize;

/// Linear-Gaussian dynamics and measurement parameters for one regime
#[derive(Debug, Clone)]
pub struct LinearModel {
    /// State transition matrix A (D×D)
    pub a: DMatrix<f64>,
    /// Process noise covariance Q (D×D)
    pub q: DMatrix<f64>,
    /// Measurement matrix H (M×D)
    pub h: DMatrix<f64>,
    /// Measurement noise covariance R (M×M)
    pub r: DMatrix<f64>,
}

impl LinearModel {
    /// Create a new linear-Gaussian model
    pub fn new(a: DMatrix<f64>, q: DMatrix<f64>, h: DMatrix<f64>, r: DMatrix<f64>) -> Self {
        Self { a, q, h, r }
    }

    /// State dimension
    #[inline]
    pub fn x_dim(&self) -> usize {
        self.a.nrows()
    }

    /// Measurement dimension
    #[inline]
    pub fn z_dim(&self) -> usize {
        self.h.nrows()
    }

    /// Fully observed random walk in `dim` dimensions
    ///
    /// A = H = I, isotropic process and measurement noise. Useful as a
    /// low-dynamics regime in a switching model.
    pub fn random_walk(dim: usize, process_var: f64, measurement_var: f64) -> Self {
        Self {
            a: DMatrix::identity(dim, dim),
            q: DMatrix::identity(dim, dim) * process_var,
            h: DMatrix::identity(dim, dim),
            r: DMatrix::identity(dim, dim) * measurement_var,
        }
    }

    /// Constant-velocity model in 1D with position-only measurements
    ///
    /// State `[x, vx]`, transition `[1, dt; 0, 1]`, white-noise-acceleration
    /// process noise.
    pub fn constant_velocity_1d(dt: f64, process_noise_std: f64, measurement_var: f64) -> Self {
        #[rustfmt::skip]
        let a = DMatrix::from_row_slice(2, 2, &[
            1.0, dt,
            0.0, 1.0,
        ]);

        let qv = process_noise_std * process_noise_std;
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        #[rustfmt::skip]
        let q = DMatrix::from_row_slice(2, 2, &[
            qv * dt3 / 3.0, qv * dt2 / 2.0,
            qv * dt2 / 2.0, qv * dt,
        ]);

        let h = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        let r = DMatrix::from_vec(1, 1, vec![measurement_var]);

        Self::new(a, q, h, r)
    }
}

/// A set of per-regime linear models plus the regime-transition matrix
///
/// The transition matrix Z is row-stochastic: `Z[(j, k)] = P(S_{t+1} = k |
/// S_t = j)`, each row summing to 1.
#[derive(Debug, Clone)]
pub struct SwitchingModel {
    /// One linear-Gaussian model per regime
    pub models: Vec<LinearModel>,
    /// Regime-transition probability matrix Z (N×N, rows sum to 1)
    pub transition: DMatrix<f64>,
}

impl SwitchingModel {
    /// Create a switching model, validating the transition matrix
    ///
    /// # Errors
    /// `DimensionMismatch` if Z is not N×N for N models;
    /// `DegenerateWeights` if any row of Z does not sum to 1 within `1e-9`.
    pub fn new(
        models: Vec<LinearModel>,
        transition: DMatrix<f64>,
    ) -> Result<Self, SmootherError> {
        let n = models.len();
        if transition.nrows() != n || transition.ncols() != n {
            return Err(SmootherError::DimensionMismatch {
                expected: n,
                actual: transition.nrows().max(transition.ncols()),
                context: "regime-transition matrix".to_string(),
            });
        }
        for j in 0..n {
            let row_sum: f64 = transition.row(j).iter().sum();
            if !row_sum.is_finite() || (row_sum - 1.0).abs() > 1e-9 {
                return Err(SmootherError::DegenerateWeights {
                    context: format!("row {} of the regime-transition matrix", j),
                });
            }
        }
        Ok(Self { models, transition })
    }

    /// Number of regimes
    #[inline]
    pub fn n_regimes(&self) -> usize {
        self.models.len()
    }

    /// Serialize a snapshot to a JSON string (for debugging/comparison)
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&SwitchingModelSnapshot::from(self))
    }
}

/// Snapshot of one regime's model parameters for debugging
#[derive(Debug, Clone, Serialize)]
pub struct LinearModelSnapshot {
    /// State dimension
    pub x_dim: usize,
    /// Measurement dimension
    pub z_dim: usize,
    /// Transition matrix A (flattened row-major)
    pub a: Vec<f64>,
    /// Process noise covariance Q (flattened row-major)
    pub q: Vec<f64>,
    /// Measurement matrix H (flattened row-major)
    pub h: Vec<f64>,
    /// Measurement noise covariance R (flattened row-major)
    pub r: Vec<f64>,
}

impl From<&LinearModel> for LinearModelSnapshot {
    fn from(m: &LinearModel) -> Self {
        Self {
            x_dim: m.x_dim(),
            z_dim: m.z_dim(),
            a: m.a.transpose().iter().copied().collect(),
            q: m.q.transpose().iter().copied().collect(),
            h: m.h.transpose().iter().copied().collect(),
            r: m.r.transpose().iter().copied().collect(),
        }
    }
}

/// Snapshot of a full switching model for debugging
#[derive(Debug, Clone, Serialize)]
pub struct SwitchingModelSnapshot {
    /// Number of regimes
    pub n_regimes: usize,
    /// Per-regime model parameters
    pub models: Vec<LinearModelSnapshot>,
    /// Regime-transition matrix (flattened row-major)
    pub transition: Vec<f64>,
}

impl From<&SwitchingModel> for SwitchingModelSnapshot {
    fn from(m: &SwitchingModel) -> Self {
        Self {
            n_regimes: m.n_regimes(),
            models: m.models.iter().map(|l| l.into()).collect(),
            transition: m.transition.transpose().iter().copied().collect(),
        }
    }
}
