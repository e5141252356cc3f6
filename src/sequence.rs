//! Per-time estimate buffers for the linear and mixture cases
//!
//! A sequence owns every per-time array touched by a forward or backward pass:
//! filtered estimates (populated by the filter, read-only afterwards), smoothed
//! estimates and cross-covariances (written by the smoothers, strictly in
//! decreasing time order). All arrays are pre-sized at construction; the
//! drivers take the buffer by value, write into it, and return it.

use crate::errors::SmootherError;
use crate::types::{Gaussian, Gmm, Grid};
use nalgebra::{DMatrix, DVector};

/// Estimate buffers for a single-regime (linear) sequence
///
/// Cross-covariance convention: the entry at index `t` relates the states at
/// `(t, t-1)`; index 0 is unused and stays zero.
#[derive(Debug, Clone)]
pub struct Sequence {
    /// Filtered beliefs, one per time step (input, read-only)
    pub filtered: Vec<Gaussian>,
    /// Smoothed beliefs (output of the backward pass)
    pub smoothed: Vec<Gaussian>,
    /// Filter cross-covariances `Cov(x_t, x_{t-1} | y_{1:t})` (input)
    pub filter_crossvar: Vec<DMatrix<f64>>,
    /// Smoothed cross-covariances `Cov(x_t, x_{t-1} | y_{1:T})` (output)
    pub smooth_crossvar: Vec<DMatrix<f64>>,
}

impl Sequence {
    /// Build a sequence buffer from the forward pass outputs
    ///
    /// `filter_crossvar` must have one entry per time step (index 0 is
    /// ignored). Smoothed buffers are pre-sized and zero/filtered-initialized.
    pub fn new(
        filtered: Vec<Gaussian>,
        filter_crossvar: Vec<DMatrix<f64>>,
    ) -> Result<Self, SmootherError> {
        if filtered.is_empty() {
            return Err(SmootherError::DimensionMismatch {
                expected: 1,
                actual: 0,
                context: "sequence length".to_string(),
            });
        }
        if filter_crossvar.len() != filtered.len() {
            return Err(SmootherError::DimensionMismatch {
                expected: filtered.len(),
                actual: filter_crossvar.len(),
                context: "filter cross-covariance count".to_string(),
            });
        }

        let smoothed = filtered.clone();
        let smooth_crossvar = filter_crossvar
            .iter()
            .map(|m| DMatrix::zeros(m.nrows(), m.ncols()))
            .collect();

        Ok(Self {
            filtered,
            smoothed,
            filter_crossvar,
            smooth_crossvar,
        })
    }

    /// Number of time steps
    #[inline]
    pub fn len(&self) -> usize {
        self.filtered.len()
    }

    /// True when the sequence holds no time steps (never, by construction)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }
}

/// Estimate buffers for a multi-regime (mixture) sequence
///
/// Per-regime-pair cross-covariance stores are indexed `(j, k)` for the
/// predecessor regime j at t-1 and successor regime k at t; within each cell,
/// the `Vec` is indexed by time with the same `(t, t-1)` convention as the
/// linear [`Sequence`].
#[derive(Debug, Clone)]
pub struct GmmSequence {
    /// Filtered mixtures, one per time step (input, read-only)
    pub filtered: Vec<Gmm>,
    /// Smoothed mixtures (output of the backward pass)
    pub smoothed: Vec<Gmm>,
    /// Filtered mixtures collapsed to one Gaussian per time step
    pub filtered_collapsed: Vec<Gaussian>,
    /// Smoothed mixtures collapsed to one Gaussian per time step (output)
    pub smoothed_collapsed: Vec<Gaussian>,
    /// Per-pair filter cross-covariances (input)
    pub filter_crossvar: Grid<Vec<DMatrix<f64>>>,
    /// Per-pair smoothed cross-covariances (output)
    pub smoothed_crossvar: Grid<Vec<DMatrix<f64>>>,
    /// Regime-free smoothed cross-covariances (output)
    pub smoothed_crossvar_collapsed: Vec<DMatrix<f64>>,
}

impl GmmSequence {
    /// Build a mixture sequence buffer from the forward pass outputs
    ///
    /// Collapsed filtered estimates are computed here so every construction
    /// path agrees on the moment-matching convention.
    pub fn new(
        filtered: Vec<Gmm>,
        filter_crossvar: Grid<Vec<DMatrix<f64>>>,
    ) -> Result<Self, SmootherError> {
        if filtered.is_empty() {
            return Err(SmootherError::DimensionMismatch {
                expected: 1,
                actual: 0,
                context: "sequence length".to_string(),
            });
        }
        let len = filtered.len();
        let n = filtered[0].n_components();
        if filter_crossvar.n() != n {
            return Err(SmootherError::DimensionMismatch {
                expected: n,
                actual: filter_crossvar.n(),
                context: "filter cross-covariance regime count".to_string(),
            });
        }
        for (j, k, cell) in filter_crossvar.iter_indexed() {
            if cell.len() != len {
                return Err(SmootherError::DimensionMismatch {
                    expected: len,
                    actual: cell.len(),
                    context: format!("filter cross-covariance length at pair ({}, {})", j, k),
                });
            }
        }

        let filtered_collapsed = filtered
            .iter()
            .map(|g| g.collapse())
            .collect::<Result<Vec<_>, _>>()?;
        let smoothed_collapsed = filtered_collapsed.clone();
        let smoothed = filtered.clone();

        let smoothed_crossvar: Grid<Vec<DMatrix<f64>>> = Grid::from_fn(n, |j, k| {
            filter_crossvar
                .get(j, k)
                .iter()
                .map(|m| DMatrix::zeros(m.nrows(), m.ncols()))
                .collect()
        });

        let d = filtered_collapsed[0].dim();
        let smoothed_crossvar_collapsed = vec![DMatrix::zeros(d, d); len];

        Ok(Self {
            filtered,
            smoothed,
            filtered_collapsed,
            smoothed_collapsed,
            filter_crossvar,
            smoothed_crossvar,
            smoothed_crossvar_collapsed,
        })
    }

    /// Number of time steps
    #[inline]
    pub fn len(&self) -> usize {
        self.filtered.len()
    }

    /// True when the sequence holds no time steps (never, by construction)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    /// Number of regimes
    #[inline]
    pub fn n_regimes(&self) -> usize {
        self.filtered[0].n_components()
    }

    /// Per-pair filter cross-covariances at one time index
    pub fn filter_crossvar_at(&self, t: usize) -> Grid<DMatrix<f64>> {
        Grid::from_fn(self.filter_crossvar.n(), |j, k| {
            self.filter_crossvar.get(j, k)[t].clone()
        })
    }

    /// Smoothed per-regime means at one time index
    pub fn smoothed_means_at(&self, t: usize) -> Vec<DVector<f64>> {
        self.smoothed[t]
            .components
            .iter()
            .map(|c| c.mean.clone())
            .collect()
    }
}
