//! Linear algebra utilities
//!
//! Mathematical functions for Gaussian operations and matrix manipulations
//! required by the filtering and smoothing recursions.

use crate::errors::SmootherError;
use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;

/// Invert a matrix, surfacing a [`SmootherError::SingularMatrix`] on failure
///
/// # Arguments
/// * `matrix` - Matrix to invert
/// * `context` - Description of the matrix, used in the error message
pub fn checked_inverse(
    matrix: &DMatrix<f64>,
    context: &str,
) -> Result<DMatrix<f64>, SmootherError> {
    matrix
        .clone()
        .try_inverse()
        .filter(|inv| inv.iter().all(|v| v.is_finite()))
        .ok_or_else(|| SmootherError::SingularMatrix {
            context: context.to_string(),
        })
}

/// Compute log Gaussian PDF for numerical stability
///
/// # Arguments
/// * `x` - Point to evaluate
/// * `mu` - Mean vector
/// * `sigma` - Covariance matrix
///
/// # Returns
/// Log probability density, `NEG_INFINITY` for a singular covariance
pub fn log_gaussian_pdf(x: &DVector<f64>, mu: &DVector<f64>, sigma: &DMatrix<f64>) -> f64 {
    let n = x.len() as f64;
    let diff = x - mu;

    let det = sigma.determinant();
    if det <= 0.0 {
        return f64::NEG_INFINITY;
    }

    // Cholesky decomposition for numerical stability
    match sigma.clone().cholesky() {
        Some(chol) => {
            let inv_sigma_diff = chol.solve(&diff);
            let mahalanobis = diff.dot(&inv_sigma_diff);

            -0.5 * (n * (2.0 * PI).ln() + det.ln() + mahalanobis)
        }
        None => f64::NEG_INFINITY,
    }
}

/// Compute log-sum-exp for numerical stability
///
/// Computes log(sum(exp(x))) in a numerically stable way
pub fn log_sum_exp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }

    let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max_val.is_infinite() && max_val < 0.0 {
        return f64::NEG_INFINITY;
    }

    let sum: f64 = values.iter().map(|v| (v - max_val).exp()).sum();
    max_val + sum.ln()
}

/// Check if matrix is positive definite
pub fn is_positive_definite(matrix: &DMatrix<f64>) -> bool {
    matrix.clone().cholesky().is_some()
}

/// Make matrix symmetric
///
/// Ensures a matrix is symmetric by averaging with its transpose.
/// Covariance updates accumulate asymmetric floating-point residue,
/// so every covariance written by this crate passes through here.
pub fn symmetrize(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    0.5 * (matrix + matrix.transpose())
}
