//! Error types for the filtering and smoothing passes
//!
//! This module provides proper error handling instead of panics.

use std::fmt;

/// Errors that can occur during a forward filtering or backward smoothing pass
///
/// All variants are terminal for the current pass: the recursions depend on
/// every step succeeding in order, so there is no local recovery or retry.
#[derive(Debug, Clone)]
pub enum SmootherError {
    /// Matrix inversion failed (singular matrix)
    SingularMatrix {
        /// Description of which matrix failed
        context: String,
    },

    /// A weight-normalization denominator was zero or non-finite
    ///
    /// Arises when a regime has no prior support (a zero column in the
    /// transition matrix or a zero filtered weight).
    DegenerateWeights {
        /// Description of which normalization failed
        context: String,
    },

    /// Dimension mismatch between expected and actual
    DimensionMismatch {
        /// What was expected
        expected: usize,
        /// What was received
        actual: usize,
        /// Context (e.g., "state dimension", "number of regimes")
        context: String,
    },
}

impl fmt::Display for SmootherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmootherError::SingularMatrix { context } => {
                write!(f, "Matrix inversion failed: {}", context)
            }
            SmootherError::DegenerateWeights { context } => {
                write!(f, "Degenerate weight normalization: {}", context)
            }
            SmootherError::DimensionMismatch {
                expected,
                actual,
                context,
            } => {
                write!(
                    f,
                    "Dimension mismatch for {}: expected {}, got {}",
                    context, expected, actual
                )
            }
        }
    }
}

impl std::error::Error for SmootherError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singular_matrix_display() {
        let err = SmootherError::SingularMatrix {
            context: "predicted covariance".to_string(),
        };
        assert!(err.to_string().contains("predicted covariance"));
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = SmootherError::DimensionMismatch {
            expected: 4,
            actual: 6,
            context: "state".to_string(),
        };
        assert!(err.to_string().contains("4"));
        assert!(err.to_string().contains("6"));
    }

    #[test]
    fn test_degenerate_weights_display() {
        let err = SmootherError::DegenerateWeights {
            context: "column 1 of the joint regime weights".to_string(),
        };
        assert!(err.to_string().contains("column 1"));
    }
}
