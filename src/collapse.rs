//! Mixture collapsing primitives
//!
//! Moment matching reduces a weighted Gaussian mixture to the single Gaussian
//! with the same first and second moments. The cross variant does the same for
//! cross-time covariance blocks, which the EM loop consumes. Both accept an
//! optional per-component transform so components living in different regime
//! state spaces can be projected into a common space before matching.

use crate::errors::SmootherError;
use crate::types::Gaussian;
use nalgebra::{DMatrix, DVector};

fn normalized_weights(weights: &[f64], context: &str) -> Result<Vec<f64>, SmootherError> {
    let sum: f64 = weights.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return Err(SmootherError::DegenerateWeights {
            context: context.to_string(),
        });
    }
    Ok(weights.iter().map(|w| w / sum).collect())
}

/// Moment-match a weighted Gaussian mixture into a single Gaussian
///
/// With projected moments `m_i' = T_i m_i` and `P_i' = T_i P_i T_iᵀ`, the
/// collapsed belief is
///
/// - `x = Σ w_i m_i'`
/// - `V = Σ w_i (P_i' + (m_i' - x)(m_i' - x)ᵀ)`
///
/// # Arguments
/// * `components` - Mixture components
/// * `weights` - One weight per component (normalized internally)
/// * `transforms` - Optional per-component projections; identity when `None`
pub fn collapse(
    components: &[Gaussian],
    weights: &[f64],
    transforms: Option<&[DMatrix<f64>]>,
) -> Result<Gaussian, SmootherError> {
    if components.len() != weights.len() {
        return Err(SmootherError::DimensionMismatch {
            expected: components.len(),
            actual: weights.len(),
            context: "collapse weights".to_string(),
        });
    }
    if components.is_empty() {
        return Err(SmootherError::DegenerateWeights {
            context: "collapse of an empty mixture".to_string(),
        });
    }
    if let Some(ts) = transforms {
        if ts.len() != components.len() {
            return Err(SmootherError::DimensionMismatch {
                expected: components.len(),
                actual: ts.len(),
                context: "collapse transforms".to_string(),
            });
        }
    }

    let weights = normalized_weights(weights, "collapse weight sum")?;

    // Project every component into the common space first.
    let mut means = Vec::with_capacity(components.len());
    let mut covars = Vec::with_capacity(components.len());
    for (i, c) in components.iter().enumerate() {
        match transforms {
            Some(ts) => {
                let t = &ts[i];
                if t.ncols() != c.dim() {
                    return Err(SmootherError::DimensionMismatch {
                        expected: t.ncols(),
                        actual: c.dim(),
                        context: format!("collapse transform {} vs component mean", i),
                    });
                }
                means.push(t * &c.mean);
                covars.push(t * &c.covar * t.transpose());
            }
            None => {
                if c.dim() != components[0].dim() {
                    return Err(SmootherError::DimensionMismatch {
                        expected: components[0].dim(),
                        actual: c.dim(),
                        context: format!("collapse component {} dimension", i),
                    });
                }
                means.push(c.mean.clone());
                covars.push(c.covar.clone());
            }
        }
    }

    let dim = means[0].len();
    let mut x = DVector::zeros(dim);
    for (w, m) in weights.iter().zip(&means) {
        x += m * *w;
    }

    let mut v = DMatrix::zeros(dim, dim);
    for ((w, m), p) in weights.iter().zip(&means).zip(&covars) {
        let d = m - &x;
        v += (p + &d * d.transpose()) * *w;
    }

    Ok(Gaussian::new(x, v))
}

/// Moment-match per-component cross-covariances into a single cross-covariance
///
/// For components with means `a_i` (one time index) and `b_i` (the other) and
/// cross blocks `C_i = Cov(a_i, b_i)`, the collapsed cross-covariance is
///
/// `V = Σ w_i (C_i' + (a_i - ā)(b_i' - b̄)ᵀ)`
///
/// where the optional per-component transform is applied to the `b` side:
/// `b_i' = T_i b_i`, `C_i' = C_i T_iᵀ`.
pub fn collapse_cross(
    means_a: &[DVector<f64>],
    means_b: &[DVector<f64>],
    cross_covars: &[DMatrix<f64>],
    weights: &[f64],
    transforms: Option<&[DMatrix<f64>]>,
) -> Result<DMatrix<f64>, SmootherError> {
    let n = weights.len();
    if means_a.len() != n || means_b.len() != n || cross_covars.len() != n {
        return Err(SmootherError::DimensionMismatch {
            expected: n,
            actual: means_a.len().min(means_b.len()).min(cross_covars.len()),
            context: "collapse_cross component count".to_string(),
        });
    }
    if n == 0 {
        return Err(SmootherError::DegenerateWeights {
            context: "collapse_cross of an empty mixture".to_string(),
        });
    }

    let weights = normalized_weights(weights, "collapse_cross weight sum")?;

    let mut b_means = Vec::with_capacity(n);
    let mut crosses = Vec::with_capacity(n);
    for i in 0..n {
        match transforms {
            Some(ts) => {
                b_means.push(&ts[i] * &means_b[i]);
                crosses.push(&cross_covars[i] * ts[i].transpose());
            }
            None => {
                b_means.push(means_b[i].clone());
                crosses.push(cross_covars[i].clone());
            }
        }
    }

    let dim_a = means_a[0].len();
    let dim_b = b_means[0].len();

    let mut a_bar = DVector::zeros(dim_a);
    let mut b_bar = DVector::zeros(dim_b);
    for i in 0..n {
        if means_a[i].len() != dim_a || b_means[i].len() != dim_b {
            return Err(SmootherError::DimensionMismatch {
                expected: dim_a,
                actual: means_a[i].len(),
                context: format!("collapse_cross mean {} dimension", i),
            });
        }
        a_bar += &means_a[i] * weights[i];
        b_bar += &b_means[i] * weights[i];
    }

    let mut v = DMatrix::zeros(dim_a, dim_b);
    for i in 0..n {
        let da = &means_a[i] - &a_bar;
        let db = &b_means[i] - &b_bar;
        v += (&crosses[i] + da * db.transpose()) * weights[i];
    }

    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_single_component_is_identity() {
        let g = Gaussian::new(
            DVector::from_vec(vec![1.0, 2.0]),
            DMatrix::identity(2, 2) * 3.0,
        );
        let out = collapse(std::slice::from_ref(&g), &[1.0], None).unwrap();
        assert!((&out.mean - &g.mean).abs().max() < 1e-12);
        assert!((&out.covar - &g.covar).abs().max() < 1e-12);
    }

    #[test]
    fn test_collapse_adds_spread_term() {
        let comps = vec![
            Gaussian::new(DVector::from_vec(vec![-1.0]), DMatrix::from_vec(1, 1, vec![0.5])),
            Gaussian::new(DVector::from_vec(vec![1.0]), DMatrix::from_vec(1, 1, vec![0.5])),
        ];
        let out = collapse(&comps, &[0.5, 0.5], None).unwrap();
        assert!(out.mean[0].abs() < 1e-12);
        // within-component 0.5 + between-component 1.0
        assert!((out.covar[(0, 0)] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_collapse_normalizes_weights() {
        let comps = vec![
            Gaussian::new(DVector::from_vec(vec![0.0]), DMatrix::from_vec(1, 1, vec![1.0])),
            Gaussian::new(DVector::from_vec(vec![4.0]), DMatrix::from_vec(1, 1, vec![1.0])),
        ];
        let out = collapse(&comps, &[2.0, 2.0], None).unwrap();
        assert!((out.mean[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_collapse_zero_weight_sum_errors() {
        let comps = vec![Gaussian::isotropic(1, 1.0)];
        let err = collapse(&comps, &[0.0], None).unwrap_err();
        assert!(matches!(err, SmootherError::DegenerateWeights { .. }));
    }

    #[test]
    fn test_collapse_with_transform_projects() {
        // 2-D component projected onto its first coordinate
        let comps = vec![Gaussian::new(
            DVector::from_vec(vec![3.0, 9.0]),
            DMatrix::identity(2, 2),
        )];
        let t = vec![DMatrix::from_row_slice(1, 2, &[1.0, 0.0])];
        let out = collapse(&comps, &[1.0], Some(&t)).unwrap();
        assert_eq!(out.dim(), 1);
        assert!((out.mean[0] - 3.0).abs() < 1e-12);
        assert!((out.covar[(0, 0)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_collapse_cross_single_component() {
        let a = vec![DVector::from_vec(vec![1.0])];
        let b = vec![DVector::from_vec(vec![2.0])];
        let c = vec![DMatrix::from_vec(1, 1, vec![0.3])];
        let out = collapse_cross(&a, &b, &c, &[1.0], None).unwrap();
        assert!((out[(0, 0)] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_collapse_cross_spread_term() {
        let a = vec![
            DVector::from_vec(vec![-1.0]),
            DVector::from_vec(vec![1.0]),
        ];
        let b = vec![
            DVector::from_vec(vec![-2.0]),
            DVector::from_vec(vec![2.0]),
        ];
        let c = vec![DMatrix::zeros(1, 1), DMatrix::zeros(1, 1)];
        let out = collapse_cross(&a, &b, &c, &[0.5, 0.5], None).unwrap();
        // E[(a - 0)(b - 0)] = 0.5*(-1)(-2) + 0.5*(1)(2) = 2
        assert!((out[(0, 0)] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_collapse_cross_count_mismatch() {
        let a = vec![DVector::from_vec(vec![0.0])];
        let b: Vec<DVector<f64>> = vec![];
        let c = vec![DMatrix::zeros(1, 1)];
        let err = collapse_cross(&a, &b, &c, &[1.0], None).unwrap_err();
        assert!(matches!(err, SmootherError::DimensionMismatch { .. }));
    }
}
