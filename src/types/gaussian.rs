//! Gaussian and Gaussian-mixture belief types
//!
//! These are the continuous-state beliefs manipulated by the filters and
//! smoothers. Runtime dimensions (`DVector`/`DMatrix`) are used throughout so
//! regimes with different state dimensions can coexist in one mixture.

use crate::collapse::collapse;
use crate::errors::SmootherError;
use crate::types::grid::Grid;
use nalgebra::{DMatrix, DVector};
use smallvec::SmallVec;

/// A single Gaussian belief over the continuous state
///
/// Immutable once constructed: every filtering or smoothing step produces a
/// new instance rather than mutating an existing one.
#[derive(Debug, Clone)]
pub struct Gaussian {
    /// Mean vector (state estimate)
    pub mean: DVector<f64>,
    /// Covariance matrix (symmetric positive semi-definite)
    pub covar: DMatrix<f64>,
}

impl Gaussian {
    /// Create a new Gaussian belief
    pub fn new(mean: DVector<f64>, covar: DMatrix<f64>) -> Self {
        Self { mean, covar }
    }

    /// State dimension
    #[inline]
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Zero-mean belief with the given covariance scale (for priors)
    pub fn isotropic(dim: usize, variance: f64) -> Self {
        Self {
            mean: DVector::zeros(dim),
            covar: DMatrix::identity(dim, dim) * variance,
        }
    }
}

/// A Gaussian mixture over regimes, one component per regime
///
/// The pairwise `transforms` grid aligns components whose native state
/// dimensions differ across regimes: `transforms[(a, b)]` projects a
/// regime-`a` state into regime-`b` coordinates. When all regimes share a
/// dimension every transform is the identity.
#[derive(Debug, Clone)]
pub struct Gmm {
    /// Mixture components, ordered by regime index
    pub components: SmallVec<[Gaussian; 4]>,
    /// Component weights (sum to 1 within floating tolerance)
    pub weights: DVector<f64>,
    /// Pairwise projection matrices between regime state spaces
    pub transforms: Grid<DMatrix<f64>>,
    /// Backward regime-transition responsibilities `Pr(S_{t+1} | S_t, y_{1:T})`
    ///
    /// Populated by the mixture smoother; consumed by the EM loop when
    /// re-estimating the regime-transition matrix.
    pub pr_stplus1_st: Option<DMatrix<f64>>,
}

impl Gmm {
    /// Create a mixture with identity pairwise transforms
    ///
    /// Suitable whenever all regimes share a state dimension.
    pub fn new(components: Vec<Gaussian>, weights: DVector<f64>) -> Self {
        let n = components.len();
        let dim = components.first().map(|c| c.dim()).unwrap_or(0);
        Self {
            components: SmallVec::from_vec(components),
            weights,
            transforms: Grid::from_element(n, DMatrix::identity(dim, dim)),
            pr_stplus1_st: None,
        }
    }

    /// Create a mixture with explicit pairwise transforms
    pub fn with_transforms(
        components: Vec<Gaussian>,
        weights: DVector<f64>,
        transforms: Grid<DMatrix<f64>>,
    ) -> Self {
        Self {
            components: SmallVec::from_vec(components),
            weights,
            transforms,
            pr_stplus1_st: None,
        }
    }

    /// Create a mixture with uniform weights
    pub fn uniform(components: Vec<Gaussian>) -> Self {
        let n = components.len();
        let weights = DVector::from_element(n, 1.0 / n as f64);
        Self::new(components, weights)
    }

    /// Number of mixture components (regimes)
    #[inline]
    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Moment-match the mixture into a single Gaussian
    ///
    /// Components are projected through the transforms of column 0 (into the
    /// first regime's coordinates) before matching, so mixtures over regimes
    /// with differing dimensions collapse consistently.
    pub fn collapse(&self) -> Result<Gaussian, SmootherError> {
        let transforms = self.transforms.column_vec(0);
        collapse(
            &self.components,
            self.weights.as_slice(),
            Some(&transforms),
        )
    }
}
