/*!
# gpb2-smoothers - Fixed-interval smoothing for switching linear systems

Rust implementation of offline (fixed-interval) smoothing for jump-Markov
linear Gaussian state-space models: a hidden continuous state evolves under
one of several linear-Gaussian regimes, with regime switching captured by a
discrete Markov chain.

## Features

- Single-regime Rauch-Tung-Striebel (RTS) smoothing
- Multi-regime Generalized Pseudo-Bayes order-2 (GPB2) mixture smoothing,
  including per-regime-pair and collapsed cross-time covariances for EM
- Forward Kalman and GPB2 filtering passes that produce the inputs the
  smoothers consume

## Modules

- [`smoother`] - RTS and GPB2 backward recursions
- [`filter`] - Kalman and GPB2 forward passes
- [`model`] - per-regime models and the switching model
- [`sequence`] - owned per-time estimate buffers
- [`collapse`] - Gaussian-mixture moment matching
- [`common`] - low-level linear algebra utilities

## Example

```rust
use gpb2_smoothers::model::{LinearModel, SwitchingModel};
use gpb2_smoothers::types::{Gaussian, Gmm};
use gpb2_smoothers::{filter, smoother};
use nalgebra::{DMatrix, DVector};

// Two regimes: calm and volatile random walks.
let model = SwitchingModel::new(
    vec![
        LinearModel::random_walk(1, 0.01, 0.5),
        LinearModel::random_walk(1, 1.0, 0.5),
    ],
    DMatrix::from_row_slice(2, 2, &[0.95, 0.05, 0.05, 0.95]),
)?;

let prior = Gmm::uniform(vec![
    Gaussian::isotropic(1, 10.0),
    Gaussian::isotropic(1, 10.0),
]);

let measurements: Vec<DVector<f64>> = (0..30)
    .map(|t| DVector::from_vec(vec![(t as f64 * 0.2).sin()]))
    .collect();

// Forward pass, then the backward smoothing pass.
let filtered = filter::gpb2::filter_sequence(&measurements, &model, &prior)?;
let smoothed = smoother::gpb2::smooth_sequence(filtered, &model)?;

assert_eq!(smoothed.smoothed_collapsed.len(), 30);
# Ok::<(), gpb2_smoothers::SmootherError>(())
```
*/

// ============================================================================
// Core modules
// ============================================================================

/// Backward smoothing recursions (RTS, GPB2)
pub mod smoother;

/// Forward filtering passes (Kalman, GPB2)
pub mod filter;

/// Gaussian-mixture collapsing primitives
pub mod collapse;

/// Per-regime and switching model types
pub mod model;

/// Owned per-time estimate buffers
pub mod sequence;

/// Synthetic trajectory simulation
pub mod sim;

/// Core belief and container types
pub mod types;

/// Low-level utilities (linear algebra)
pub mod common;

/// Error types
pub mod errors;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// Core types
pub use model::{LinearModel, SwitchingModel};
pub use sequence::{GmmSequence, Sequence};
pub use types::{Gaussian, Gmm, Grid};

// Errors
pub use errors::SmootherError;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
