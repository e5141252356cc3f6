//! Core belief and container types

pub mod gaussian;
pub mod grid;

pub use gaussian::{Gaussian, Gmm};
pub use grid::Grid;
