//! Low-level utilities shared across the filtering and smoothing passes

pub mod linalg;
