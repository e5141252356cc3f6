//! Forward filtering passes
//!
//! - [`kalman`] - single-regime Kalman filter
//! - [`gpb2`] - multi-regime GPB2 filter

pub mod gpb2;
pub mod kalman;
