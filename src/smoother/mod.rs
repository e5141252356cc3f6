//! Backward (fixed-interval) smoothing recursions
//!
//! - [`rts`] - single-regime Rauch-Tung-Striebel smoother
//! - [`gpb2`] - multi-regime GPB2 mixture smoother

pub mod gpb2;
pub mod rts;
