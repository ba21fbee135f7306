//! Testing utilities for focuscal
//!
//! Provides synthetic frames and a synthetic capture source so sweeps can be
//! exercised without a camera or recorded images.

pub mod synthetic_data;

pub use synthetic_data::{
    gaussian_contrast,
    synthetic_flat_frame,
    synthetic_pattern_frame,
    synthetic_ramp_frame,
    SyntheticSweep,
};
