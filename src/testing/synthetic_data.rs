//! Synthetic frames with controllable detail
//!
//! The pattern frame mixes two periodic components over a constant offset.
//! Scaling the components by a contrast factor scales the variance by the
//! square of that factor while the DC term of the spectrum stays dominant,
//! which makes "more contrast" a clean stand-in for "sharper focus".

use crate::errors::CaptureError;
use crate::sweep::CaptureSource;
use crate::types::GrayFrame;
use std::f64::consts::PI;

/// `value(x, y) = x + y`
pub fn synthetic_ramp_frame(width: u32, height: u32) -> GrayFrame {
    GrayFrame::from_fn(width, height, |x, y| (x + y) as f64)
}

pub fn synthetic_flat_frame(width: u32, height: u32, value: f64) -> GrayFrame {
    GrayFrame::from_fn(width, height, |_, _| value)
}

/// `offset + contrast * p(x, y)` with a fixed two-component pattern `p`.
pub fn synthetic_pattern_frame(width: u32, height: u32, contrast: f64, offset: f64) -> GrayFrame {
    GrayFrame::from_fn(width, height, |x, y| {
        let (x, y) = (x as f64, y as f64);
        let p = (2.0 * PI * x / 12.0).sin() * (2.0 * PI * y / 10.0).cos()
            + 0.5 * (2.0 * PI * (x + y) / 5.0).sin();
        offset + contrast * p
    })
}

/// Contrast whose square follows `exp(-(x - peak)^2 / spread)`.
///
/// Pattern frames rendered with it have a variance that is an exact Gaussian
/// of the adjustment.
pub fn gaussian_contrast(peak: f64, spread: f64, scale: f64) -> impl Fn(i32) -> f64 {
    move |adjustment| {
        let d = adjustment as f64 - peak;
        scale * (-(d * d) / spread).exp().sqrt()
    }
}

/// Capture source rendering a pattern frame whose contrast depends on the
/// requested adjustment.
pub struct SyntheticSweep<F> {
    pub width: u32,
    pub height: u32,
    pub offset: f64,
    contrast: F,
    captured: Vec<i32>,
}

impl<F: Fn(i32) -> f64> SyntheticSweep<F> {
    pub fn new(width: u32, height: u32, offset: f64, contrast: F) -> Self {
        Self {
            width,
            height,
            offset,
            contrast,
            captured: Vec::new(),
        }
    }

    /// Adjustments requested so far, in order.
    pub fn captured(&self) -> &[i32] {
        &self.captured
    }
}

impl<F: Fn(i32) -> f64> CaptureSource for SyntheticSweep<F> {
    fn capture(&mut self, adjustment: i32) -> Result<GrayFrame, CaptureError> {
        self.captured.push(adjustment);
        let contrast = (self.contrast)(adjustment);
        Ok(synthetic_pattern_frame(
            self.width,
            self.height,
            contrast,
            self.offset,
        ))
    }
}
