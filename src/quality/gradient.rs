/// Edge-strength metric
///
/// Central differences in the interior and one-sided differences at the
/// borders, sampled at a spacing of two pixels. The magnitude map is divided
/// by its maximum before averaging, which makes the result independent of
/// overall brightness.
use crate::errors::{CalibrationError, Result};
use crate::types::GrayFrame;

/// Sample spacing used by the finite differences.
pub const GRADIENT_SPACING: f64 = 2.0;

/// Mean of the max-normalized gradient magnitude, in `[0, 1]`.
pub fn gradient_metric(frame: &GrayFrame) -> Result<f64> {
    frame.check_size()?;
    let magnitude = gradient_magnitude(frame);

    let max = magnitude.iter().copied().fold(0.0f64, f64::max);
    if max <= 0.0 || !max.is_finite() {
        return Err(CalibrationError::DegenerateGradient);
    }

    let sum: f64 = magnitude.iter().map(|m| m / max).sum();
    Ok(sum / magnitude.len() as f64)
}

/// Per-pixel `sqrt(gx² + gy²)`.
fn gradient_magnitude(frame: &GrayFrame) -> Vec<f64> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let mut magnitude = vec![0.0; width * height];

    for y in 0..height {
        for x in 0..width {
            let gx = derivative(width, x, |i| frame.data[y * width + i]);
            let gy = derivative(height, y, |j| frame.data[j * width + x]);
            magnitude[y * width + x] = (gx * gx + gy * gy).sqrt();
        }
    }

    magnitude
}

/// Derivative at index `i` of a line of length `n` read through `at`.
#[inline]
fn derivative(n: usize, i: usize, at: impl Fn(usize) -> f64) -> f64 {
    if n < 2 {
        return 0.0;
    }
    if i == 0 {
        (at(1) - at(0)) / GRADIENT_SPACING
    } else if i == n - 1 {
        (at(n - 1) - at(n - 2)) / GRADIENT_SPACING
    } else {
        (at(i + 1) - at(i - 1)) / (2.0 * GRADIENT_SPACING)
    }
}
