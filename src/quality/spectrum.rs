/// Frequency-domain detail metric
///
/// Sums the square roots of the normalized real spectrum inside a central
/// band of the shifted 2-D DFT. The sum scales with the band area, so it is
/// only comparable between frames cropped with the same window.
use crate::errors::{CalibrationError, Result};
use crate::types::GrayFrame;
use rustfft::{num_complex::Complex, FftPlanner};

pub fn fft_band_metric(frame: &GrayFrame, fraction: f64) -> Result<f64> {
    frame.check_size()?;
    let rows = frame.height as usize;
    let cols = frame.width as usize;
    if rows == 0 || cols == 0 {
        return Err(CalibrationError::DegenerateSpectrum);
    }

    // Column-major after the transpose: spectrum[c * rows + r] == F[r][c].
    let spectrum = fft_2d(frame);
    let magnitude: Vec<f64> = spectrum.iter().map(|c| c.re.abs()).collect();

    let max = magnitude.iter().copied().fold(0.0f64, f64::max);
    if max <= 0.0 || !max.is_finite() {
        return Err(CalibrationError::DegenerateSpectrum);
    }

    let (r0, r1) = band(rows, fraction);
    let (c0, c1) = band(cols, fraction);

    let mut sum = 0.0;
    for shifted_r in r0..r1 {
        let r = unshift(shifted_r, rows);
        for shifted_c in c0..c1 {
            let c = unshift(shifted_c, cols);
            sum += (magnitude[c * rows + r] / max).sqrt();
        }
    }

    Ok(sum)
}

/// Half-open band `[trunc(c - f*c), trunc(c + f*c))` around `c = n / 2`.
pub fn band(n: usize, fraction: f64) -> (usize, usize) {
    let center = (n / 2) as f64;
    let lo = (center - fraction * center) as usize;
    let hi = (center + fraction * center) as usize;
    (lo, hi.min(n))
}

/// Index into the unshifted spectrum for an index of the centered one.
///
/// The zero frequency lands at `n / 2` after shifting.
#[inline]
fn unshift(i: usize, n: usize) -> usize {
    (i + n - n / 2) % n
}

/// 2-D DFT by row-column decomposition.
///
/// Returns the spectrum transposed (column-major) to avoid a second
/// transpose; callers index it as `[c * rows + r]`.
fn fft_2d(frame: &GrayFrame) -> Vec<Complex<f64>> {
    let rows = frame.height as usize;
    let cols = frame.width as usize;

    let mut planner = FftPlanner::<f64>::new();
    let row_fft = planner.plan_fft_forward(cols);
    let col_fft = planner.plan_fft_forward(rows);

    let mut data: Vec<Complex<f64>> = frame.data.iter().map(|&v| Complex::new(v, 0.0)).collect();
    for row in data.chunks_exact_mut(cols) {
        row_fft.process(row);
    }

    let mut transposed = vec![Complex::new(0.0, 0.0); rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            transposed[c * rows + r] = data[r * cols + c];
        }
    }

    for column in transposed.chunks_exact_mut(rows) {
        col_fft.process(column);
    }

    transposed
}
