use super::{fft_band_metric, gradient_metric, variance_metric};
use crate::errors::{CalibrationError, Result};
use crate::types::{CropWindow, GrayFrame, ScoreVector};

/// Fraction of each half-spectrum summed by the FFT band metric.
pub const DEFAULT_FFT_BAND_FRACTION: f64 = 0.3;

/// Computes the raw three-metric score of a frame.
#[derive(Debug, Clone)]
pub struct SharpnessEstimator {
    fft_band_fraction: f64,
}

impl Default for SharpnessEstimator {
    fn default() -> Self {
        Self {
            fft_band_fraction: DEFAULT_FFT_BAND_FRACTION,
        }
    }
}

impl SharpnessEstimator {
    pub fn new(fft_band_fraction: f64) -> Result<Self> {
        if !(fft_band_fraction > 0.0 && fft_band_fraction < 1.0) {
            return Err(CalibrationError::InvalidConfig(format!(
                "fft band fraction must be in (0, 1), got {fft_band_fraction}"
            )));
        }
        Ok(Self { fft_band_fraction })
    }

    pub fn fft_band_fraction(&self) -> f64 {
        self.fft_band_fraction
    }

    /// Crop `frame` to `window` and score it.
    ///
    /// Scores are returned as computed; normalization against a reference
    /// happens in the combiner.
    pub fn estimate(&self, frame: &GrayFrame, window: &CropWindow) -> Result<ScoreVector> {
        let cropped = frame.crop(window)?;
        self.estimate_cropped(&cropped)
    }

    /// Score a frame that has already been cropped.
    pub fn estimate_cropped(&self, cropped: &GrayFrame) -> Result<ScoreVector> {
        cropped.check_size()?;
        let variance = variance_metric(cropped);
        let gradient = gradient_metric(cropped)?;
        let fft_band = fft_band_metric(cropped, self.fft_band_fraction)?;

        log::debug!(
            "Scored {}x{} region: variance={:.4} gradient={:.4} fft_band={:.4}",
            cropped.width,
            cropped.height,
            variance,
            gradient,
            fft_band
        );

        Ok(ScoreVector::new(variance, gradient, fft_band))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{synthetic_pattern_frame, synthetic_ramp_frame};

    #[test]
    fn test_ramp_variance_by_hand() {
        // 5x5 ramp x + y, window (2, 2) keeps rows and columns 0..4.
        // x and y are independent and uniform over 0..=3: var = 2 * 15 / 12.
        let frame = synthetic_ramp_frame(5, 5);
        let score = SharpnessEstimator::default()
            .estimate(&frame, &CropWindow::new(2, 2))
            .unwrap();
        assert!((score.variance - 2.5).abs() < 1e-12);
        assert!(score.gradient > 0.0 && score.gradient <= 1.0);
        assert!(score.fft_band > 0.0);
    }

    #[test]
    fn test_flat_region_raises_degenerate_gradient() {
        let frame = GrayFrame::from_fn(5, 5, |_, _| 128.0);
        let result = SharpnessEstimator::default().estimate(&frame, &CropWindow::new(2, 2));
        assert!(matches!(result, Err(CalibrationError::DegenerateGradient)));
    }

    #[test]
    fn test_higher_contrast_scores_higher() {
        let estimator = SharpnessEstimator::default();
        let window = CropWindow::new(16, 12);
        let low = estimator
            .estimate(&synthetic_pattern_frame(48, 32, 10.0, 100.0), &window)
            .unwrap();
        let high = estimator
            .estimate(&synthetic_pattern_frame(48, 32, 40.0, 100.0), &window)
            .unwrap();

        assert!(high.variance > low.variance);
        assert!(high.fft_band > low.fft_band);
    }

    #[test]
    fn test_short_buffer_is_data_corruption() {
        let frame = GrayFrame {
            width: 8,
            height: 8,
            data: vec![1.0; 10],
        };
        assert!(matches!(
            SharpnessEstimator::default().estimate_cropped(&frame),
            Err(CalibrationError::DataCorruption {
                frame_size: 10,
                expected_size: 64
            })
        ));
    }

    #[test]
    fn test_invalid_fraction() {
        assert!(SharpnessEstimator::new(0.0).is_err());
        assert!(SharpnessEstimator::new(1.0).is_err());
        assert!(SharpnessEstimator::new(0.5).is_ok());
    }
}
