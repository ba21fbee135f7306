/// Sweep controller
///
/// Walks a fixed sequence of micro-adjustment values, captures one frame per
/// value, scores it inside the crop window chosen from the first frame, and
/// combines the score against the first sample of the sweep.
pub mod capture;

pub use capture::{load_gray, Cancellable, CaptureSource, DirectoryReplay, ManualPrompt};

use crate::combine::SampleCombiner;
use crate::config::CalibrationConfig;
use crate::errors::{CalibrationError, Result};
use crate::fit::{fit_gaussian, FitConfig};
use crate::quality::SharpnessEstimator;
use crate::region::{select_window, DEFAULT_HALF_HEIGHT, DEFAULT_HALF_WIDTH};
use crate::report::{CalibrationReport, FitOutcome};
use crate::types::{CropWindow, Metric, Sample, SweepSeries};

/// Adjustment sequence used when none is configured.
pub const DEFAULT_ADJUSTMENTS: [i32; 17] = [
    -20, -15, -12, -10, -8, -6, -4, -2, 0, 2, 4, 6, 8, 10, 12, 15, 20,
];

/// Check that a sweep is strictly monotonic and has more than two values.
pub fn validate_adjustments(adjustments: &[i32]) -> Result<()> {
    if adjustments.len() < 3 {
        return Err(CalibrationError::InvalidConfig(format!(
            "a sweep needs at least 3 adjustment values, got {}",
            adjustments.len()
        )));
    }

    let increasing = adjustments.windows(2).all(|w| w[0] < w[1]);
    let decreasing = adjustments.windows(2).all(|w| w[0] > w[1]);
    if !increasing && !decreasing {
        return Err(CalibrationError::InvalidConfig(
            "adjustment values must be strictly increasing or strictly decreasing".to_string(),
        ));
    }
    Ok(())
}

/// Runs sweeps with a fixed estimator, metric selection and crop request.
#[derive(Debug, Clone)]
pub struct SweepController {
    estimator: SharpnessEstimator,
    selected: Vec<Metric>,
    requested: CropWindow,
    fit_config: FitConfig,
}

impl Default for SweepController {
    fn default() -> Self {
        Self {
            estimator: SharpnessEstimator::default(),
            selected: crate::types::default_metrics(),
            requested: CropWindow::new(DEFAULT_HALF_WIDTH, DEFAULT_HALF_HEIGHT),
            fit_config: FitConfig::default(),
        }
    }
}

impl SweepController {
    pub fn new(
        estimator: SharpnessEstimator,
        selected: &[Metric],
        requested: CropWindow,
        fit_config: FitConfig,
    ) -> Result<Self> {
        // Validates the selection.
        let combiner = SampleCombiner::new(selected)?;
        if requested.half_width == 0 || requested.half_height == 0 {
            return Err(CalibrationError::InvalidWindow(format!(
                "requested window {}x{} must be positive",
                requested.half_width, requested.half_height
            )));
        }
        Ok(Self {
            estimator,
            selected: combiner.selected().to_vec(),
            requested,
            fit_config,
        })
    }

    pub fn from_config(config: &CalibrationConfig) -> Result<Self> {
        config.validate().map_err(CalibrationError::InvalidConfig)?;
        Self::new(
            SharpnessEstimator::new(config.scoring.fft_band_fraction)?,
            &config.scoring.selected_metrics,
            CropWindow::new(config.crop.half_width, config.crop.half_height),
            config.fit.clone(),
        )
    }

    pub fn selected_metrics(&self) -> &[Metric] {
        &self.selected
    }

    pub fn requested_window(&self) -> CropWindow {
        self.requested
    }

    pub fn fit_config(&self) -> &FitConfig {
        &self.fit_config
    }

    pub fn run_sweep<C: CaptureSource>(
        &self,
        adjustments: &[i32],
        capture: &mut C,
    ) -> Result<SweepSeries> {
        self.run_sweep_with(adjustments, capture, |_| {})
    }

    /// Like [`SweepController::run_sweep`], calling `observer` after each sample.
    pub fn run_sweep_with<C, F>(
        &self,
        adjustments: &[i32],
        capture: &mut C,
        observer: F,
    ) -> Result<SweepSeries>
    where
        C: CaptureSource,
        F: FnMut(&Sample),
    {
        self.sweep(adjustments, capture, observer)
            .map(|(series, _)| series)
    }

    /// Run the sweep and fit it.
    ///
    /// Sweep errors are returned; a failed fit is recorded in the report.
    pub fn calibrate<C, F>(
        &self,
        adjustments: &[i32],
        capture: &mut C,
        observer: F,
    ) -> Result<CalibrationReport>
    where
        C: CaptureSource,
        F: FnMut(&Sample),
    {
        let (series, window) = self.sweep(adjustments, capture, observer)?;

        let fit = FitOutcome::from(fit_gaussian(&series, &self.fit_config));
        match &fit {
            FitOutcome::Fitted(result) => log::info!(
                "Best micro-adjustment {} (center {:.3}, width {:.3})",
                result.best_adjustment,
                result.center,
                result.width
            ),
            FitOutcome::NotPossible { reason } => log::warn!("Fit not possible: {}", reason),
            FitOutcome::DidNotConverge { iterations } => {
                log::warn!("Fit did not converge after {} iterations", iterations)
            }
        }

        Ok(CalibrationReport::new(
            window,
            self.selected.clone(),
            series,
            fit,
        ))
    }

    fn sweep<C, F>(
        &self,
        adjustments: &[i32],
        capture: &mut C,
        mut observer: F,
    ) -> Result<(SweepSeries, CropWindow)>
    where
        C: CaptureSource,
        F: FnMut(&Sample),
    {
        validate_adjustments(adjustments)?;

        log::info!(
            "Starting sweep over {} adjustments ({} to {})",
            adjustments.len(),
            adjustments[0],
            adjustments[adjustments.len() - 1]
        );

        let mut combiner = SampleCombiner::new(&self.selected)?;
        let mut series = SweepSeries::new();
        let mut geometry: Option<((u32, u32), CropWindow)> = None;

        for &adjustment in adjustments {
            let frame = capture.capture(adjustment).map_err(|source| {
                log::error!("Capture failed at adjustment {}: {}", adjustment, source);
                CalibrationError::CaptureFailure { adjustment, source }
            })?;

            let dims = frame.dimensions();
            let window = match geometry {
                Some((expected, window)) => {
                    if dims != expected {
                        return Err(CalibrationError::DimensionMismatch {
                            expected,
                            got: dims,
                        });
                    }
                    window
                }
                None => {
                    let window = select_window(
                        dims.0,
                        dims.1,
                        self.requested.half_width,
                        self.requested.half_height,
                    )?;
                    log::debug!(
                        "Crop window {}x{} selected from {}x{} reference image",
                        window.width(),
                        window.height(),
                        dims.0,
                        dims.1
                    );
                    geometry = Some((dims, window));
                    window
                }
            };

            let score = self.estimator.estimate(&frame, &window)?;
            let (combined, normalized) = combiner.push(score)?;
            let sample = Sample {
                adjustment,
                combined,
                normalized,
            };

            log::debug!(
                "Sharpness estimators {:.4} / {:.4} / {:.4} for adjustment {:3}",
                normalized.variance,
                normalized.gradient,
                normalized.fft_band,
                adjustment
            );

            observer(&sample);
            series.push(sample);
        }

        let window = match geometry {
            Some((_, window)) => window,
            None => {
                return Err(CalibrationError::InvalidConfig(
                    "sweep produced no samples".to_string(),
                ))
            }
        };

        log::info!("Sweep complete: {} samples", series.len());
        Ok((series, window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CaptureError, CaptureErrorKind};
    use crate::testing::synthetic_pattern_frame;
    use crate::types::GrayFrame;

    fn pattern_source(adjustment: i32) -> std::result::Result<GrayFrame, CaptureError> {
        let contrast = 20.0 + 2.0 * adjustment as f64;
        Ok(synthetic_pattern_frame(48, 32, contrast, 100.0))
    }

    #[test]
    fn test_adjustment_validation() {
        assert!(validate_adjustments(&DEFAULT_ADJUSTMENTS).is_ok());
        assert!(validate_adjustments(&[4, 2, 0]).is_ok());
        assert!(validate_adjustments(&[0, 2]).is_err());
        assert!(validate_adjustments(&[0, 2, 2, 4]).is_err());
        assert!(validate_adjustments(&[0, 4, 2]).is_err());
        assert!(validate_adjustments(&[]).is_err());
    }

    #[test]
    fn test_first_sample_is_reference() {
        let controller = SweepController::default();
        let series = controller
            .run_sweep(&[-4, -2, 0, 2, 4], &mut pattern_source)
            .unwrap();

        assert_eq!(series.len(), 5);
        let first = &series.samples()[0];
        assert_eq!(first.adjustment, -4);
        assert_eq!(first.combined, 1.0);
        assert!(series.samples()[4].combined > first.combined);
    }

    #[test]
    fn test_observer_sees_every_sample() {
        let controller = SweepController::default();
        let mut seen = Vec::new();
        controller
            .run_sweep_with(&[0, 2, 4], &mut pattern_source, |s| seen.push(s.adjustment))
            .unwrap();
        assert_eq!(seen, vec![0, 2, 4]);
    }

    #[test]
    fn test_capture_failure_halts() {
        let controller = SweepController::default();
        let mut calls = Vec::new();
        let mut source = |adjustment: i32| {
            calls.push(adjustment);
            if adjustment == 0 {
                Err(CaptureError::backend("shutter stuck"))
            } else {
                pattern_source(adjustment)
            }
        };

        let err = controller
            .run_sweep(&[-4, -2, 0, 2, 4], &mut source)
            .unwrap_err();
        match err {
            CalibrationError::CaptureFailure { adjustment, source } => {
                assert_eq!(adjustment, 0);
                assert_eq!(source.kind, CaptureErrorKind::Backend);
                assert_eq!(source.message, "shutter stuck");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(calls, vec![-4, -2, 0]);
    }

    #[test]
    fn test_dimension_change_rejected() {
        let controller = SweepController::default();
        let mut source = |adjustment: i32| {
            let width = if adjustment > 0 { 40 } else { 48 };
            Ok::<_, CaptureError>(synthetic_pattern_frame(width, 32, 20.0, 100.0))
        };
        let err = controller.run_sweep(&[-2, 0, 2], &mut source).unwrap_err();
        assert!(matches!(
            err,
            CalibrationError::DimensionMismatch {
                expected: (48, 32),
                got: (40, 32)
            }
        ));
    }

    #[test]
    fn test_window_clipped_to_first_image() {
        let controller = SweepController::default();
        let report = controller
            .calibrate(&[-4, -2, 0, 2, 4], &mut pattern_source, |_| {})
            .unwrap();
        assert_eq!(report.window, CropWindow::new(24, 16));
        assert_eq!(report.samples.len(), 5);
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = CalibrationConfig::default();
        config.scoring.selected_metrics.clear();
        assert!(SweepController::from_config(&config).is_err());
        assert!(SweepController::from_config(&CalibrationConfig::default()).is_ok());
    }
}
