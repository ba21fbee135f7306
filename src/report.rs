//! Calibration report: the sweep samples, the fit outcome and a sampled
//! curve for plotting, serialisable to JSON.

use crate::errors::{CalibrationError, Result};
use crate::fit::{fit_gaussian, FitConfig, FitError, FitResult};
use crate::types::{CropWindow, Metric, SweepSeries};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Spacing of the plotted fit curve, in adjustment units.
pub const CURVE_STEP: f64 = 0.5;

/// Result of fitting a sweep, kept even when the fit failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FitOutcome {
    Fitted(FitResult),
    NotPossible { reason: String },
    DidNotConverge { iterations: usize },
}

impl FitOutcome {
    pub fn result(&self) -> Option<&FitResult> {
        match self {
            FitOutcome::Fitted(result) => Some(result),
            _ => None,
        }
    }
}

impl From<std::result::Result<FitResult, FitError>> for FitOutcome {
    fn from(result: std::result::Result<FitResult, FitError>) -> Self {
        match result {
            Ok(fit) => FitOutcome::Fitted(fit),
            Err(FitError::NotPossible(reason)) => FitOutcome::NotPossible { reason },
            Err(FitError::DidNotConverge { iterations }) => {
                FitOutcome::DidNotConverge { iterations }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub adjustment: f64,
    pub sharpness: f64,
}

/// Everything produced by one calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub created_at: DateTime<Utc>,
    pub window: CropWindow,
    pub selected_metrics: Vec<Metric>,
    pub samples: SweepSeries,
    pub fit: FitOutcome,
    pub curve: Vec<CurvePoint>,
}

impl CalibrationReport {
    pub fn new(
        window: CropWindow,
        selected_metrics: Vec<Metric>,
        samples: SweepSeries,
        fit: FitOutcome,
    ) -> Self {
        let curve = sample_curve(&samples, &fit);
        Self {
            created_at: Utc::now(),
            window,
            selected_metrics,
            samples,
            fit,
            curve,
        }
    }

    pub fn best_adjustment(&self) -> Option<i32> {
        self.fit.result().map(|fit| fit.best_adjustment)
    }

    /// Fit the stored samples again with different tuning.
    pub fn refit(&self, config: &FitConfig) -> Self {
        let fit = FitOutcome::from(fit_gaussian(&self.samples, config));
        let curve = sample_curve(&self.samples, &fit);
        Self {
            created_at: self.created_at,
            window: self.window,
            selected_metrics: self.selected_metrics.clone(),
            samples: self.samples.clone(),
            fit,
            curve,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CalibrationError::Report(format!("Failed to serialize report: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CalibrationError::Report(format!("Failed to parse report: {}", e)))
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CalibrationError::Report(format!("Failed to create report directory: {}", e))
            })?;
        }

        fs::write(path, self.to_json()?)
            .map_err(|e| CalibrationError::Report(format!("Failed to write report: {}", e)))?;

        log::info!("Saved calibration report to {:?}", path);
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| CalibrationError::Report(format!("Failed to read report: {}", e)))?;
        Self::from_json(&contents)
    }

    /// Per-sample table followed by the fit summary.
    pub fn format_table(&self) -> String {
        let mut out = String::new();
        for sample in self.samples.samples() {
            let _ = writeln!(out, "{}", format_sample_line(sample));
        }
        let _ = writeln!(out, "{}", self.fit_summary());
        out
    }

    pub fn fit_summary(&self) -> String {
        match &self.fit {
            FitOutcome::Fitted(fit) => format!(
                "Best focus at adjustment {} (center {:.3}, amplitude {:.4}, width {:.3})",
                fit.best_adjustment, fit.center, fit.amplitude, fit.width
            ),
            FitOutcome::NotPossible { reason } => format!("Fit not possible: {}", reason),
            FitOutcome::DidNotConverge { iterations } => {
                format!("Fit did not converge after {} iterations", iterations)
            }
        }
    }
}

/// `Sharpness estimators 1.0000 / 0.9876 / 1.0123 for adjustment  -4`
pub fn format_sample_line(sample: &crate::types::Sample) -> String {
    format!(
        "Sharpness estimators {:.4} / {:.4} / {:.4} for adjustment {:3}",
        sample.normalized.variance,
        sample.normalized.gradient,
        sample.normalized.fft_band,
        sample.adjustment
    )
}

fn sample_curve(samples: &SweepSeries, fit: &FitOutcome) -> Vec<CurvePoint> {
    let Some(result) = fit.result() else {
        return Vec::new();
    };

    let (min, max) = samples
        .points()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (x, _)| {
            (lo.min(x), hi.max(x))
        });
    if !(min <= max) {
        return Vec::new();
    }

    result
        .curve(min, max, CURVE_STEP)
        .into_iter()
        .map(|(adjustment, sharpness)| CurvePoint {
            adjustment,
            sharpness,
        })
        .collect()
}
