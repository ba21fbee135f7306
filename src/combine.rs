//! Normalization of raw scores against the first sample of a sweep, and
//! reduction of the selected metrics to one combined sharpness value.

use crate::errors::{CalibrationError, Result};
use crate::types::{default_metrics, Metric, ScoreVector};

/// Divide every component of `score` by the matching `reference` component.
pub fn normalize(score: &ScoreVector, reference: &ScoreVector) -> Result<ScoreVector> {
    check_reference(reference)?;
    Ok(ScoreVector::new(
        score.variance / reference.variance,
        score.gradient / reference.gradient,
        score.fft_band / reference.fft_band,
    ))
}

/// Mean of the selected metrics after normalization against `reference`.
pub fn combine(score: &ScoreVector, reference: &ScoreVector, selected: &[Metric]) -> Result<f64> {
    let normalized = normalize(score, reference)?;
    mean_of(&normalized, selected)
}

fn mean_of(normalized: &ScoreVector, selected: &[Metric]) -> Result<f64> {
    if selected.is_empty() {
        return Err(CalibrationError::InvalidConfig(
            "at least one metric must be selected".to_string(),
        ));
    }
    let sum: f64 = selected.iter().map(|&m| normalized.get(m)).sum();
    Ok(sum / selected.len() as f64)
}

fn check_reference(reference: &ScoreVector) -> Result<()> {
    for metric in Metric::ALL {
        if reference.get(metric) == 0.0 {
            return Err(CalibrationError::DivideByZeroReference { metric });
        }
    }
    Ok(())
}

/// Remove duplicates while keeping the caller's order.
pub fn dedup_metrics(metrics: &[Metric]) -> Vec<Metric> {
    let mut out = Vec::with_capacity(metrics.len());
    for &m in metrics {
        if !out.contains(&m) {
            out.push(m);
        }
    }
    out
}

/// Stateful combiner for one sweep.
///
/// The first pushed score becomes the reference baseline and stays fixed
/// until [`SampleCombiner::reset`].
#[derive(Debug, Clone)]
pub struct SampleCombiner {
    selected: Vec<Metric>,
    reference: Option<ScoreVector>,
}

impl Default for SampleCombiner {
    fn default() -> Self {
        Self {
            selected: default_metrics(),
            reference: None,
        }
    }
}

impl SampleCombiner {
    pub fn new(selected: &[Metric]) -> Result<Self> {
        let selected = dedup_metrics(selected);
        if selected.is_empty() {
            return Err(CalibrationError::InvalidConfig(
                "at least one metric must be selected".to_string(),
            ));
        }
        Ok(Self {
            selected,
            reference: None,
        })
    }

    pub fn selected(&self) -> &[Metric] {
        &self.selected
    }

    pub fn reference(&self) -> Option<&ScoreVector> {
        self.reference.as_ref()
    }

    /// Normalize `score` and return `(combined, normalized)`.
    pub fn push(&mut self, score: ScoreVector) -> Result<(f64, ScoreVector)> {
        let reference = match self.reference {
            Some(reference) => reference,
            None => {
                check_reference(&score)?;
                log::debug!(
                    "Reference score set: {:.4} / {:.4} / {:.4}",
                    score.variance,
                    score.gradient,
                    score.fft_band
                );
                self.reference = Some(score);
                score
            }
        };

        let normalized = normalize(&score, &reference)?;
        let combined = mean_of(&normalized, &self.selected)?;
        Ok((combined, normalized))
    }

    /// Forget the reference so the next push starts a new sweep.
    pub fn reset(&mut self) {
        self.reference = None;
    }
}
