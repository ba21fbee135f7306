/// Calibration curve fitting
///
/// Fits `y(x) = amplitude * exp(-(x - center)^2 / width)` to the combined
/// sharpness of a sweep with Levenberg-Marquardt, and reports the
/// micro-adjustment closest to the peak.
///
/// `width` enters the exponent unsquared and without the usual factor of
/// two; it is a free scale parameter, not a variance.
pub mod solver;

use crate::types::SweepSeries;
use serde::{Deserialize, Serialize};

/// Tuning for the Levenberg-Marquardt loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Maximum number of iterations (accepted or rejected steps)
    pub max_iterations: usize,
    /// Initial damping factor
    pub initial_lambda: f64,
    /// Damping multiplier after a rejected step
    pub lambda_up: f64,
    /// Damping multiplier after an accepted step
    pub lambda_down: f64,
    /// Relative decrease of the residual sum treated as converged
    pub ftol: f64,
    /// Relative parameter change treated as converged
    pub xtol: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 400,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            ftol: 1e-12,
            xtol: 1e-10,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_iterations == 0 {
            return Err("max_iterations must be positive".to_string());
        }
        if !(self.initial_lambda > 0.0) {
            return Err("initial_lambda must be positive".to_string());
        }
        if !(self.lambda_up > 1.0) {
            return Err("lambda_up must be greater than 1".to_string());
        }
        if !(self.lambda_down > 0.0 && self.lambda_down < 1.0) {
            return Err("lambda_down must be in (0, 1)".to_string());
        }
        if !(self.ftol > 0.0) || !(self.xtol > 0.0) {
            return Err("ftol and xtol must be positive".to_string());
        }
        Ok(())
    }
}

/// Fitted Gaussian parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub amplitude: f64,
    pub center: f64,
    pub width: f64,
    /// `center` rounded to the nearest micro-adjustment step
    pub best_adjustment: i32,
    /// Sum of squared residuals at the solution
    pub residual_sum: f64,
    pub iterations: usize,
}

impl FitResult {
    pub fn evaluate(&self, x: f64) -> f64 {
        gaussian(x, &[self.amplitude, self.center, self.width])
    }

    /// Sample the fitted curve on `[from, to]` every `step`.
    ///
    /// The step is widened when the span would need more than
    /// [`MAX_CURVE_POINTS`] samples.
    pub fn curve(&self, from: f64, to: f64, step: f64) -> Vec<(f64, f64)> {
        if !(step > 0.0) || !from.is_finite() || !to.is_finite() || to < from {
            return Vec::new();
        }
        let span = to - from;
        let step = step.max(span / (MAX_CURVE_POINTS - 1) as f64);
        let count = ((span / step).floor() as usize + 1).min(MAX_CURVE_POINTS);
        (0..count)
            .map(|i| {
                let x = from + i as f64 * step;
                (x, self.evaluate(x))
            })
            .collect()
    }
}

/// Why no fit result could be produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("Fit not possible: {0}")]
    NotPossible(String),

    #[error("Fit did not converge after {iterations} iterations")]
    DidNotConverge { iterations: usize },
}

/// Upper bound on the number of points returned by [`FitResult::curve`].
pub const MAX_CURVE_POINTS: usize = 4096;

const LAMBDA_CEILING: f64 = 1e16;
const DIAGONAL_FLOOR: f64 = 1e-12;

/// Fit the sweep's `(adjustment, combined)` points.
pub fn fit_gaussian(series: &SweepSeries, config: &FitConfig) -> Result<FitResult, FitError> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = series.points().unzip();
    fit_points(&xs, &ys, config)
}

/// Fit raw point arrays; order of the points does not matter.
pub fn fit_points(xs: &[f64], ys: &[f64], config: &FitConfig) -> Result<FitResult, FitError> {
    check_input(xs, ys)?;

    let max_y = ys.iter().copied().fold(f64::MIN, f64::max);
    let mut params = [max_y, 0.0, 1.0];
    let mut chi2 = residual_sum(xs, ys, &params);
    let mut lambda = config.initial_lambda;
    let zero_level = f64::EPSILON * f64::EPSILON * ys.iter().map(|y| y * y).sum::<f64>();

    log::debug!(
        "Fitting {} points, initial guess amplitude={:.4} center=0 width=1",
        xs.len(),
        max_y
    );

    for iteration in 1..=config.max_iterations {
        if chi2 <= zero_level {
            return finish(params, chi2, iteration - 1);
        }

        let (hessian, gradient) = normal_equations(xs, ys, &params);

        let mut damped = hessian;
        for (i, row) in damped.iter_mut().enumerate() {
            row[i] += lambda * hessian[i][i].max(DIAGONAL_FLOOR);
        }

        let Some(delta) = solver::solve(&damped, &gradient) else {
            lambda *= config.lambda_up;
            if lambda > LAMBDA_CEILING {
                return Err(FitError::DidNotConverge {
                    iterations: iteration,
                });
            }
            continue;
        };

        let small_step = delta
            .iter()
            .zip(params.iter())
            .all(|(d, p)| d.abs() <= config.xtol * (p.abs() + config.xtol));

        let candidate = [
            params[0] + delta[0],
            params[1] + delta[1],
            params[2] + delta[2],
        ];
        let candidate_chi2 = if candidate[2] > 0.0 && candidate.iter().all(|p| p.is_finite()) {
            residual_sum(xs, ys, &candidate)
        } else {
            f64::INFINITY
        };

        if candidate_chi2 < chi2 {
            let decrease = chi2 - candidate_chi2;
            params = candidate;
            lambda = (lambda * config.lambda_down).max(f64::MIN_POSITIVE);
            let previous = chi2;
            chi2 = candidate_chi2;

            if decrease <= config.ftol * previous || small_step {
                return finish(params, chi2, iteration);
            }
        } else {
            if small_step {
                return finish(params, chi2, iteration);
            }
            lambda *= config.lambda_up;
            if lambda > LAMBDA_CEILING {
                log::debug!("Damping exceeded ceiling after {} iterations", iteration);
                return Err(FitError::DidNotConverge {
                    iterations: iteration,
                });
            }
        }
    }

    Err(FitError::DidNotConverge {
        iterations: config.max_iterations,
    })
}

fn finish(params: [f64; 3], chi2: f64, iterations: usize) -> Result<FitResult, FitError> {
    let [amplitude, center, width] = params;
    if !(amplitude.is_finite() && center.is_finite() && width.is_finite() && width > 0.0) {
        return Err(FitError::DidNotConverge { iterations });
    }

    let best_adjustment = center.round() as i32;
    log::debug!(
        "Fit converged in {} iterations: amplitude={:.4} center={:.4} width={:.4}",
        iterations,
        amplitude,
        center,
        width
    );

    Ok(FitResult {
        amplitude,
        center,
        width,
        best_adjustment,
        residual_sum: chi2,
        iterations,
    })
}

fn check_input(xs: &[f64], ys: &[f64]) -> Result<(), FitError> {
    if xs.len() != ys.len() {
        return Err(FitError::NotPossible(format!(
            "{} x values but {} y values",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < 3 {
        return Err(FitError::NotPossible(format!(
            "need at least 3 points, got {}",
            xs.len()
        )));
    }
    if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
        return Err(FitError::NotPossible(
            "measured values contain NaN or infinity".to_string(),
        ));
    }

    let mut distinct: Vec<f64> = xs.to_vec();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();
    if distinct.len() < 3 {
        return Err(FitError::NotPossible(format!(
            "need at least 3 distinct adjustment values, got {}",
            distinct.len()
        )));
    }

    let first = ys[0];
    if ys.iter().all(|&y| y == first) {
        return Err(FitError::NotPossible(
            "all sharpness values are identical".to_string(),
        ));
    }
    if ys.iter().all(|&y| y <= 0.0) {
        return Err(FitError::NotPossible(
            "no positive sharpness value to fit".to_string(),
        ));
    }

    Ok(())
}

#[inline]
fn gaussian(x: f64, params: &[f64; 3]) -> f64 {
    let [amplitude, center, width] = *params;
    let d = x - center;
    amplitude * (-(d * d) / width).exp()
}

fn residual_sum(xs: &[f64], ys: &[f64], params: &[f64; 3]) -> f64 {
    xs.iter()
        .zip(ys.iter())
        .map(|(&x, &y)| {
            let r = y - gaussian(x, params);
            r * r
        })
        .sum()
}

/// `J^T J` and `J^T r` for residuals `r = y - model`.
fn normal_equations(xs: &[f64], ys: &[f64], params: &[f64; 3]) -> ([[f64; 3]; 3], [f64; 3]) {
    let [amplitude, center, width] = *params;
    let mut hessian = [[0.0; 3]; 3];
    let mut gradient = [0.0; 3];

    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let d = x - center;
        let e = (-(d * d) / width).exp();
        let jacobian = [
            e,
            amplitude * e * 2.0 * d / width,
            amplitude * e * d * d / (width * width),
        ];
        let residual = y - amplitude * e;

        for i in 0..3 {
            gradient[i] += jacobian[i] * residual;
            for j in 0..3 {
                hessian[i][j] += jacobian[i] * jacobian[j];
            }
        }
    }

    (hessian, gradient)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_SWEEP: [i32; 17] = [
        -20, -15, -12, -10, -8, -6, -4, -2, 0, 2, 4, 6, 8, 10, 12, 15, 20,
    ];

    fn synthetic(amplitude: f64, center: f64, width: f64, xs: &[i32]) -> SweepSeries {
        xs.iter()
            .map(|&x| {
                let d = x as f64 - center;
                (x, amplitude * (-(d * d) / width).exp())
            })
            .collect()
    }

    #[test]
    fn test_recovers_exact_gaussian() {
        let series = synthetic(1.0, 3.0, 25.0, &DEFAULT_SWEEP);
        let fit = fit_gaussian(&series, &FitConfig::default()).unwrap();
        assert!((fit.center - 3.0).abs() < 0.05, "center {}", fit.center);
        assert!((fit.amplitude - 1.0).abs() < 1e-3);
        assert!((fit.width - 25.0).abs() < 0.1);
        assert_eq!(fit.best_adjustment, 3);
    }

    #[test]
    fn test_negative_center() {
        let series = synthetic(2.5, -5.0, 40.0, &DEFAULT_SWEEP);
        let fit = fit_gaussian(&series, &FitConfig::default()).unwrap();
        assert_eq!(fit.best_adjustment, -5);
    }

    #[test]
    fn test_order_does_not_matter() {
        let series = synthetic(1.0, 3.0, 25.0, &DEFAULT_SWEEP);
        let (mut xs, mut ys): (Vec<f64>, Vec<f64>) = series.points().unzip();
        xs.reverse();
        ys.reverse();
        let reversed = fit_points(&xs, &ys, &FitConfig::default()).unwrap();
        let forward = fit_gaussian(&series, &FitConfig::default()).unwrap();
        assert!((reversed.center - forward.center).abs() < 1e-6);
    }

    #[test]
    fn test_too_few_distinct_values() {
        let series: SweepSeries = [(0, 1.0), (0, 1.2), (2, 1.1), (2, 0.9)].into_iter().collect();
        assert!(matches!(
            fit_gaussian(&series, &FitConfig::default()),
            Err(FitError::NotPossible(_))
        ));

        let series: SweepSeries = [(0, 1.0), (2, 1.2)].into_iter().collect();
        assert!(matches!(
            fit_gaussian(&series, &FitConfig::default()),
            Err(FitError::NotPossible(_))
        ));
    }

    #[test]
    fn test_flat_values_not_possible() {
        let series: SweepSeries = [(-2, 1.0), (0, 1.0), (2, 1.0)].into_iter().collect();
        assert!(matches!(
            fit_gaussian(&series, &FitConfig::default()),
            Err(FitError::NotPossible(_))
        ));
    }

    #[test]
    fn test_iteration_budget_exhausted() {
        let series = synthetic(1.0, 3.0, 25.0, &DEFAULT_SWEEP);
        let config = FitConfig {
            max_iterations: 1,
            ..Default::default()
        };
        assert!(matches!(
            fit_gaussian(&series, &config),
            Err(FitError::DidNotConverge { iterations: 1 })
        ));
    }

    #[test]
    fn test_damping_ceiling_stops_fit() {
        // Noisy points leave a nonzero residual floor that no step can improve on.
        let xs: Vec<f64> = DEFAULT_SWEEP.iter().map(|&x| x as f64).collect();
        let ys: Vec<f64> = xs
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let noise = if i % 2 == 0 { 0.01 } else { -0.01 };
                (-(x - 3.0).powi(2) / 25.0).exp() + noise
            })
            .collect();
        let config = FitConfig {
            max_iterations: 10_000,
            lambda_up: 1e8,
            ftol: f64::MIN_POSITIVE,
            xtol: f64::MIN_POSITIVE,
            ..Default::default()
        };

        match fit_points(&xs, &ys, &config) {
            Err(FitError::DidNotConverge { iterations }) => {
                assert!(iterations < config.max_iterations, "iterations {}", iterations);
            }
            other => panic!("expected damping to run away, got {:?}", other),
        }
        assert!(fit_points(&xs, &ys, &FitConfig::default()).is_ok());
    }

    #[test]
    fn test_curve_point_count_is_bounded() {
        let fit = FitResult {
            amplitude: 1.0,
            center: 0.0,
            width: 25.0,
            best_adjustment: 0,
            residual_sum: 0.0,
            iterations: 0,
        };
        let curve = fit.curve(i32::MIN as f64, i32::MAX as f64, 0.5);
        assert!(curve.len() <= MAX_CURVE_POINTS);
        assert!(curve.len() > MAX_CURVE_POINTS / 2);
        assert_eq!(curve[0].0, i32::MIN as f64);
        assert!(curve.last().unwrap().0 <= i32::MAX as f64);
        assert!(fit.curve(0.0, f64::INFINITY, 0.5).is_empty());
    }

    #[test]
    fn test_curve_sampling() {
        let fit = FitResult {
            amplitude: 2.0,
            center: 1.0,
            width: 4.0,
            best_adjustment: 1,
            residual_sum: 0.0,
            iterations: 0,
        };
        let curve = fit.curve(-2.0, 2.0, 0.5);
        assert_eq!(curve.len(), 9);
        assert_eq!(curve[0].0, -2.0);
        assert_eq!(curve[8].0, 2.0);
        assert!((fit.evaluate(1.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_config_validation() {
        assert!(FitConfig::default().validate().is_ok());
        let bad = FitConfig {
            lambda_down: 2.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
