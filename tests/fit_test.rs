//! Gaussian fit tests on hand-built sweep series

use focuscal::errors::CalibrationError;
use focuscal::fit::{fit_gaussian, fit_points, FitConfig, FitError};
use focuscal::sweep::DEFAULT_ADJUSTMENTS;
use focuscal::types::SweepSeries;

fn gaussian(amplitude: f64, center: f64, width: f64) -> impl Fn(i32) -> f64 {
    move |x| {
        let d = x as f64 - center;
        amplitude * (-(d * d) / width).exp()
    }
}

fn series(xs: &[i32], f: impl Fn(i32) -> f64) -> SweepSeries {
    xs.iter().map(|&x| (x, f(x))).collect()
}

#[test]
fn test_round_trip_default_sweep() {
    let data = series(&DEFAULT_ADJUSTMENTS, gaussian(1.0, 3.0, 25.0));
    let fit = fit_gaussian(&data, &FitConfig::default()).unwrap();

    assert!((fit.center - 3.0).abs() <= 0.05, "center {}", fit.center);
    assert_eq!(fit.best_adjustment, 3);
    assert!(fit.residual_sum < 1e-12);
}

#[test]
fn test_best_adjustment_rounds_center() {
    let data = series(&DEFAULT_ADJUSTMENTS, gaussian(1.2, -1.4, 60.0));
    let fit = fit_gaussian(&data, &FitConfig::default()).unwrap();
    assert!((fit.center + 1.4).abs() < 0.05);
    assert_eq!(fit.best_adjustment, -1);
}

#[test]
fn test_small_noise_keeps_peak() {
    let noise = [0.01, -0.02, 0.015, -0.005, 0.0, 0.02, -0.01, 0.005, -0.015];
    let xs = [-8, -6, -4, -2, 0, 2, 4, 6, 8];
    let clean = gaussian(2.0, 2.0, 30.0);
    let data: SweepSeries = xs
        .iter()
        .zip(noise.iter())
        .map(|(&x, &n)| (x, clean(x) + n))
        .collect();

    let fit = fit_gaussian(&data, &FitConfig::default()).unwrap();
    assert_eq!(fit.best_adjustment, 2);
}

#[test]
fn test_duplicate_adjustments_not_possible() {
    let data: SweepSeries = [(0, 1.0), (0, 1.1), (4, 0.9), (4, 1.0), (4, 1.2)]
        .into_iter()
        .collect();
    let err = fit_gaussian(&data, &FitConfig::default()).unwrap_err();
    assert!(matches!(err, FitError::NotPossible(_)));
}

#[test]
fn test_non_finite_values_not_possible() {
    let err = fit_points(&[0.0, 1.0, 2.0], &[1.0, f64::NAN, 1.0], &FitConfig::default())
        .unwrap_err();
    assert!(matches!(err, FitError::NotPossible(_)));
}

#[test]
fn test_empty_series_not_possible() {
    let err = fit_gaussian(&SweepSeries::new(), &FitConfig::default()).unwrap_err();
    assert!(matches!(err, FitError::NotPossible(_)));
}

#[test]
fn test_fit_error_converts_to_calibration_error() {
    fn run() -> Result<i32, CalibrationError> {
        let data: SweepSeries = [(0, 1.0), (2, 1.0)].into_iter().collect();
        Ok(fit_gaussian(&data, &FitConfig::default())?.best_adjustment)
    }

    let err = run().unwrap_err();
    assert!(matches!(err, CalibrationError::Fit(FitError::NotPossible(_))));
    assert!(err.to_string().contains("Fit not possible"));
}
