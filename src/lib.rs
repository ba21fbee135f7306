//! focuscal: autofocus micro-adjustment calibration
//!
//! Finds the lens micro-adjustment that gives the sharpest images by
//! sweeping a sequence of adjustment values, scoring each capture and fitting
//! a Gaussian to the scores.
//!
//! # Features
//! - Variance, gradient and FFT band sharpness metrics on a centered crop
//! - Scores normalized against the first capture of the sweep
//! - Levenberg-Marquardt Gaussian fit with graceful failure reporting
//! - Replay of recorded sweeps from disk
//! - JSON calibration reports and TOML configuration
//!
//! # Usage
//! ```rust,no_run
//! use focuscal::{DirectoryReplay, SweepController, DEFAULT_ADJUSTMENTS};
//!
//! let controller = SweepController::default();
//! let mut replay = DirectoryReplay::new("captures", 1);
//! let report = controller.calibrate(&DEFAULT_ADJUSTMENTS, &mut replay, |_| {})?;
//! println!("{}", report.format_table());
//! # Ok::<(), focuscal::CalibrationError>(())
//! ```
pub mod combine;
pub mod config;
pub mod errors;
pub mod fit;
pub mod quality;
pub mod region;
pub mod report;
pub mod sweep;
pub mod types;

// Testing utilities - synthetic data for offline testing
pub mod testing;

// Re-exports for convenience
pub use combine::{combine, normalize, SampleCombiner};
pub use config::CalibrationConfig;
pub use errors::{CalibrationError, CaptureError, CaptureErrorKind};
pub use fit::{fit_gaussian, FitConfig, FitError, FitResult};
pub use quality::SharpnessEstimator;
pub use region::select_window;
pub use report::{CalibrationReport, FitOutcome};
pub use sweep::{
    CaptureSource, DirectoryReplay, ManualPrompt, SweepController, DEFAULT_ADJUSTMENTS,
};
pub use types::{CropWindow, GrayFrame, Metric, Sample, ScoreVector, SweepSeries};

/// Initialize logging for the calibration tool
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "focuscal=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        metrics: Metric::ALL.to_vec(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Sharpness metrics this build can compute
    pub metrics: Vec<Metric>,
}
