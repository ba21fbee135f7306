/// Sharpness scoring module
///
/// Scores a cropped grayscale frame with three complementary metrics:
/// global contrast (variance), edge strength (normalized gradient magnitude)
/// and low-to-mid frequency detail (FFT band energy).
pub mod estimator;
pub mod gradient;
pub mod spectrum;
pub mod variance;

pub use estimator::{SharpnessEstimator, DEFAULT_FFT_BAND_FRACTION};
pub use gradient::gradient_metric;
pub use spectrum::fft_band_metric;
pub use variance::variance_metric;
