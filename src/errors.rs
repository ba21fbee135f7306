use crate::fit::FitError;
use crate::types::Metric;

/// Errors raised by the scoring pipeline and the sweep controller.
///
/// Every variant is recoverable by the caller; nothing in the library exits
/// the process.
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("Invalid crop window: {0}")]
    InvalidWindow(String),

    #[error("Gradient map is flat, cannot normalize gradient magnitude")]
    DegenerateGradient,

    #[error("Spectrum is empty, cannot normalize FFT band energy")]
    DegenerateSpectrum,

    #[error("Reference score has a zero {metric} component")]
    DivideByZeroReference { metric: Metric },

    #[error("Capture failed at adjustment {adjustment}: {source}")]
    CaptureFailure {
        adjustment: i32,
        #[source]
        source: CaptureError,
    },

    #[error("Image dimension mismatch: expected {}x{}, got {}x{}", expected.0, expected.1, got.0, got.1)]
    DimensionMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },

    #[error("Frame data corruption: got {frame_size} pixels, expected {expected_size}")]
    DataCorruption {
        frame_size: usize,
        expected_size: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error(transparent)]
    Fit(#[from] FitError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureErrorKind {
    NotFound,
    Decode,
    Io,
    Cancelled,
    Backend,
}

/// Failure reported by a capture collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureError {
    pub kind: CaptureErrorKind,
    pub message: String,
}

impl CaptureError {
    pub fn not_found(path: &str) -> Self {
        Self {
            kind: CaptureErrorKind::NotFound,
            message: format!("image not found: {path}"),
        }
    }

    pub fn decode(path: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            kind: CaptureErrorKind::Decode,
            message: format!("failed to decode {path}: {reason}"),
        }
    }

    pub fn io(reason: impl std::fmt::Display) -> Self {
        Self {
            kind: CaptureErrorKind::Io,
            message: reason.to_string(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: CaptureErrorKind::Cancelled,
            message: "sweep cancelled".to_string(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self {
            kind: CaptureErrorKind::Backend,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CaptureError {}

pub type Result<T> = std::result::Result<T, CalibrationError>;
