#[cfg(test)]
mod error_tests {
    use focuscal::errors::{CalibrationError, CaptureError, CaptureErrorKind};
    use focuscal::fit::FitError;
    use focuscal::types::Metric;
    use std::error::Error;

    #[test]
    fn test_invalid_window_display() {
        let error = CalibrationError::InvalidWindow("half width 0".to_string());
        assert_eq!(error.to_string(), "Invalid crop window: half width 0");
    }

    #[test]
    fn test_divide_by_zero_names_metric() {
        let error = CalibrationError::DivideByZeroReference {
            metric: Metric::FftBand,
        };
        assert!(error.to_string().contains("fft_band"));
    }

    #[test]
    fn test_capture_failure_keeps_source() {
        let error = CalibrationError::CaptureFailure {
            adjustment: -6,
            source: CaptureError::backend("usb reset"),
        };
        assert!(error.to_string().contains("adjustment -6"));

        let source = error.source().expect("capture failure should expose its source");
        assert_eq!(source.to_string(), "usb reset");
        let capture = source.downcast_ref::<CaptureError>().unwrap();
        assert_eq!(capture.kind, CaptureErrorKind::Backend);
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let error = CalibrationError::DimensionMismatch {
            expected: (4000, 3000),
            got: (3000, 4000),
        };
        assert_eq!(
            error.to_string(),
            "Image dimension mismatch: expected 4000x3000, got 3000x4000"
        );
    }

    #[test]
    fn test_fit_errors_are_transparent() {
        let error: CalibrationError = FitError::DidNotConverge { iterations: 400 }.into();
        assert_eq!(error.to_string(), "Fit did not converge after 400 iterations");
    }

    #[test]
    fn test_capture_error_constructors() {
        assert_eq!(CaptureError::not_found("a.jpg").kind, CaptureErrorKind::NotFound);
        assert!(CaptureError::not_found("a.jpg").message.contains("a.jpg"));
        assert_eq!(
            CaptureError::decode("a.jpg", "bad marker").kind,
            CaptureErrorKind::Decode
        );
        assert_eq!(CaptureError::io("disk full").to_string(), "disk full");
        assert_eq!(CaptureError::cancelled().kind, CaptureErrorKind::Cancelled);
    }

    #[test]
    fn test_errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<CalibrationError>();
        assert_send_sync::<CaptureError>();
        assert_send_sync::<FitError>();
    }
}
