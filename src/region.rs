//! Region selection: the centered crop applied to every frame of a sweep.

use crate::errors::{CalibrationError, Result};
use crate::types::CropWindow;

pub const DEFAULT_HALF_WIDTH: u32 = 900;
pub const DEFAULT_HALF_HEIGHT: u32 = 600;

/// Clip a requested centered window to an image of `width` x `height`.
///
/// Each half extent is limited to the room available on both sides of the
/// integer center, so the result always satisfies [`GrayFrame::crop`].
///
/// [`GrayFrame::crop`]: crate::types::GrayFrame::crop
pub fn select_window(
    width: u32,
    height: u32,
    half_width: u32,
    half_height: u32,
) -> Result<CropWindow> {
    if half_width == 0 || half_height == 0 {
        return Err(CalibrationError::InvalidWindow(format!(
            "requested window {half_width}x{half_height} must be positive"
        )));
    }

    let clipped_width = clip(width, half_width);
    let clipped_height = clip(height, half_height);

    if clipped_width == 0 || clipped_height == 0 {
        return Err(CalibrationError::InvalidWindow(format!(
            "image {width}x{height} is too small for any centered window"
        )));
    }

    if clipped_width != half_width || clipped_height != half_height {
        log::debug!(
            "Clipped crop window {}x{} to {}x{} for {}x{} image",
            half_width,
            half_height,
            clipped_width,
            clipped_height,
            width,
            height
        );
    }

    Ok(CropWindow::new(clipped_width, clipped_height))
}

fn clip(dim: u32, half: u32) -> u32 {
    let center = dim / 2;
    half.min(center).min(dim - center)
}
