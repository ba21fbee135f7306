//! Core data types shared by the scoring, combining and fitting stages.

use crate::errors::{CalibrationError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Single-channel image with `f64` intensities, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f64>,
}

impl GrayFrame {
    /// Wrap raw intensities, checking that the buffer matches the dimensions.
    pub fn new(width: u32, height: u32, data: Vec<f64>) -> Result<Self> {
        let frame = Self {
            width,
            height,
            data,
        };
        frame.check_size()?;
        Ok(frame)
    }

    /// Fail with `DataCorruption` unless the buffer holds `width * height` pixels.
    /// Frames assembled from the public fields skip the check in `new`.
    pub fn check_size(&self) -> Result<()> {
        let expected_size = self.width as usize * self.height as usize;
        if self.data.len() != expected_size {
            return Err(CalibrationError::DataCorruption {
                frame_size: self.data.len(),
                expected_size,
            });
        }
        Ok(())
    }

    /// Build a frame by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f64) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_luma8(image: &image::GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let data = image.as_raw().iter().map(|&v| v as f64).collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Convert any decoded image to grayscale.
    pub fn from_dynamic(image: &image::DynamicImage) -> Self {
        Self::from_luma8(&image.to_luma8())
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f64 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Cut out the centered rectangle described by `window`.
    ///
    /// The window must fit inside the frame; nothing is clipped or wrapped.
    pub fn crop(&self, window: &CropWindow) -> Result<GrayFrame> {
        self.check_size()?;
        let (x0, x1) = window.x_range(self.width)?;
        let (y0, y1) = window.y_range(self.height)?;

        let out_width = x1 - x0;
        let mut data = Vec::with_capacity(out_width as usize * (y1 - y0) as usize);
        for y in y0..y1 {
            let row = y as usize * self.width as usize;
            data.extend_from_slice(&self.data[row + x0 as usize..row + x1 as usize]);
        }

        Ok(GrayFrame {
            width: out_width,
            height: y1 - y0,
            data,
        })
    }
}

/// Centered crop rectangle given by its half extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropWindow {
    pub half_width: u32,
    pub half_height: u32,
}

impl CropWindow {
    pub fn new(half_width: u32, half_height: u32) -> Self {
        Self {
            half_width,
            half_height,
        }
    }

    pub fn width(&self) -> u32 {
        self.half_width * 2
    }

    pub fn height(&self) -> u32 {
        self.half_height * 2
    }

    fn x_range(&self, width: u32) -> Result<(u32, u32)> {
        span(width, self.half_width, "width")
    }

    fn y_range(&self, height: u32) -> Result<(u32, u32)> {
        span(height, self.half_height, "height")
    }
}

fn span(dim: u32, half: u32, axis: &str) -> Result<(u32, u32)> {
    let center = dim / 2;
    if half == 0 {
        return Err(CalibrationError::InvalidWindow(format!(
            "half {axis} must be positive"
        )));
    }
    if half > center || center + half > dim {
        return Err(CalibrationError::InvalidWindow(format!(
            "half {axis} {half} does not fit image {axis} {dim}"
        )));
    }
    Ok((center - half, center + half))
}

/// Sharpness metrics, in score-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Variance,
    Gradient,
    FftBand,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Variance, Metric::Gradient, Metric::FftBand];

    pub fn index(self) -> usize {
        match self {
            Metric::Variance => 0,
            Metric::Gradient => 1,
            Metric::FftBand => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Variance => "variance",
            Metric::Gradient => "gradient",
            Metric::FftBand => "fft_band",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "variance" | "var" => Ok(Metric::Variance),
            "gradient" | "grad" => Ok(Metric::Gradient),
            "fft" | "fft_band" | "fftband" => Ok(Metric::FftBand),
            other => Err(CalibrationError::InvalidConfig(format!(
                "unknown metric '{other}' (expected variance, gradient or fft)"
            ))),
        }
    }
}

/// Metrics combined when nothing else is configured.
pub fn default_metrics() -> Vec<Metric> {
    vec![Metric::Variance, Metric::FftBand]
}

/// Raw or normalized `(variance, gradient, fft_band)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    pub variance: f64,
    pub gradient: f64,
    pub fft_band: f64,
}

impl ScoreVector {
    pub fn new(variance: f64, gradient: f64, fft_band: f64) -> Self {
        Self {
            variance,
            gradient,
            fft_band,
        }
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Variance => self.variance,
            Metric::Gradient => self.gradient,
            Metric::FftBand => self.fft_band,
        }
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.variance, self.gradient, self.fft_band]
    }
}

/// One point of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub adjustment: i32,
    pub combined: f64,
    /// All three metrics divided by the reference, for display.
    pub normalized: ScoreVector,
}

/// Append-only sequence of samples collected over one sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SweepSeries {
    samples: Vec<Sample>,
}

impl SweepSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `(adjustment, combined)` pairs as fit input.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.samples
            .iter()
            .map(|s| (s.adjustment as f64, s.combined))
    }
}

impl FromIterator<(i32, f64)> for SweepSeries {
    fn from_iter<I: IntoIterator<Item = (i32, f64)>>(iter: I) -> Self {
        let samples = iter
            .into_iter()
            .map(|(adjustment, combined)| Sample {
                adjustment,
                combined,
                normalized: ScoreVector::new(combined, combined, combined),
            })
            .collect();
        Self { samples }
    }
}
