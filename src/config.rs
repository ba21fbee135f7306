//! Configuration management for focuscal
//!
//! Provides loading, saving and validation of the crop window, the sweep
//! sequence, metric selection and fit tuning.

use crate::errors::CalibrationError;
use crate::fit::FitConfig;
use crate::quality::DEFAULT_FFT_BAND_FRACTION;
use crate::region::{DEFAULT_HALF_HEIGHT, DEFAULT_HALF_WIDTH};
use crate::sweep::{validate_adjustments, DEFAULT_ADJUSTMENTS};
use crate::types::{default_metrics, Metric};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub crop: CropConfig,
    pub sweep: SweepConfig,
    pub scoring: ScoringConfig,
    pub fit: FitConfig,
}

/// Requested centered crop, clipped to the first image of a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    pub half_width: u32,
    pub half_height: u32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            half_width: DEFAULT_HALF_WIDTH,
            half_height: DEFAULT_HALF_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Micro-adjustment values, visited in order
    pub adjustments: Vec<i32>,
    /// Directory holding recorded sweep images for replay
    pub image_directory: Option<PathBuf>,
    /// Run number embedded in recorded image names
    pub run: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            adjustments: DEFAULT_ADJUSTMENTS.to_vec(),
            image_directory: None,
            run: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Metrics averaged into the combined sharpness
    pub selected_metrics: Vec<Metric>,
    /// Fraction of each half-spectrum summed by the FFT band metric
    pub fft_band_fraction: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            selected_metrics: default_metrics(),
            fft_band_fraction: DEFAULT_FFT_BAND_FRACTION,
        }
    }
}

impl CalibrationConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CalibrationError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CalibrationError::Config(format!("Failed to read config file: {}", e)))?;

        let config: CalibrationConfig = toml::from_str(&contents)
            .map_err(|e| CalibrationError::Config(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CalibrationError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CalibrationError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, self.to_toml_string()?)
            .map_err(|e| CalibrationError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, CalibrationError> {
        toml::to_string_pretty(self)
            .map_err(|e| CalibrationError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("focuscal.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.crop.half_width == 0 || self.crop.half_height == 0 {
            return Err("Crop half extents must be positive".to_string());
        }

        validate_adjustments(&self.sweep.adjustments).map_err(|e| e.to_string())?;

        if self.scoring.selected_metrics.is_empty() {
            return Err("At least one metric must be selected".to_string());
        }
        let fraction = self.scoring.fft_band_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err("FFT band fraction must be between 0.0 and 1.0".to_string());
        }

        self.fit.validate()
    }
}
