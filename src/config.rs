//! Calibration configuration
//!
//! Loaded from a TOML file; every field has a default so a partial file (or
//! no file at all) is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CalibrationError;

/// Supported range of anchor points for automatic calibration
pub const MIN_CALIBRATION_POINTS: usize = 3;
pub const MAX_CALIBRATION_POINTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub auto: AutoCalibrationSettings,
    pub manual: ManualCalibrationSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            auto: AutoCalibrationSettings::default(),
            manual: ManualCalibrationSettings::default(),
            storage: StorageSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Timing of the point-based procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoCalibrationSettings {
    /// Number of anchor points, 3..=5; the count saved in the store when unset
    pub points: Option<usize>,
    /// First countdown value of the move and stand phases (counts down to 0)
    pub countdown_from: u32,
    pub tick_interval_ms: u64,
    /// Pause before the first point
    pub lead_in_ms: u64,
    /// Pause after each captured point
    pub point_settle_ms: u64,
}

impl Default for AutoCalibrationSettings {
    fn default() -> Self {
        Self {
            points: None,
            countdown_from: 3,
            tick_interval_ms: 1000,
            lead_in_ms: 1000,
            point_settle_ms: 1000,
        }
    }
}

impl AutoCalibrationSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn lead_in(&self) -> Duration {
        Duration::from_millis(self.lead_in_ms)
    }

    pub fn point_settle(&self) -> Duration {
        Duration::from_millis(self.point_settle_ms)
    }
}

/// Sensitivity and pacing of the joystick-driven procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualCalibrationSettings {
    pub poll_interval_ms: u64,
    /// Pause after every translation/rotation switch
    pub mode_swap_settle_ms: u64,
    /// Meters per poll at full stick deflection
    pub translation_multiplier: f32,
    pub translation_fine_multiplier: f32,
    /// Radians per poll at full stick deflection, before the multiplier
    pub rotation_step: f32,
    pub rotation_multiplier: f32,
    pub rotation_fine_multiplier: f32,
}

impl Default for ManualCalibrationSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5,
            mode_swap_settle_ms: 300,
            translation_multiplier: 0.015,
            translation_fine_multiplier: 0.0015,
            rotation_step: std::f32::consts::PI / 280.0,
            rotation_multiplier: 1.0,
            rotation_fine_multiplier: 0.1,
        }
    }
}

impl ManualCalibrationSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn mode_swap_settle(&self) -> Duration {
        Duration::from_millis(self.mode_swap_settle_ms)
    }

    pub fn translation_multiplier(&self, fine_tune: bool) -> f32 {
        if fine_tune {
            self.translation_fine_multiplier
        } else {
            self.translation_multiplier
        }
    }

    pub fn rotation_multiplier(&self, fine_tune: bool) -> f32 {
        if fine_tune {
            self.rotation_fine_multiplier
        } else {
            self.rotation_multiplier
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// State directory; `~/.tracker-calibration/state` when unset
    pub directory: Option<PathBuf>,
    pub compression: bool,
    pub max_backups: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            directory: None,
            compression: false,
            max_backups: 5,
        }
    }
}

impl StorageSettings {
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(default_state_directory)
    }
}

pub fn default_state_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tracker-calibration")
        .join("state")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// One of `trace`, `debug`, `info`, `warn`, `error`
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    pub fn max_level(&self) -> tracing::Level {
        self.level.parse().unwrap_or(tracing::Level::INFO)
    }
}

impl CalibrationConfig {
    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CalibrationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CalibrationError> {
        let auto = &self.auto;
        if let Some(points) = auto.points {
            if !(MIN_CALIBRATION_POINTS..=MAX_CALIBRATION_POINTS).contains(&points) {
                return Err(CalibrationError::PointCount(points));
            }
        }
        if auto.countdown_from < 1 {
            return Err(CalibrationError::InvalidConfig(
                "countdown_from must be at least 1 so a capture tick exists".to_string(),
            ));
        }

        let manual = &self.manual;
        if manual.poll_interval_ms == 0 {
            return Err(CalibrationError::InvalidConfig(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        let multipliers = [
            manual.translation_multiplier,
            manual.translation_fine_multiplier,
            manual.rotation_step,
            manual.rotation_multiplier,
            manual.rotation_fine_multiplier,
        ];
        if multipliers.iter().any(|m| !m.is_finite() || *m <= 0.0) {
            return Err(CalibrationError::InvalidConfig(
                "manual multipliers must be finite and positive".to_string(),
            ));
        }
        Ok(())
    }
}
