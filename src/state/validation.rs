//! Validation of the persisted calibration document

use anyhow::Result;
use tracing::debug;

use crate::calibration::CalibrationState;
use crate::config::{MAX_CALIBRATION_POINTS, MIN_CALIBRATION_POINTS};
use crate::math::{is_finite_quat, is_finite_vec, quat_norm};
use crate::state::{CalibrationSettings, StateError};

/// Allowed deviation of a stored rotation from unit norm
pub const ROTATION_NORM_TOLERANCE: f32 = 1e-3;

/// Range and finiteness checks for calibration documents
#[derive(Debug, Clone, Default)]
pub struct StateValidator;

impl StateValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate the complete document
    pub fn validate(&self, settings: &CalibrationSettings) -> Result<()> {
        if !(MIN_CALIBRATION_POINTS..=MAX_CALIBRATION_POINTS).contains(&settings.points_number) {
            return Err(StateError::ValidationError(format!(
                "points_number out of range: {}",
                settings.points_number
            ))
            .into());
        }

        for (device_id, state) in &settings.devices {
            if device_id.trim().is_empty() {
                return Err(StateError::ValidationError("empty device id".to_string()).into());
            }
            self.validate_device(device_id, state)?;
        }

        debug!("Validated calibration for {} devices", settings.devices.len());
        Ok(())
    }

    pub fn validate_device(&self, device_id: &str, state: &CalibrationState) -> Result<()> {
        if !is_finite_quat(&state.rotation)
            || !is_finite_vec(&state.translation)
            || !is_finite_vec(&state.origin)
        {
            return Err(StateError::ValidationError(format!(
                "non-finite calibration values for '{}'",
                device_id
            ))
            .into());
        }

        let norm = quat_norm(&state.rotation);
        if (norm - 1.0).abs() > ROTATION_NORM_TOLERANCE {
            return Err(StateError::ValidationError(format!(
                "rotation of '{}' is not a unit quaternion (norm {})",
                device_id, norm
            ))
            .into());
        }
        Ok(())
    }
}
