//! Persisted calibration document
//!
//! One record per device id, kept in a sorted map so the file diffs cleanly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calibration::CalibrationState;
use crate::config::{MAX_CALIBRATION_POINTS, MIN_CALIBRATION_POINTS};

/// Schema version for state migration support
pub const STATE_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSettings {
    /// Schema version for migration support
    pub schema_version: String,
    /// Timestamp of last state update (seconds since the epoch)
    pub last_updated: u64,
    /// Anchor points used by automatic calibration
    pub points_number: usize,
    /// Calibration per device id
    #[serde(default)]
    pub devices: BTreeMap<String, CalibrationState>,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION.to_string(),
            last_updated: unix_now(),
            points_number: MIN_CALIBRATION_POINTS,
            devices: BTreeMap::new(),
        }
    }
}

impl CalibrationSettings {
    pub fn device(&self, device_id: &str) -> CalibrationState {
        self.devices.get(device_id).copied().unwrap_or_default()
    }

    pub fn set_device(&mut self, device_id: &str, state: CalibrationState) {
        self.devices.insert(device_id.to_string(), state);
    }

    /// Clamp values the user may have edited by hand
    pub fn sanitize(&mut self) {
        self.points_number = self
            .points_number
            .clamp(MIN_CALIBRATION_POINTS, MAX_CALIBRATION_POINTS);
    }

    pub fn touch(&mut self) {
        self.last_updated = unix_now();
    }

    pub fn is_current_version(&self) -> bool {
        self.schema_version == STATE_SCHEMA_VERSION
    }
}

pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
