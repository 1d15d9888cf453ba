//! Serialization Layer for State Persistence
//!
//! Handles conversion between `CalibrationSettings` and JSON, with optional
//! zstd compression and import of the legacy per-field dictionary layout.

use anyhow::Result;
use base64::Engine;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::calibration::CalibrationState;
use crate::math::{Quat, Vec3};
use crate::state::{CalibrationSettings, StateError, STATE_SCHEMA_VERSION};
use nalgebra::Quaternion;

/// Keys that identify a document written by the legacy settings format
const LEGACY_KEYS: [&str; 6] = [
    "DeviceMatricesCalibrated",
    "DeviceAutoCalibration",
    "DeviceCalibrationRotationMatrices",
    "DeviceCalibrationTranslationVectors",
    "DeviceCalibrationOrigins",
    "CalibrationPointsNumber",
];

/// Serialization manager for state persistence
#[derive(Debug, Clone)]
pub struct StateSerializer {
    /// Pretty-print JSON for debugging
    pretty_print: bool,
    /// Compression enabled
    compression_enabled: bool,
}

impl StateSerializer {
    pub fn new() -> Self {
        Self {
            pretty_print: cfg!(debug_assertions),
            compression_enabled: false,
        }
    }

    pub fn with_config(pretty_print: bool, compression_enabled: bool) -> Self {
        Self {
            pretty_print,
            compression_enabled,
        }
    }

    pub fn serialize_to_string(&self, settings: &CalibrationSettings) -> Result<String> {
        let json_string = if self.pretty_print {
            serde_json::to_string_pretty(settings)
        } else {
            serde_json::to_string(settings)
        }
        .map_err(StateError::SerializationError)?;

        if self.compression_enabled {
            self.compress_json(&json_string)
        } else {
            Ok(json_string)
        }
    }

    /// Deserialize a current or legacy document
    pub fn deserialize_from_string(&self, contents: &str) -> Result<CalibrationSettings> {
        let json_string = if self.compression_enabled {
            self.decompress_json(contents)?
        } else {
            contents.to_string()
        };

        let value: serde_json::Value =
            serde_json::from_str(&json_string).map_err(StateError::SerializationError)?;
        let obj = value
            .as_object()
            .ok_or_else(|| StateError::CorruptedState("Root must be an object".to_string()))?;

        let mut settings = if obj.contains_key("schema_version") {
            let version = obj
                .get("schema_version")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            if version != STATE_SCHEMA_VERSION {
                warn!(
                    "Unknown schema version: {}, attempting to load as-is",
                    version
                );
            }
            serde_json::from_value::<CalibrationSettings>(value)
                .map_err(StateError::SerializationError)?
        } else if LEGACY_KEYS.iter().any(|key| obj.contains_key(*key)) {
            self.migrate_legacy(value)?
        } else {
            return Err(StateError::CorruptedState(
                "Neither a calibration document nor legacy settings".to_string(),
            )
            .into());
        };

        settings.sanitize();
        Ok(settings)
    }

    /// Validate JSON format without full deserialization
    pub fn validate_json(&self, contents: &str) -> Result<()> {
        let json_string = if self.compression_enabled {
            self.decompress_json(contents)?
        } else {
            contents.to_string()
        };

        let json_value: serde_json::Value =
            serde_json::from_str(&json_string).map_err(StateError::SerializationError)?;

        let obj = json_value
            .as_object()
            .ok_or_else(|| StateError::CorruptedState("Root must be an object".to_string()))?;

        for field in ["schema_version", "last_updated", "points_number"] {
            if !obj.contains_key(field) {
                return Err(
                    StateError::CorruptedState(format!("Missing required field: {}", field)).into(),
                );
            }
        }

        debug!("JSON validation passed");
        Ok(())
    }

    /// Fold the five parallel per-device dictionaries into one record per device
    pub fn migrate_legacy(&self, value: serde_json::Value) -> Result<CalibrationSettings> {
        let legacy: LegacySettings =
            serde_json::from_value(value).map_err(StateError::SerializationError)?;

        let mut ids = BTreeSet::new();
        ids.extend(legacy.device_matrices_calibrated.keys().cloned());
        ids.extend(legacy.device_auto_calibration.keys().cloned());
        ids.extend(legacy.device_calibration_rotation_matrices.keys().cloned());
        ids.extend(legacy.device_calibration_translation_vectors.keys().cloned());
        ids.extend(legacy.device_calibration_origins.keys().cloned());

        let mut devices = BTreeMap::new();
        for id in ids {
            let state = CalibrationState {
                is_calibrated: legacy
                    .device_matrices_calibrated
                    .get(&id)
                    .copied()
                    .unwrap_or(false),
                is_auto_method: legacy
                    .device_auto_calibration
                    .get(&id)
                    .copied()
                    .unwrap_or(false),
                rotation: legacy
                    .device_calibration_rotation_matrices
                    .get(&id)
                    .map(LegacyQuaternion::to_quat)
                    .unwrap_or_else(Quat::identity),
                translation: legacy
                    .device_calibration_translation_vectors
                    .get(&id)
                    .map(LegacyVector3::to_vec3)
                    .unwrap_or_else(Vec3::zeros),
                origin: legacy
                    .device_calibration_origins
                    .get(&id)
                    .map(LegacyVector3::to_vec3)
                    .unwrap_or_else(Vec3::zeros),
            };
            devices.insert(id, state);
        }

        info!("🔄 Migrated legacy calibration settings for {} devices", devices.len());

        Ok(CalibrationSettings {
            schema_version: STATE_SCHEMA_VERSION.to_string(),
            points_number: legacy.calibration_points_number,
            devices,
            ..Default::default()
        })
    }

    /// Compress with zstd level 3 and encode as base64 for text storage
    fn compress_json(&self, json_string: &str) -> Result<String> {
        let json_bytes = json_string.as_bytes();
        let compressed_bytes = zstd::encode_all(json_bytes, 3)
            .map_err(|e| anyhow::anyhow!("Compression failed: {}", e))?;

        debug!(
            "Compressed {} bytes to {} bytes",
            json_bytes.len(),
            compressed_bytes.len()
        );

        Ok(base64::engine::general_purpose::STANDARD.encode(&compressed_bytes))
    }

    fn decompress_json(&self, contents: &str) -> Result<String> {
        let compressed_bytes = base64::engine::general_purpose::STANDARD
            .decode(contents.trim())
            .map_err(|e| StateError::CorruptedState(format!("Invalid base64: {}", e)))?;
        let json_bytes = zstd::decode_all(compressed_bytes.as_slice())
            .map_err(|e| anyhow::anyhow!("Decompression failed: {}", e))?;
        String::from_utf8(json_bytes)
            .map_err(|e| StateError::CorruptedState(format!("Invalid UTF-8: {}", e)).into())
    }
}

impl Default for StateSerializer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LegacySettings {
    #[serde(default)]
    device_matrices_calibrated: BTreeMap<String, bool>,
    #[serde(default)]
    device_auto_calibration: BTreeMap<String, bool>,
    #[serde(default)]
    device_calibration_rotation_matrices: BTreeMap<String, LegacyQuaternion>,
    #[serde(default)]
    device_calibration_translation_vectors: BTreeMap<String, LegacyVector3>,
    #[serde(default)]
    device_calibration_origins: BTreeMap<String, LegacyVector3>,
    #[serde(default = "legacy_points_number")]
    calibration_points_number: usize,
}

fn legacy_points_number() -> usize {
    3
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LegacyVector3 {
    x: f32,
    y: f32,
    z: f32,
}

impl LegacyVector3 {
    fn to_vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LegacyQuaternion {
    x: f32,
    y: f32,
    z: f32,
    w: f32,
}

impl LegacyQuaternion {
    /// A never-initialized legacy quaternion is all zeros; treat it as identity
    fn to_quat(&self) -> Quat {
        let q = Quaternion::new(self.w, self.x, self.y, self.z);
        if q.norm() <= f32::EPSILON {
            Quat::identity()
        } else {
            Quat::new_normalize(q)
        }
    }
}
