//! Tests for calibration document serialization and legacy import

use approx::assert_relative_eq;
use tracker_calibration::math::{quat_from_yaw_pitch_roll, Quat, Vec3};
use tracker_calibration::state::*;

use crate::support::{saved_state, DEVICE};

const LEGACY_DOCUMENT: &str = r#"{
    "DeviceMatricesCalibrated": { "KINECT-A": true, "PSMOVE-B": false },
    "DeviceAutoCalibration": { "KINECT-A": true },
    "DeviceCalibrationRotationMatrices": {
        "KINECT-A": { "X": 0.0, "Y": 0.7071068, "Z": 0.0, "W": 0.7071068 },
        "PSMOVE-B": { "X": 0.0, "Y": 0.0, "Z": 0.0, "W": 0.0 }
    },
    "DeviceCalibrationTranslationVectors": {
        "KINECT-A": { "X": 0.25, "Y": -0.5, "Z": 1.5 }
    },
    "DeviceCalibrationOrigins": {
        "PSMOVE-B": { "X": 0.0, "Y": 1.0, "Z": 2.0 }
    },
    "CalibrationPointsNumber": 4,
    "AppOptedIntoTelemetry": false
}"#;

#[test]
fn test_serialize_deserialize_roundtrip() {
    let serializer = StateSerializer::new();
    let mut original = CalibrationSettings::default();
    original.set_device(DEVICE, saved_state());

    let json_string = serializer
        .serialize_to_string(&original)
        .expect("Serialization failed");
    let deserialized = serializer
        .deserialize_from_string(&json_string)
        .expect("Deserialization failed");

    assert_eq!(deserialized, original);
    assert!(deserialized.is_current_version());
}

#[test]
fn test_compressed_roundtrip() {
    let serializer = StateSerializer::with_config(false, true);
    let mut original = CalibrationSettings::default();
    original.set_device(DEVICE, saved_state());

    let compressed = serializer
        .serialize_to_string(&original)
        .expect("Serialization failed");
    serializer
        .validate_json(&compressed)
        .expect("Validation failed");

    let restored = serializer
        .deserialize_from_string(&compressed)
        .expect("Deserialization failed");
    assert_eq!(restored, original);
}

#[test]
fn test_legacy_document_is_migrated() {
    let serializer = StateSerializer::with_config(false, false);

    let settings = serializer
        .deserialize_from_string(LEGACY_DOCUMENT)
        .expect("Migration failed");

    assert!(settings.is_current_version());
    assert_eq!(settings.points_number, 4);
    assert_eq!(settings.devices.len(), 2);

    let kinect = settings.device("KINECT-A");
    assert!(kinect.is_calibrated);
    assert!(kinect.is_auto_method);
    assert!(
        kinect
            .rotation
            .angle_to(&quat_from_yaw_pitch_roll(std::f32::consts::FRAC_PI_2, 0.0, 0.0))
            < 1e-5
    );
    assert_relative_eq!(kinect.translation, Vec3::new(0.25, -0.5, 1.5));
    assert_eq!(kinect.origin, Vec3::zeros());

    let psmove = settings.device("PSMOVE-B");
    assert!(!psmove.is_calibrated);
    assert!(!psmove.is_auto_method);
    assert_eq!(psmove.rotation, Quat::identity());
    assert_eq!(psmove.origin, Vec3::new(0.0, 1.0, 2.0));

    StateValidator::new()
        .validate(&settings)
        .expect("Migrated settings should validate");
}

#[test]
fn test_points_number_is_clamped() {
    let serializer = StateSerializer::with_config(false, false);

    let high = serializer
        .deserialize_from_string(
            r#"{"schema_version": "1.0.0", "last_updated": 0, "points_number": 9}"#,
        )
        .expect("Deserialization failed");
    assert_eq!(high.points_number, 5);
    assert!(high.devices.is_empty());

    let low = serializer
        .deserialize_from_string(r#"{"CalibrationPointsNumber": 1}"#)
        .expect("Migration failed");
    assert_eq!(low.points_number, 3);
}

#[test]
fn test_validate_json_requires_header_fields() {
    let serializer = StateSerializer::with_config(false, false);
    assert!(serializer
        .validate_json(r#"{"schema_version": "1.0.0", "last_updated": 0}"#)
        .is_err());
    assert!(serializer.validate_json("not json").is_err());
    assert!(serializer
        .validate_json(r#"{"schema_version": "1.0.0", "last_updated": 0, "points_number": 3}"#)
        .is_ok());
}

#[test]
fn test_missing_device_reads_as_uncalibrated() {
    let settings = CalibrationSettings::default();
    let state = settings.device("UNKNOWN");
    assert!(!state.is_calibrated);
    assert_eq!(state.rotation, Quat::identity());
    assert_eq!(state.translation, Vec3::zeros());
}
