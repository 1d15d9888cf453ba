//! Tests for configuration loading

use tempfile::TempDir;
use tracker_calibration::config::*;
use tracker_calibration::error::CalibrationError;

#[test]
fn test_empty_file_gives_defaults() {
    let config = CalibrationConfig::from_toml_str("").expect("Parse failed");
    assert_eq!(config, CalibrationConfig::default());
    assert_eq!(config.auto.points, None);
    assert_eq!(config.auto.countdown_from, 3);
    assert_eq!(config.manual.poll_interval_ms, 5);
    assert_eq!(config.manual.mode_swap_settle_ms, 300);
}

#[test]
fn test_partial_file_overrides_only_given_fields() {
    let config = CalibrationConfig::from_toml_str(
        r#"
        [auto]
        points = 5
        tick_interval_ms = 500

        [storage]
        directory = "/tmp/calibration-state"
        compression = true

        [logging]
        level = "debug"
        "#,
    )
    .expect("Parse failed");

    assert_eq!(config.auto.points, Some(5));
    assert_eq!(config.auto.tick_interval().as_millis(), 500);
    assert_eq!(config.auto.lead_in_ms, 1000);
    assert!(config.storage.compression);
    assert_eq!(
        config.storage.resolved_directory(),
        std::path::PathBuf::from("/tmp/calibration-state")
    );
    assert_eq!(config.logging.max_level(), tracing::Level::DEBUG);
}

#[test]
fn test_point_count_is_validated() {
    let err = CalibrationConfig::from_toml_str("[auto]\npoints = 7\n").expect_err("Should fail");
    assert!(matches!(
        err.downcast_ref::<CalibrationError>(),
        Some(CalibrationError::PointCount(7))
    ));
}

#[test]
fn test_zero_countdown_is_rejected() {
    let mut config = CalibrationConfig::default();
    config.auto.countdown_from = 0;
    assert!(matches!(
        config.validate(),
        Err(CalibrationError::InvalidConfig(_))
    ));
}

#[test]
fn test_non_positive_multiplier_is_rejected() {
    let mut config = CalibrationConfig::default();
    config.manual.translation_fine_multiplier = 0.0;
    assert!(config.validate().is_err());

    let mut config = CalibrationConfig::default();
    config.manual.poll_interval_ms = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_fine_tune_multipliers() {
    let manual = ManualCalibrationSettings::default();
    assert_eq!(manual.translation_multiplier(false), 0.015);
    assert_eq!(manual.translation_multiplier(true), 0.0015);
    assert_eq!(manual.rotation_multiplier(false), 1.0);
    assert_eq!(manual.rotation_multiplier(true), 0.1);
}

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("calibration.toml");
    std::fs::write(&path, "[manual]\nrotation_multiplier = 2.0\n").expect("Write failed");

    let config = CalibrationConfig::load(&path).expect("Load failed");
    assert_eq!(config.manual.rotation_multiplier, 2.0);

    assert!(CalibrationConfig::load(&temp_dir.path().join("missing.toml")).is_err());
}

#[test]
fn test_unknown_log_level_falls_back_to_info() {
    let logging = LoggingSettings {
        level: "chatty".to_string(),
    };
    assert_eq!(logging.max_level(), tracing::Level::INFO);
}
