//! Tests for rigid transforms and stored calibration application

use approx::assert_relative_eq;
use tracker_calibration::calibration::{CalibrationState, RigidTransform};
use tracker_calibration::math::{quat_from_yaw_pitch_roll, Vec3};

#[test]
fn test_inverse_undoes_transform() {
    let transform = RigidTransform::new(
        quat_from_yaw_pitch_roll(0.8, -0.3, 0.2),
        Vec3::new(1.0, -0.5, 2.0),
    );
    let point = Vec3::new(0.3, 1.7, -0.4);

    let round_trip = transform.inverse().apply(&transform.apply(&point));
    assert_relative_eq!(round_trip, point, epsilon = 1e-5);

    let inverse_of_inverse = transform.inverse().inverse();
    assert_relative_eq!(inverse_of_inverse.translation, transform.translation, epsilon = 1e-5);
}

#[test]
fn test_orientation_is_rotated_by_calibration() {
    let state = CalibrationState {
        is_calibrated: true,
        rotation: quat_from_yaw_pitch_roll(std::f32::consts::FRAC_PI_2, 0.0, 0.0),
        ..Default::default()
    };
    let joint = quat_from_yaw_pitch_roll(0.25, 0.0, 0.0);

    let calibrated = state.apply_to_orientation(&joint);

    let expected = quat_from_yaw_pitch_roll(std::f32::consts::FRAC_PI_2 + 0.25, 0.0, 0.0);
    assert!(calibrated.angle_to(&expected) < 1e-5);
    assert!(
        CalibrationState::default()
            .apply_to_orientation(&joint)
            .angle_to(&joint)
            < 1e-6
    );
}

#[test]
fn test_position_rotates_about_origin() {
    let state = CalibrationState {
        is_calibrated: true,
        rotation: quat_from_yaw_pitch_roll(std::f32::consts::PI, 0.0, 0.0),
        translation: Vec3::new(0.0, 0.1, 0.0),
        origin: Vec3::new(1.0, 0.0, 1.0),
        ..Default::default()
    };

    // The pivot itself only moves by the translation
    assert_relative_eq!(
        state.apply_to_position(&Vec3::new(1.0, 0.0, 1.0)),
        Vec3::new(1.0, 0.1, 1.0),
        epsilon = 1e-5
    );
    assert_relative_eq!(
        state.apply_to_position(&Vec3::new(2.0, 0.0, 1.0)),
        Vec3::new(0.0, 0.1, 1.0),
        epsilon = 1e-5
    );
}
