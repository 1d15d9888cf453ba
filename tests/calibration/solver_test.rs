//! Tests for the rigid transform solver

use approx::assert_relative_eq;
use tracker_calibration::calibration::{solve_rigid_transform, RigidTransform};
use tracker_calibration::error::CalibrationError;
use tracker_calibration::math::{quat_from_yaw_pitch_roll, Vec3};

fn anchor_points() -> Vec<Vec3> {
    vec![
        Vec3::new(-0.7, 1.6, -0.2),
        Vec3::new(0.8, 1.8, 0.6),
        Vec3::new(-0.5, 1.7, 1.1),
        Vec3::new(0.3, 1.5, -0.9),
        Vec3::new(0.0, 1.9, 0.2),
    ]
}

#[test]
fn test_recovers_known_transform() {
    let truth = RigidTransform::new(
        quat_from_yaw_pitch_roll(1.1, 0.3, -0.2),
        Vec3::new(0.5, -1.0, 2.0),
    );
    let target = anchor_points();
    let reference: Vec<Vec3> = target.iter().map(|p| truth.apply(p)).collect();

    let fit = solve_rigid_transform(&reference, &target).expect("Solve failed");

    assert!(fit.transform.rotation.angle_to(&truth.rotation) < 1e-4);
    assert_relative_eq!(fit.transform.translation, truth.translation, epsilon = 1e-4);
    assert!(fit.rms_residual < 1e-4);
}

#[test]
fn test_identity_when_frames_coincide() {
    let points = anchor_points();

    let fit = solve_rigid_transform(&points[..3], &points[..3]).expect("Solve failed");

    assert!(fit.transform.rotation.angle() < 1e-4);
    assert_relative_eq!(fit.transform.translation, Vec3::zeros(), epsilon = 1e-5);
}

#[test]
fn test_unit_triangle_gives_identity() {
    let points = vec![
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
    ];

    let fit = solve_rigid_transform(&points, &points).expect("Solve failed");

    assert!(fit.transform.rotation.angle() < 1e-5);
    assert_relative_eq!(fit.transform.translation, Vec3::zeros(), epsilon = 1e-6);
    assert!(fit.rms_residual < 1e-6);
}

#[test]
fn test_mapped_targets_land_on_references() {
    let truth = RigidTransform::new(
        quat_from_yaw_pitch_roll(-2.4, 0.0, 0.0),
        Vec3::new(-0.3, 0.0, 0.9),
    );
    let target = anchor_points()[..4].to_vec();
    let reference: Vec<Vec3> = target.iter().map(|p| truth.apply(p)).collect();

    let fit = solve_rigid_transform(&reference, &target).expect("Solve failed");

    for (r, t) in reference.iter().zip(target.iter()) {
        assert_relative_eq!(fit.transform.apply(t), *r, epsilon = 1e-4);
    }
}

#[test]
fn test_mirrored_points_still_give_proper_rotation() {
    let target = anchor_points();
    let reference: Vec<Vec3> = target.iter().map(|p| Vec3::new(-p.x, p.y, p.z)).collect();

    let fit = solve_rigid_transform(&reference, &target).expect("Solve failed");

    let det = fit.transform.rotation.to_rotation_matrix().matrix().determinant();
    assert_relative_eq!(det, 1.0, epsilon = 1e-4);
    // A reflection cannot be matched by a rotation
    assert!(fit.rms_residual > 1e-2);
}

#[test]
fn test_residual_reflects_noise() {
    let truth = RigidTransform::new(quat_from_yaw_pitch_roll(0.4, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
    let target = anchor_points();
    let offsets = [0.01, -0.01, 0.005, -0.005, 0.0];
    let reference: Vec<Vec3> = target
        .iter()
        .zip(offsets.iter())
        .map(|(p, o)| truth.apply(p) + Vec3::new(*o, 0.0, -*o))
        .collect();

    let fit = solve_rigid_transform(&reference, &target).expect("Solve failed");

    assert!(fit.rms_residual > 1e-4);
    assert!(fit.rms_residual < 0.02);
    assert!(fit.transform.rotation.angle_to(&truth.rotation) < 0.05);
}

#[test]
fn test_rejects_too_few_pairs() {
    let points = anchor_points();
    let result = solve_rigid_transform(&points[..2], &points[..2]);
    assert!(matches!(result, Err(CalibrationError::PointCount(2))));
}

#[test]
fn test_rejects_mismatched_lengths() {
    let points = anchor_points();
    let result = solve_rigid_transform(&points[..4], &points[..3]);
    assert!(matches!(
        result,
        Err(CalibrationError::MismatchedSamples {
            reference: 4,
            target: 3
        })
    ));
}
