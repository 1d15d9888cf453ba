//! Least-squares rigid alignment of two point sets.
//!
//! Finds `R`, `t` minimizing `Σ |R·target_k + t − reference_k|²` with the
//! Kabsch algorithm: center both sets on their centroids, take the SVD of the
//! 3×3 cross-covariance and force a proper rotation (det = +1).
//!
//! Collinear or duplicated points are not detected. They produce a valid
//! rotation that is meaningless about the degenerate axis.

use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use tracing::debug;

use super::RigidTransform;
use crate::error::{CalibrationError, CalibrationResult};
use crate::math::{quat_from_f64, vec3_from_f64, vec3_to_f64, Vec3};

/// Smallest number of pairs that pins down a rotation
pub const MIN_POINT_PAIRS: usize = 3;

/// Solved transform together with its fit quality
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidFit {
    pub transform: RigidTransform,
    /// Root-mean-square distance between mapped targets and references
    pub rms_residual: f32,
}

/// Rigid transform mapping `target` points onto `reference` points.
pub fn solve_rigid_transform(reference: &[Vec3], target: &[Vec3]) -> CalibrationResult<RigidFit> {
    if reference.len() != target.len() {
        return Err(CalibrationError::MismatchedSamples {
            reference: reference.len(),
            target: target.len(),
        });
    }
    if reference.len() < MIN_POINT_PAIRS {
        return Err(CalibrationError::PointCount(reference.len()));
    }

    let reference: Vec<Vector3<f64>> = reference.iter().map(vec3_to_f64).collect();
    let target: Vec<Vector3<f64>> = target.iter().map(vec3_to_f64).collect();

    let n = reference.len() as f64;
    let c_ref = reference.iter().fold(Vector3::<f64>::zeros(), |acc, p| acc + p) / n;
    let c_tgt = target.iter().fold(Vector3::<f64>::zeros(), |acc, p| acc + p) / n;

    let mut h = Matrix3::<f64>::zeros();
    for (r, t) in reference.iter().zip(target.iter()) {
        h += (t - c_tgt) * (r - c_ref).transpose();
    }

    let svd = h.svd(true, true);
    let u = svd
        .u
        .ok_or_else(|| CalibrationError::Solver("SVD did not produce U".to_string()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| CalibrationError::Solver("SVD did not produce V^T".to_string()))?;
    let v = v_t.transpose();

    let d = (v * u.transpose()).determinant().signum();
    let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d));
    let r = v * correction * u.transpose();

    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));
    let translation = c_ref - rotation * c_tgt;

    let squared: f64 = reference
        .iter()
        .zip(target.iter())
        .map(|(r, t)| (rotation * t + translation - r).norm_squared())
        .sum();
    let rms_residual = (squared / n).sqrt() as f32;

    debug!(
        "Rigid fit over {} pairs, rms residual {:.6}",
        reference.len(),
        rms_residual
    );

    Ok(RigidFit {
        transform: RigidTransform::new(quat_from_f64(&rotation), vec3_from_f64(&translation)),
        rms_residual,
    })
}
