use nalgebra::{Quaternion, UnitQuaternion, Vector3};

pub type Real = f32;

pub type Vec3 = Vector3<Real>;
pub type Quat = UnitQuaternion<Real>;

/// Rotation from yaw (about +Y), pitch (about +X) and roll (about +Z), in radians.
///
/// Composed as `yaw * pitch * roll`, so roll is applied first. This is the
/// `CreateFromYawPitchRoll` convention used by the tracking runtime.
pub fn quat_from_yaw_pitch_roll(yaw: Real, pitch: Real, roll: Real) -> Quat {
    let q_yaw = Quat::from_axis_angle(&Vec3::y_axis(), yaw);
    let q_pitch = Quat::from_axis_angle(&Vec3::x_axis(), pitch);
    let q_roll = Quat::from_axis_angle(&Vec3::z_axis(), roll);
    q_yaw * q_pitch * q_roll
}

/// Narrow a double-precision rotation back to the working precision.
pub fn quat_from_f64(q: &UnitQuaternion<f64>) -> Quat {
    Quat::new_normalize(Quaternion::new(
        q.w as Real,
        q.i as Real,
        q.j as Real,
        q.k as Real,
    ))
}

pub fn vec3_to_f64(v: &Vec3) -> Vector3<f64> {
    v.map(f64::from)
}

pub fn vec3_from_f64(v: &Vector3<f64>) -> Vec3 {
    v.map(|x| x as Real)
}

/// Norm of the raw quaternion coordinates; 1.0 for a valid rotation.
pub fn quat_norm(q: &Quat) -> Real {
    q.as_ref().coords.norm()
}

pub fn is_finite_vec(v: &Vec3) -> bool {
    v.iter().all(|x| x.is_finite())
}

pub fn is_finite_quat(q: &Quat) -> bool {
    q.as_ref().coords.iter().all(|x| x.is_finite())
}
