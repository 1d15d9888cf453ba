//! Pose and controller inputs consumed by the calibration procedures.
//!
//! The calibration core never talks to the VR runtime or to device plugins
//! directly. It polls a [`PoseSource`] for the headset and joint positions and
//! a [`JoystickSource`] for the manual adjustment sticks, once per tick.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;

use crate::math::{Quat, Vec3};

/// Position and orientation in a single frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            orientation: Quat::identity(),
        }
    }
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

/// Which side of the calibration a sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleSource {
    /// Calibrated headset position
    Reference,
    /// Tracked device joint position
    Target,
}

/// A single captured position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub position: Vec3,
    pub source: SampleSource,
    pub captured_at: Instant,
}

impl PoseSample {
    pub fn capture(position: Vec3, source: SampleSource) -> Self {
        Self {
            position,
            source,
            captured_at: Instant::now(),
        }
    }
}

/// Two-axis stick readings, each axis in `[-1, 1]`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JoystickState {
    pub left: (f32, f32),
    pub right: (f32, f32),
}

impl JoystickState {
    pub fn new(left: (f32, f32), right: (f32, f32)) -> Self {
        Self { left, right }
    }
}

/// Supplier of headset and device poses in the shared playspace frame.
///
/// Implementations are expected to fall back to zero/identity when a device is
/// not currently visible; the calibration core does not check for that.
pub trait PoseSource {
    /// Calibrated headset pose (playspace frame).
    fn reference_pose(&self) -> Pose;

    /// Position of the calibration joint reported by the device.
    fn target_joint_position(&self, device_id: &str) -> Vec3;

    /// Current room-scale playspace rotation of the VR runtime.
    fn playspace_orientation(&self) -> Quat;

    /// Device-relative transform origin used as the manual calibration pivot.
    fn device_relative_origin(&self, device_id: &str) -> Vec3;
}

/// Supplier of the two manual-calibration sticks.
pub trait JoystickSource {
    fn joysticks(&self) -> JoystickState;
}

impl<T: PoseSource + ?Sized> PoseSource for &T {
    fn reference_pose(&self) -> Pose {
        (**self).reference_pose()
    }

    fn target_joint_position(&self, device_id: &str) -> Vec3 {
        (**self).target_joint_position(device_id)
    }

    fn playspace_orientation(&self) -> Quat {
        (**self).playspace_orientation()
    }

    fn device_relative_origin(&self, device_id: &str) -> Vec3 {
        (**self).device_relative_origin(device_id)
    }
}

impl<T: JoystickSource + ?Sized> JoystickSource for &T {
    fn joysticks(&self) -> JoystickState {
        (**self).joysticks()
    }
}

/// Express a raw headset pose in the playspace frame.
///
/// `position = inv(q_ps) * (p - t_ps)`, `orientation = inv(q_ps) * q`.
pub fn calibrated_headset_pose(raw: &Pose, playspace: &Pose) -> Pose {
    let inverse = playspace.orientation.inverse();
    Pose {
        position: inverse * (raw.position - playspace.position),
        orientation: inverse * raw.orientation,
    }
}

/// Latest known tracking snapshot
#[derive(Debug, Clone, Default)]
pub struct TrackingSnapshot {
    /// Raw headset pose as reported by the runtime
    pub raw_headset: Pose,
    /// Playspace origin (translation and orientation)
    pub playspace: Pose,
    /// Calibration joint position per device id
    pub joints: HashMap<String, Vec3>,
    /// Relative transform origin per device id
    pub origins: HashMap<String, Vec3>,
    pub joysticks: JoystickState,
}

/// Pose source shared between a tracking thread (writer) and a calibration
/// session (reader). Every read takes a consistent snapshot under the lock.
#[derive(Debug, Clone, Default)]
pub struct SharedPoseSource {
    inner: Arc<RwLock<TrackingSnapshot>>,
}

impl SharedPoseSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut TrackingSnapshot),
    {
        let mut snapshot = self.inner.write();
        f(&mut snapshot);
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        self.inner.read().clone()
    }
}

impl PoseSource for SharedPoseSource {
    fn reference_pose(&self) -> Pose {
        let snapshot = self.inner.read();
        calibrated_headset_pose(&snapshot.raw_headset, &snapshot.playspace)
    }

    fn target_joint_position(&self, device_id: &str) -> Vec3 {
        self.inner
            .read()
            .joints
            .get(device_id)
            .copied()
            .unwrap_or_else(Vec3::zeros)
    }

    fn playspace_orientation(&self) -> Quat {
        self.inner.read().playspace.orientation
    }

    fn device_relative_origin(&self, device_id: &str) -> Vec3 {
        self.inner
            .read()
            .origins
            .get(device_id)
            .copied()
            .unwrap_or_else(Vec3::zeros)
    }
}

impl JoystickSource for SharedPoseSource {
    fn joysticks(&self) -> JoystickState {
        self.inner.read().joysticks
    }
}
