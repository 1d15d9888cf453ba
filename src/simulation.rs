//! Synthetic tracking rig
//!
//! A headset that wanders along a smooth 3D path and a tracking device that
//! sees the headset through a known rigid offset. Used by the simulation
//! binary and by the integration tests as a noiseless pose source.

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::calibration::RigidTransform;
use crate::math::{Quat, Vec3};
use crate::tracking::{calibrated_headset_pose, JoystickSource, JoystickState, Pose, PoseSource};

pub struct SimulatedRig {
    /// Ground-truth transform from device space to headset (playspace) space
    device_to_headset: RigidTransform,
    playspace: Pose,
    origin: Vec3,
    start: Instant,
    joysticks: Mutex<JoystickState>,
}

impl SimulatedRig {
    pub fn new(device_to_headset: RigidTransform) -> Self {
        Self {
            device_to_headset,
            playspace: Pose::default(),
            origin: Vec3::zeros(),
            start: Instant::now(),
            joysticks: Mutex::new(JoystickState::default()),
        }
    }

    pub fn with_playspace(mut self, playspace: Pose) -> Self {
        self.playspace = playspace;
        self
    }

    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    pub fn ground_truth(&self) -> RigidTransform {
        self.device_to_headset
    }

    pub fn set_joysticks(&self, state: JoystickState) {
        *self.joysticks.lock() = state;
    }

    /// Headset position in the playspace frame at `t` seconds
    pub fn headset_path(t: f32) -> Vec3 {
        Vec3::new(
            0.8 * (0.37 * t).cos(),
            1.6 + 0.25 * (1.3 * t).sin(),
            0.6 * (0.5 * t).sin(),
        )
    }

    fn elapsed_secs(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    fn raw_headset(&self) -> Pose {
        let local = Self::headset_path(self.elapsed_secs());
        Pose::new(
            self.playspace.orientation * local + self.playspace.position,
            self.playspace.orientation,
        )
    }
}

impl PoseSource for SimulatedRig {
    fn reference_pose(&self) -> Pose {
        calibrated_headset_pose(&self.raw_headset(), &self.playspace)
    }

    fn target_joint_position(&self, _device_id: &str) -> Vec3 {
        let headset = self.reference_pose().position;
        self.device_to_headset.inverse().apply(&headset)
    }

    fn playspace_orientation(&self) -> Quat {
        self.playspace.orientation
    }

    fn device_relative_origin(&self, _device_id: &str) -> Vec3 {
        self.origin
    }
}

impl JoystickSource for SimulatedRig {
    fn joysticks(&self) -> JoystickState {
        *self.joysticks.lock()
    }
}
