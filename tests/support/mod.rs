//! Test pose and joystick sources

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracker_calibration::calibration::{CalibrationState, RigidTransform, SessionCommand};
use tracker_calibration::math::{quat_from_yaw_pitch_roll, Quat, Vec3};
use tracker_calibration::simulation::SimulatedRig;
use tracker_calibration::state::{CalibrationStore, MemoryCalibrationStore};
use tracker_calibration::tracking::{JoystickSource, JoystickState, Pose, PoseSource};

pub const DEVICE: &str = "KINECT-TEST";

/// Transform used by most collector tests
pub fn sample_transform() -> RigidTransform {
    RigidTransform::new(
        quat_from_yaw_pitch_roll(0.7, -0.2, 0.1),
        Vec3::new(0.4, -0.25, 1.3),
    )
}

/// A calibration as it would look after an earlier successful run
pub fn saved_state() -> CalibrationState {
    CalibrationState {
        is_calibrated: true,
        is_auto_method: true,
        rotation: quat_from_yaw_pitch_roll(0.3, 0.0, 0.0),
        translation: Vec3::new(0.1, 0.2, 0.3),
        origin: Vec3::zeros(),
    }
}

/// Fixed poses with a counter on origin lookups
pub struct StaticPoses {
    pub playspace: Quat,
    pub origin: Vec3,
    origin_reads: AtomicUsize,
}

impl StaticPoses {
    pub fn new(playspace: Quat, origin: Vec3) -> Self {
        Self {
            playspace,
            origin,
            origin_reads: AtomicUsize::new(0),
        }
    }

    pub fn origin_reads(&self) -> usize {
        self.origin_reads.load(Ordering::SeqCst)
    }
}

impl Default for StaticPoses {
    fn default() -> Self {
        Self::new(Quat::identity(), Vec3::zeros())
    }
}

impl PoseSource for StaticPoses {
    fn reference_pose(&self) -> Pose {
        Pose::default()
    }

    fn target_joint_position(&self, _device_id: &str) -> Vec3 {
        Vec3::zeros()
    }

    fn playspace_orientation(&self) -> Quat {
        self.playspace
    }

    fn device_relative_origin(&self, _device_id: &str) -> Vec3 {
        self.origin_reads.fetch_add(1, Ordering::SeqCst);
        self.origin
    }
}

/// What happens when the stick poll count reaches a given value
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Sticks(JoystickState),
    Command(SessionCommand),
}

/// Joystick source that plays a script keyed on its own read count.
///
/// Read `n` (1-based) first applies every step scheduled for `n`, then returns
/// the current sticks. A command sent on read `n` is seen by the session at
/// its next poll, so exactly `n` reads contribute to the current phase.
pub struct ScriptedInput {
    reads: AtomicUsize,
    sticks: Mutex<JoystickState>,
    script: Vec<(usize, Step)>,
    tx: Sender<SessionCommand>,
}

impl ScriptedInput {
    pub fn new(tx: Sender<SessionCommand>, sticks: JoystickState, script: Vec<(usize, Step)>) -> Self {
        Self {
            reads: AtomicUsize::new(0),
            sticks: Mutex::new(sticks),
            script,
            tx,
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl JoystickSource for ScriptedInput {
    fn joysticks(&self) -> JoystickState {
        let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        let mut sticks = self.sticks.lock();
        for (at, step) in &self.script {
            if *at != read {
                continue;
            }
            match step {
                Step::Sticks(state) => *sticks = *state,
                Step::Command(command) => {
                    let _ = self.tx.send(*command);
                }
            }
        }
        *sticks
    }
}

/// Simulated rig that queues an `Abort` on the given joint read
pub struct AbortingRig {
    rig: SimulatedRig,
    abort_on: usize,
    joint_reads: AtomicUsize,
    tx: Sender<SessionCommand>,
}

impl AbortingRig {
    pub fn new(rig: SimulatedRig, abort_on: usize, tx: Sender<SessionCommand>) -> Self {
        Self {
            rig,
            abort_on,
            joint_reads: AtomicUsize::new(0),
            tx,
        }
    }

    pub fn joint_reads(&self) -> usize {
        self.joint_reads.load(Ordering::SeqCst)
    }
}

impl PoseSource for AbortingRig {
    fn reference_pose(&self) -> Pose {
        self.rig.reference_pose()
    }

    fn target_joint_position(&self, device_id: &str) -> Vec3 {
        let read = self.joint_reads.fetch_add(1, Ordering::SeqCst) + 1;
        if read == self.abort_on {
            let _ = self.tx.send(SessionCommand::Abort);
        }
        self.rig.target_joint_position(device_id)
    }

    fn playspace_orientation(&self) -> Quat {
        self.rig.playspace_orientation()
    }

    fn device_relative_origin(&self, device_id: &str) -> Vec3 {
        self.rig.device_relative_origin(device_id)
    }
}

/// Memory store whose `persist` always fails, as with a full disk
pub struct FailingStore {
    pub inner: MemoryCalibrationStore,
}

impl FailingStore {
    pub fn new(inner: MemoryCalibrationStore) -> Self {
        Self { inner }
    }
}

impl CalibrationStore for FailingStore {
    fn get(&self, device_id: &str) -> CalibrationState {
        self.inner.get(device_id)
    }

    fn set(&mut self, device_id: &str, state: CalibrationState) {
        self.inner.set(device_id, state);
    }

    fn points_number(&self) -> usize {
        self.inner.points_number()
    }

    async fn persist(&mut self) -> anyhow::Result<()> {
        anyhow::bail!("No space left on device")
    }

    async fn reload(&mut self) -> anyhow::Result<()> {
        self.inner.reload().await
    }
}
