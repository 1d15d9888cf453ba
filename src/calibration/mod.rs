//! Spatial calibration of a tracking device against the VR headset.
//!
//! Two procedures write into a [`CalibrationStore`](crate::state::CalibrationStore):
//!
//! - [`points::PointCollector`] walks the user through 3–5 timed anchor points,
//!   capturing one headset/joint position pair per point, then fits a rigid
//!   transform with [`solver::solve_rigid_transform`].
//! - [`manual::ManualSession`] integrates joystick input into translation and
//!   yaw/pitch until the user confirms or aborts.
//!
//! Both are driven by a [`CommandQueue`] that is drained at every tick boundary,
//! and both report progress through an [`EventSink`](events::EventSink).

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::math::{Quat, Vec3};

pub mod events;
pub mod manual;
pub mod points;
pub mod solver;

pub use events::*;
pub use manual::*;
pub use points::*;
pub use solver::*;

/// Rotation followed by translation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Quat::identity(),
            translation: Vec3::zeros(),
        }
    }

    pub fn new(rotation: Quat, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Map a point from the target frame into the reference frame.
    pub fn apply(&self, point: &Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            rotation,
            translation: -(rotation * self.translation),
        }
    }
}

/// Persisted calibration of a single device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationState {
    pub is_calibrated: bool,
    /// `true` when produced by the point collector, `false` for manual
    pub is_auto_method: bool,
    pub rotation: Quat,
    pub translation: Vec3,
    /// Pivot the rotation is applied around; always zero for automatic calibration
    pub origin: Vec3,
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self {
            is_calibrated: false,
            is_auto_method: false,
            rotation: Quat::identity(),
            translation: Vec3::zeros(),
            origin: Vec3::zeros(),
        }
    }
}

impl CalibrationState {
    pub fn transform(&self) -> RigidTransform {
        RigidTransform::new(self.rotation, self.translation)
    }

    /// Map a device-space joint position into headset space.
    pub fn apply_to_position(&self, position: &Vec3) -> Vec3 {
        self.rotation * (position - self.origin) + self.translation + self.origin
    }

    pub fn apply_to_orientation(&self, orientation: &Quat) -> Quat {
        self.rotation * orientation
    }
}

/// Input-side signals fed into a running calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Commit the current calibration
    Confirm,
    /// Switch between translation and rotation adjustment
    SwapMode,
    /// Enable or disable fine-tune sensitivity
    SetFineTune(bool),
    /// Discard everything and restore the persisted calibration
    Abort,
}

/// How a calibration session ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionOutcome {
    Committed(CalibrationState),
    Aborted,
}

impl SessionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SessionOutcome::Committed(_))
    }
}

/// Commands drained from the queue at one tick boundary
#[derive(Debug, Default)]
pub struct PolledCommands {
    pub commands: Vec<SessionCommand>,
    /// Every sender has been dropped
    pub disconnected: bool,
}

/// Receiving end of the session command channel.
///
/// Sessions never block on it: [`CommandQueue::poll`] takes whatever has been
/// queued since the previous tick.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    rx: Receiver<SessionCommand>,
}

impl CommandQueue {
    pub fn new(rx: Receiver<SessionCommand>) -> Self {
        Self { rx }
    }

    /// Unbounded command channel
    pub fn channel() -> (Sender<SessionCommand>, Self) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (tx, Self::new(rx))
    }

    pub fn poll(&self) -> PolledCommands {
        let mut polled = PolledCommands::default();
        loop {
            match self.rx.try_recv() {
                Ok(command) => polled.commands.push(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    polled.disconnected = true;
                    break;
                }
            }
        }
        polled
    }
}

/// Fixed-interval pacing; the sleeps are the only suspension points of a session.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    interval: Duration,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn tick(&self) {
        tokio::time::sleep(self.interval).await;
    }

    pub async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
