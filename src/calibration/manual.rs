//! Joystick-driven manual calibration.
//!
//! The session alternates between a translation sub-mode and a rotation
//! sub-mode on every `SwapMode`, polling the sticks every few milliseconds and
//! writing the live result into the store so a preview can follow it. Only
//! yaw and pitch are adjustable; roll stays zero.

use tracing::{debug, info, warn};

use super::events::{EventSink, Instruction, SoundCue};
use super::{CalibrationState, CommandQueue, SessionCommand, SessionOutcome, Ticker};
use crate::config::ManualCalibrationSettings;
use crate::error::CalibrationResult;
use crate::math::{quat_from_yaw_pitch_roll, Quat, Vec3};
use crate::state::CalibrationStore;
use crate::tracking::{JoystickSource, JoystickState, PoseSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubMode {
    #[default]
    Translation,
    Rotation,
}

/// Transient state of one manual session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionState {
    /// Cleared by `Abort` (or by losing every command sender)
    pub pending_commit: bool,
    pub confirmed: bool,
    pub mode_swap_requested: bool,
    pub fine_tune_enabled: bool,
    pub current_sub_mode: SubMode,
    pub accumulated_yaw: f32,
    pub accumulated_pitch: f32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            pending_commit: true,
            confirmed: false,
            mode_swap_requested: false,
            fine_tune_enabled: false,
            current_sub_mode: SubMode::Translation,
            accumulated_yaw: 0.0,
            accumulated_pitch: 0.0,
        }
    }
}

impl SessionState {
    fn phase_should_end(&self) -> bool {
        !self.pending_commit || self.confirmed || self.mode_swap_requested
    }
}

/// Translation delta for one poll: `(left.x, right.y, -left.y) * multiplier`,
/// un-rotated by the playspace orientation.
pub fn translation_delta(sticks: &JoystickState, multiplier: f32, playspace: &Quat) -> Vec3 {
    let raw = Vec3::new(sticks.left.0, sticks.right.1, -sticks.left.1) * multiplier;
    playspace.inverse() * raw
}

/// Interactive calibration of one device
pub struct ManualSession {
    device_id: String,
    settings: ManualCalibrationSettings,
    commands: CommandQueue,
    events: EventSink,
    state: SessionState,
}

impl ManualSession {
    pub fn new(
        device_id: impl Into<String>,
        settings: ManualCalibrationSettings,
        commands: CommandQueue,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            settings,
            commands,
            events: EventSink::disabled(),
            state: SessionState::default(),
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Run until confirmed or aborted.
    pub async fn run<P, J, S>(
        &mut self,
        poses: &P,
        input: &J,
        store: &mut S,
    ) -> CalibrationResult<SessionOutcome>
    where
        P: PoseSource + ?Sized,
        J: JoystickSource + ?Sized,
        S: CalibrationStore,
    {
        info!("Starting manual calibration of '{}'", self.device_id);
        self.state = SessionState::default();
        self.events.sound(SoundCue::CalibrationStart);

        let ticker = Ticker::new(self.settings.poll_interval());
        let settle = self.settings.mode_swap_settle();

        let mut live = store.get(&self.device_id);
        live.is_auto_method = false;
        live.is_calibrated = true;
        live.rotation = Quat::identity();
        live.translation = Vec3::zeros();
        store.set(&self.device_id, live);

        let mut first_pass = true;

        while !self.state.confirmed {
            self.enter(SubMode::Translation);
            loop {
                self.poll_commands();
                if self.state.phase_should_end() {
                    break;
                }
                let multiplier = self.settings.translation_multiplier(self.state.fine_tune_enabled);
                let delta =
                    translation_delta(&input.joysticks(), multiplier, &poses.playspace_orientation());
                live.translation += delta;
                store.set(&self.device_id, live);
                ticker.tick().await;
            }
            self.state.mode_swap_requested = false;

            if !self.state.pending_commit {
                break;
            }
            if !self.state.confirmed {
                self.events.sound(SoundCue::ModeSwap);
            }

            if first_pass {
                live.origin = poses.device_relative_origin(&self.device_id);
                store.set(&self.device_id, live);
                debug!("Manual calibration origin for '{}': {:?}", self.device_id, live.origin);
                first_pass = false;
            }
            ticker.pause(settle).await;
            self.poll_after_settle();

            if !self.state.confirmed && self.state.pending_commit {
                self.enter(SubMode::Rotation);
                loop {
                    self.poll_commands();
                    if self.state.phase_should_end() {
                        break;
                    }
                    let sticks = input.joysticks();
                    let step = self.settings.rotation_step
                        * self.settings.rotation_multiplier(self.state.fine_tune_enabled);
                    self.state.accumulated_yaw += sticks.left.0 * step;
                    self.state.accumulated_pitch += sticks.right.1 * step;
                    live.rotation = quat_from_yaw_pitch_roll(
                        self.state.accumulated_yaw,
                        self.state.accumulated_pitch,
                        0.0,
                    );
                    store.set(&self.device_id, live);
                    ticker.tick().await;
                }
                self.state.mode_swap_requested = false;

                ticker.pause(settle).await;
                self.poll_after_settle();
                if self.state.pending_commit && !self.state.confirmed {
                    self.events.sound(SoundCue::ModeSwap);
                }
            }

            if !self.state.pending_commit {
                break;
            }
        }

        if !self.state.pending_commit {
            return self.roll_back(store, live).await;
        }

        store.set(&self.device_id, live);
        if let Err(e) = store.persist().await {
            warn!("Saving calibration of '{}' failed: {}", self.device_id, e);
            self.roll_back(store, live).await?;
            return Err(e.into());
        }
        info!(
            "Manual calibration of '{}' committed: t = {:?}, yaw = {:.4}, pitch = {:.4}",
            self.device_id, live.translation, self.state.accumulated_yaw, self.state.accumulated_pitch
        );
        self.events.sound(SoundCue::CalibrationComplete);
        self.events.instruction(Instruction::Done);
        Ok(SessionOutcome::Committed(live))
    }

    async fn roll_back<S>(
        &mut self,
        store: &mut S,
        mut live: CalibrationState,
    ) -> CalibrationResult<SessionOutcome>
    where
        S: CalibrationStore,
    {
        warn!("Manual calibration of '{}' rolled back to saved calibration", self.device_id);
        live.is_calibrated = false;
        store.set(&self.device_id, live);
        store.reload().await?;
        self.events.sound(SoundCue::CalibrationAborted);
        self.events.instruction(Instruction::Aborted);
        Ok(SessionOutcome::Aborted)
    }

    /// Poll after a settle pause; a swap queued while settling is dropped
    fn poll_after_settle(&mut self) {
        self.poll_commands();
        if self.state.mode_swap_requested {
            debug!("Dropping mode swap received while settling");
            self.state.mode_swap_requested = false;
        }
    }

    fn enter(&mut self, mode: SubMode) {
        self.state.current_sub_mode = mode;
        self.events.instruction(match mode {
            SubMode::Translation => Instruction::AdjustTranslation,
            SubMode::Rotation => Instruction::AdjustRotation,
        });
    }

    fn poll_commands(&mut self) {
        let polled = self.commands.poll();
        for command in polled.commands {
            match command {
                SessionCommand::Confirm => self.state.confirmed = true,
                SessionCommand::SwapMode => self.state.mode_swap_requested = true,
                SessionCommand::SetFineTune(enabled) => self.state.fine_tune_enabled = enabled,
                SessionCommand::Abort => self.state.pending_commit = false,
            }
        }
        if polled.disconnected && !self.state.confirmed {
            // Nobody can confirm any more
            self.state.pending_commit = false;
        }
    }
}
