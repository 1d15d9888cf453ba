//! Point-based automatic calibration.
//!
//! For every anchor point the user gets a `Moving` countdown to walk to a new
//! spot, then a `Standing` countdown during which one headset/joint position
//! pair is captured (at countdown value 1). Commands are drained at every tick
//! boundary; an abort discards the captured points and reloads the persisted
//! calibration.

use tracing::{debug, info, warn};

use super::events::{CalibrationEvent, EventSink, Instruction, SoundCue};
use super::solver::{solve_rigid_transform, RigidFit};
use super::{CalibrationState, CommandQueue, SessionCommand, SessionOutcome, Ticker};
use crate::config::{AutoCalibrationSettings, MAX_CALIBRATION_POINTS, MIN_CALIBRATION_POINTS};
use crate::error::{CalibrationError, CalibrationResult};
use crate::math::Vec3;
use crate::state::CalibrationStore;
use crate::tracking::{PoseSample, PoseSource, SampleSource};

/// Where the collector currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorPhase {
    Idle,
    LeadIn,
    Moving { point: usize },
    Standing { point: usize },
    Settling { point: usize },
    Solving,
    Finished,
}

/// Captured (reference, target) pairs, at most the configured point count
#[derive(Debug, Clone)]
pub struct CalibrationPointSet {
    capacity: usize,
    pairs: Vec<(PoseSample, PoseSample)>,
}

fn check_point_count(points: usize) -> CalibrationResult<()> {
    if !(MIN_CALIBRATION_POINTS..=MAX_CALIBRATION_POINTS).contains(&points) {
        return Err(CalibrationError::PointCount(points));
    }
    Ok(())
}

impl CalibrationPointSet {
    pub fn new(capacity: usize) -> CalibrationResult<Self> {
        check_point_count(capacity)?;
        Ok(Self {
            capacity,
            pairs: Vec::with_capacity(capacity),
        })
    }

    /// Append a pair; returns `false` once the set is full.
    pub fn push(&mut self, reference: PoseSample, target: PoseSample) -> bool {
        if self.is_complete() {
            return false;
        }
        self.pairs.push((reference, target));
        true
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_complete(&self) -> bool {
        self.pairs.len() == self.capacity
    }

    pub fn reference_positions(&self) -> Vec<Vec3> {
        self.pairs.iter().map(|(r, _)| r.position).collect()
    }

    pub fn target_positions(&self) -> Vec<Vec3> {
        self.pairs.iter().map(|(_, t)| t.position).collect()
    }

    /// Fit the transform mapping target positions onto reference positions.
    pub fn solve(self) -> CalibrationResult<RigidFit> {
        if !self.is_complete() {
            return Err(CalibrationError::PointCount(self.pairs.len()));
        }
        solve_rigid_transform(&self.reference_positions(), &self.target_positions())
    }
}

/// Automatic calibration of one device
pub struct PointCollector {
    device_id: String,
    settings: AutoCalibrationSettings,
    commands: CommandQueue,
    events: EventSink,
    phase: CollectorPhase,
    abort_requested: bool,
}

impl PointCollector {
    pub fn new(
        device_id: impl Into<String>,
        settings: AutoCalibrationSettings,
        commands: CommandQueue,
    ) -> CalibrationResult<Self> {
        if let Some(points) = settings.points {
            check_point_count(points)?;
        }
        if settings.countdown_from < 1 {
            return Err(CalibrationError::InvalidConfig(
                "countdown_from must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            device_id: device_id.into(),
            settings,
            commands,
            events: EventSink::disabled(),
            phase: CollectorPhase::Idle,
            abort_requested: false,
        })
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn phase(&self) -> CollectorPhase {
        self.phase
    }

    /// Run the whole procedure and write the result into `store`.
    pub async fn run<P, S>(&mut self, poses: &P, store: &mut S) -> CalibrationResult<SessionOutcome>
    where
        P: PoseSource + ?Sized,
        S: CalibrationStore,
    {
        // The configured count wins over the one saved with the calibrations
        let total = self.settings.points.unwrap_or_else(|| store.points_number());
        check_point_count(total)?;
        info!(
            "Starting automatic calibration of '{}' over {} points",
            self.device_id, total
        );
        self.events.sound(SoundCue::CalibrationStart);

        let mut live = store.get(&self.device_id);
        live.is_auto_method = true;
        live.is_calibrated = false;
        live.origin = Vec3::zeros();
        store.set(&self.device_id, live);

        let mut points = CalibrationPointSet::new(total)?;
        let aborted = self.collect(poses, &mut points, total).await;

        if aborted {
            return self.roll_back(store, live).await;
        }

        self.phase = CollectorPhase::Solving;
        let fit = match points.solve() {
            Ok(fit) => fit,
            Err(e) => {
                warn!("Automatic calibration of '{}' failed: {}", self.device_id, e);
                self.roll_back(store, live).await?;
                return Err(e);
            }
        };

        info!(
            "Automatic calibration of '{}' concluded: t = {:?}, R = {:?}, rms = {:.5}",
            self.device_id,
            fit.transform.translation,
            fit.transform.rotation,
            fit.rms_residual
        );

        let committed = CalibrationState {
            is_calibrated: true,
            is_auto_method: true,
            rotation: fit.transform.rotation,
            translation: fit.transform.translation,
            origin: Vec3::zeros(),
        };
        store.set(&self.device_id, committed);
        if let Err(e) = store.persist().await {
            warn!("Saving calibration of '{}' failed: {}", self.device_id, e);
            self.roll_back(store, committed).await?;
            return Err(e.into());
        }

        self.phase = CollectorPhase::Finished;
        self.events.sound(SoundCue::CalibrationComplete);
        self.events.countdown(None);
        self.events.instruction(Instruction::Done);
        Ok(SessionOutcome::Committed(committed))
    }

    /// Capture one pair per point. Returns `true` when aborted.
    async fn collect<P>(&mut self, poses: &P, points: &mut CalibrationPointSet, total: usize) -> bool
    where
        P: PoseSource + ?Sized,
    {
        let ticker = Ticker::new(self.settings.tick_interval());
        let countdown_from = self.settings.countdown_from;

        self.phase = CollectorPhase::LeadIn;
        ticker.pause(self.settings.lead_in()).await;
        if self.should_abort() {
            return true;
        }

        for point in 0..total {
            self.phase = CollectorPhase::Moving { point };
            self.events.instruction(Instruction::Move {
                point: point + 1,
                total,
            });

            for tick in (0..=countdown_from).rev() {
                if self.should_abort() {
                    return true;
                }
                self.events.countdown(Some(tick));
                if tick > 0 {
                    self.events.sound(SoundCue::CalibrationTick);
                }
                ticker.tick().await;
                if self.should_abort() {
                    return true;
                }
            }

            self.phase = CollectorPhase::Standing { point };
            self.events.instruction(Instruction::StandStill {
                point: point + 1,
                total,
            });

            for tick in (0..=countdown_from).rev() {
                if self.should_abort() {
                    return true;
                }
                self.events.countdown(Some(tick));
                if tick > 0 {
                    self.events.sound(SoundCue::CalibrationTick);
                }

                match tick {
                    1 => self.capture(poses, point, points),
                    0 => self.events.instruction(Instruction::Captured),
                    _ => {}
                }

                ticker.tick().await;
                if self.should_abort() {
                    return true;
                }
            }

            self.phase = CollectorPhase::Settling { point };
            self.events.sound(SoundCue::PointCaptured);
            ticker.pause(self.settings.point_settle()).await;
            if self.should_abort() {
                return true;
            }
        }

        false
    }

    fn capture<P>(&self, poses: &P, point: usize, points: &mut CalibrationPointSet)
    where
        P: PoseSource + ?Sized,
    {
        let reference = PoseSample::capture(poses.reference_pose().position, SampleSource::Reference);
        let target = PoseSample::capture(
            poses.target_joint_position(&self.device_id),
            SampleSource::Target,
        );

        debug!(
            "Captured point {}: reference {:?}, target {:?}",
            point + 1,
            reference.position,
            target.position
        );

        if points.push(reference, target) {
            self.events.emit(CalibrationEvent::PointCaptured {
                index: point,
                reference: reference.position,
                target: target.position,
            });
        }
    }

    /// Drain queued commands; only `Abort` matters here and it is sticky.
    fn should_abort(&mut self) -> bool {
        for command in self.commands.poll().commands {
            match command {
                SessionCommand::Abort => self.abort_requested = true,
                other => debug!("Ignoring {:?} during automatic calibration", other),
            }
        }
        self.abort_requested
    }

    async fn roll_back<S>(&mut self, store: &mut S, mut live: CalibrationState) -> CalibrationResult<SessionOutcome>
    where
        S: CalibrationStore,
    {
        warn!("Automatic calibration of '{}' rolled back to saved calibration", self.device_id);
        live.is_calibrated = false;
        store.set(&self.device_id, live);
        store.reload().await?;

        self.phase = CollectorPhase::Finished;
        self.events.sound(SoundCue::CalibrationAborted);
        self.events.countdown(None);
        self.events.instruction(Instruction::Aborted);
        Ok(SessionOutcome::Aborted)
    }
}
