use crossbeam_channel::{Receiver, Sender};

use crate::math::Vec3;

/// Text the surrounding UI shows while a calibration runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Move to the next anchor position (1-based point index)
    Move { point: usize, total: usize },
    /// Hold still at the current anchor position
    StandStill { point: usize, total: usize },
    Captured,
    AdjustTranslation,
    AdjustRotation,
    Done,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    CalibrationStart,
    CalibrationTick,
    PointCaptured,
    ModeSwap,
    CalibrationComplete,
    CalibrationAborted,
}

/// Advisory notifications; dropping them never affects the calibration result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationEvent {
    Instruction(Instruction),
    /// Countdown label, `None` once the procedure is over
    Countdown(Option<u32>),
    Sound(SoundCue),
    /// A (reference, target) pair has been captured for a 0-based point index
    PointCaptured {
        index: usize,
        reference: Vec3,
        target: Vec3,
    },
}

/// Optional event channel. Sends never block and never fail the caller.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<CalibrationEvent>>,
}

impl EventSink {
    pub fn new(tx: Sender<CalibrationEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Unbounded sink plus the receiver end for the UI
    pub fn channel() -> (Self, Receiver<CalibrationEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: CalibrationEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.try_send(event);
        }
    }

    pub fn instruction(&self, instruction: Instruction) {
        self.emit(CalibrationEvent::Instruction(instruction));
    }

    pub fn countdown(&self, value: Option<u32>) {
        self.emit(CalibrationEvent::Countdown(value));
    }

    pub fn sound(&self, cue: SoundCue) {
        self.emit(CalibrationEvent::Sound(cue));
    }
}
