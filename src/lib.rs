//! Tracker Calibration Library
//!
//! Calibrates a body-tracking device's coordinate frame against the VR
//! headset, either automatically from a handful of timed anchor points or
//! manually with joystick adjustment, and keeps the per-device results in a
//! persistent store.

pub mod calibration;
pub mod config;
pub mod error;
pub mod math;
pub mod simulation;
pub mod state;
pub mod tracking;

// Re-export commonly used types
pub use calibration::{
    CalibrationEvent, CalibrationState, CommandQueue, EventSink, ManualSession, PointCollector,
    RigidTransform, SessionCommand, SessionOutcome,
};
pub use config::CalibrationConfig;
pub use error::{CalibrationError, CalibrationResult};
pub use state::{CalibrationStore, FileCalibrationStore, MemoryCalibrationStore};
pub use tracking::{JoystickSource, JoystickState, Pose, PoseSource, SharedPoseSource};
