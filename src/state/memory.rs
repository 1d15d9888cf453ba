use anyhow::Result;
use std::collections::BTreeMap;

use crate::calibration::CalibrationState;
use crate::config::{MAX_CALIBRATION_POINTS, MIN_CALIBRATION_POINTS};
use crate::state::CalibrationStore;

/// In-memory store; `persist` snapshots the live map and `reload` restores it.
#[derive(Debug, Clone)]
pub struct MemoryCalibrationStore {
    live: BTreeMap<String, CalibrationState>,
    persisted: BTreeMap<String, CalibrationState>,
    points_number: usize,
    persist_count: usize,
}

impl Default for MemoryCalibrationStore {
    fn default() -> Self {
        Self {
            live: BTreeMap::new(),
            persisted: BTreeMap::new(),
            points_number: MIN_CALIBRATION_POINTS,
            persist_count: 0,
        }
    }
}

impl MemoryCalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saved anchor point count, clamped to the supported range
    pub fn with_points_number(mut self, points: usize) -> Self {
        self.points_number = points.clamp(MIN_CALIBRATION_POINTS, MAX_CALIBRATION_POINTS);
        self
    }

    /// Seed a device as if it had been persisted earlier
    pub fn with_persisted(mut self, device_id: &str, state: CalibrationState) -> Self {
        self.live.insert(device_id.to_string(), state);
        self.persisted.insert(device_id.to_string(), state);
        self
    }

    pub fn persisted(&self, device_id: &str) -> CalibrationState {
        self.persisted.get(device_id).copied().unwrap_or_default()
    }

    /// Number of successful `persist` calls
    pub fn persist_count(&self) -> usize {
        self.persist_count
    }
}

impl CalibrationStore for MemoryCalibrationStore {
    fn get(&self, device_id: &str) -> CalibrationState {
        self.live.get(device_id).copied().unwrap_or_default()
    }

    fn set(&mut self, device_id: &str, state: CalibrationState) {
        self.live.insert(device_id.to_string(), state);
    }

    fn points_number(&self) -> usize {
        self.points_number
    }

    async fn persist(&mut self) -> Result<()> {
        self.persisted = self.live.clone();
        self.persist_count += 1;
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        self.live = self.persisted.clone();
        Ok(())
    }
}
