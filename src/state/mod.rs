//! Calibration Result Store
//!
//! Holds one [`CalibrationState`] per device id. Sessions write live values
//! with [`CalibrationStore::set`], then either [`persist`](CalibrationStore::persist)
//! on commit or [`reload`](CalibrationStore::reload) on abort, which throws the
//! live values away and rereads the last persisted copy.
//!
//! - [`MemoryCalibrationStore`]: in-process store with a persisted snapshot
//! - [`FileCalibrationStore`]: JSON document on disk with atomic writes,
//!   rotating backups and a primary/backup/default recovery chain

use anyhow::Result;
use tracing::info;

use crate::calibration::CalibrationState;
use crate::config::StorageSettings;

pub mod memory;
pub mod recovery;
pub mod schema;
pub mod serialization;
pub mod storage;
pub mod validation;

pub use memory::*;
pub use recovery::*;
pub use schema::*;
pub use serialization::*;
pub use storage::*;
pub use validation::*;

/// Error types for state persistence operations
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Storage operation failed: {0}")]
    StorageError(#[from] std::io::Error),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("State file corrupted: {0}")]
    CorruptedState(String),
}

/// Per-device calibration storage used by the calibration sessions.
///
/// A session borrows the store mutably for its whole run, so only one
/// session can write at a time.
#[allow(async_fn_in_trait)]
pub trait CalibrationStore {
    /// Current (live) calibration of a device; defaults when unknown
    fn get(&self, device_id: &str) -> CalibrationState;

    fn set(&mut self, device_id: &str, state: CalibrationState);

    /// Anchor point count saved alongside the calibrations
    fn points_number(&self) -> usize;

    /// Make the live values durable
    async fn persist(&mut self) -> Result<()>;

    /// Discard the live values and reread the durable copy
    async fn reload(&mut self) -> Result<()>;
}

/// Store backed by a calibration document on disk
#[derive(Debug)]
pub struct FileCalibrationStore {
    settings: CalibrationSettings,
    storage: StateStorage,
    recovery: StateRecovery,
}

impl FileCalibrationStore {
    /// Open the store, recovering from backups or defaults when needed
    pub async fn open(storage: StateStorage) -> Result<Self> {
        let recovery = StateRecovery::new();
        let settings = recovery.load_settings(&storage).await?;
        info!(
            "✅ Calibration store opened with {} devices",
            settings.devices.len()
        );
        Ok(Self {
            settings,
            storage,
            recovery,
        })
    }

    pub async fn from_settings(settings: &StorageSettings) -> Result<Self> {
        let storage = StateStorage::new(StorageConfig::from_settings(settings))?;
        Self::open(storage).await
    }

    pub fn set_points_number(&mut self, points: usize) {
        self.settings.points_number = points;
        self.settings.sanitize();
    }
}

impl CalibrationStore for FileCalibrationStore {
    fn get(&self, device_id: &str) -> CalibrationState {
        self.settings.device(device_id)
    }

    fn set(&mut self, device_id: &str, state: CalibrationState) {
        self.settings.set_device(device_id, state);
    }

    fn points_number(&self) -> usize {
        self.settings.points_number
    }

    async fn persist(&mut self) -> Result<()> {
        self.settings.touch();
        self.storage.save_settings(&self.settings).await
    }

    async fn reload(&mut self) -> Result<()> {
        self.settings = self.recovery.load_settings(&self.storage).await?;
        Ok(())
    }
}
