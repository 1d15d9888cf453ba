//! Loading with fallbacks
//!
//! A missing document means a fresh store. An unreadable one is replaced by
//! the newest backup that still validates, or by defaults when none does.

use anyhow::Result;
use tracing::{info, warn};

use crate::state::{CalibrationSettings, StateStorage};

/// Fallback chain used when opening or reloading a file store
#[derive(Debug, Clone)]
pub struct StateRecovery {
    /// Maximum number of backups tried before falling back to defaults
    pub max_attempts: usize,
}

impl StateRecovery {
    pub fn new() -> Self {
        Self { max_attempts: 3 }
    }

    /// Load the document, falling back to backups and finally to defaults
    pub async fn load_settings(&self, storage: &StateStorage) -> Result<CalibrationSettings> {
        if !storage.state_exists() {
            info!("No saved calibration yet, starting from defaults");
            return Ok(CalibrationSettings::default());
        }

        match storage.load_settings().await {
            Ok(settings) => return Ok(settings),
            Err(e) => warn!("Primary calibration load failed: {}", e),
        }

        let backups = storage.list_backups().await.unwrap_or_default();
        for backup in backups.iter().take(self.max_attempts) {
            match storage.load_settings_from(&backup.path).await {
                Ok(settings) => {
                    if let Err(e) = storage.restore_from_backup(&backup.path).await {
                        warn!("Backup restore failed: {}", e);
                    }
                    info!("✅ Calibration recovered from backup: {:?}", backup.path);
                    return Ok(settings);
                }
                Err(e) => warn!("Backup {:?} unusable: {}", backup.path, e),
            }
        }

        warn!("🔄 Using default calibration as fallback");
        Ok(CalibrationSettings::default())
    }
}

impl Default for StateRecovery {
    fn default() -> Self {
        Self::new()
    }
}
