//! On-disk layout of the calibration store
//!
//! `calibration.json` lives in the state directory, previous versions are
//! kept as `backups/calibration_<nanos>.json`. Every write goes to a sibling
//! `.tmp` file that is synced and then renamed over the target, so a crash
//! leaves either the old or the new document.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::StorageSettings;
use crate::state::{CalibrationSettings, StateError, StateSerializer, StateValidator};

const PRIMARY_FILE_NAME: &str = "calibration.json";
const BACKUP_DIRECTORY_NAME: &str = "backups";
const BACKUP_FILE_PREFIX: &str = "calibration_";

/// Where and how the calibration document is stored
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_directory: PathBuf,
    /// zstd + base64 instead of plain JSON
    pub compression: bool,
    /// Backups kept after each save; 0 disables backups
    pub max_backups: usize,
    /// Largest document accepted by `save_settings`, in bytes
    pub max_file_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_directory: crate::config::default_state_directory(),
            compression: false,
            max_backups: 5,
            max_file_size: 1024 * 1024,
        }
    }
}

impl StorageConfig {
    pub fn in_directory(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
            ..Default::default()
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self {
            base_directory: settings.resolved_directory(),
            compression: settings.compression,
            max_backups: settings.max_backups,
            ..Default::default()
        }
    }
}

/// A backup file found in the backup directory
#[derive(Debug, Clone)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Reads and writes the calibration document
#[derive(Debug, Clone)]
pub struct StateStorage {
    config: StorageConfig,
    serializer: StateSerializer,
    validator: StateValidator,
}

impl StateStorage {
    /// Create the state (and backup) directories and a storage over them
    pub fn new(config: StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.base_directory).map_err(StateError::StorageError)?;
        if config.max_backups > 0 {
            std::fs::create_dir_all(config.base_directory.join(BACKUP_DIRECTORY_NAME))
                .map_err(StateError::StorageError)?;
        }

        Ok(Self {
            serializer: StateSerializer::with_config(cfg!(debug_assertions), config.compression),
            validator: StateValidator::new(),
            config,
        })
    }

    pub fn primary_state_file_path(&self) -> PathBuf {
        self.config.base_directory.join(PRIMARY_FILE_NAME)
    }

    pub fn backup_directory(&self) -> PathBuf {
        self.config.base_directory.join(BACKUP_DIRECTORY_NAME)
    }

    pub fn state_exists(&self) -> bool {
        self.primary_state_file_path().exists()
    }

    /// Validate and write the document, keeping the previous one as a backup
    pub async fn save_settings(&self, settings: &CalibrationSettings) -> Result<()> {
        self.validator.validate(settings)?;
        let document = self.serializer.serialize_to_string(settings)?;

        let size = document.len() as u64;
        if size > self.config.max_file_size {
            return Err(StateError::ValidationError(format!(
                "calibration document is {} bytes, limit is {}",
                size, self.config.max_file_size
            ))
            .into());
        }

        let primary = self.primary_state_file_path();
        if self.config.max_backups > 0 && primary.exists() {
            self.back_up(&primary).await?;
            self.prune_backups().await?;
        }

        write_atomically(&primary, &document).await?;
        info!("✅ Calibration saved to {:?}", primary);
        Ok(())
    }

    pub async fn load_settings(&self) -> Result<CalibrationSettings> {
        self.load_settings_from(&self.primary_state_file_path()).await
    }

    /// Parse and validate a document, current or legacy
    pub async fn load_settings_from(&self, path: &Path) -> Result<CalibrationSettings> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(StateError::StorageError)?;
        let settings = self.serializer.deserialize_from_string(&contents)?;
        self.validator.validate(&settings)?;

        debug!("Calibration loaded from {:?}", path);
        Ok(settings)
    }

    /// Backups, newest first
    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        let directory = self.backup_directory();
        if self.config.max_backups == 0 || !directory.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        let mut entries = fs::read_dir(&directory)
            .await
            .map_err(StateError::StorageError)?;
        while let Some(entry) = entries.next_entry().await.map_err(StateError::StorageError)? {
            let path = entry.path();
            let is_backup = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(BACKUP_FILE_PREFIX) && name.ends_with(".json"));
            if !is_backup {
                continue;
            }
            let modified = entry
                .metadata()
                .await
                .and_then(|metadata| metadata.modified())
                .map_err(StateError::StorageError)?;
            backups.push(BackupInfo { path, modified });
        }

        // File names carry a nanosecond timestamp and break mtime ties
        backups.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
        Ok(backups)
    }

    /// Replace the primary document with a backup
    pub async fn restore_from_backup(&self, backup: &Path) -> Result<()> {
        let contents = fs::read_to_string(backup)
            .await
            .map_err(StateError::StorageError)?;
        self.serializer.validate_json(&contents)?;

        write_atomically(&self.primary_state_file_path(), &contents).await?;
        info!("✅ Calibration restored from backup: {:?}", backup);
        Ok(())
    }

    /// Delete backups beyond the configured count; returns how many went
    pub async fn prune_backups(&self) -> Result<usize> {
        let backups = self.list_backups().await?;
        let mut removed = 0;
        for backup in backups.iter().skip(self.config.max_backups) {
            match fs::remove_file(&backup.path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove old backup {:?}: {}", backup.path, e),
            }
        }
        if removed > 0 {
            debug!("Pruned {} old calibration backups", removed);
        }
        Ok(removed)
    }

    async fn back_up(&self, primary: &Path) -> Result<()> {
        let nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let backup = self
            .backup_directory()
            .join(format!("{}{}.json", BACKUP_FILE_PREFIX, nanos));

        fs::copy(primary, &backup)
            .await
            .map_err(StateError::StorageError)?;
        debug!("Backed up calibration to {:?}", backup);
        Ok(())
    }
}

/// Write `contents` to a synced temporary file and rename it over `path`
pub async fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let temp = path.with_extension("tmp");

    let written = async {
        let mut file = fs::File::create(&temp).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        fs::rename(&temp, path).await
    }
    .await;

    if let Err(e) = written {
        let _ = fs::remove_file(&temp).await;
        return Err(StateError::StorageError(e).into());
    }
    Ok(())
}
