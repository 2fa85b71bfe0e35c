//! Storage layout configuration

use std::path::PathBuf;

use tracing::{debug, info};

use crate::errors::ConsoleError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::storage::settings::Settings;

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "RUNME_HOME";

/// Where the console keeps its settings and logs
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn base(&self) -> Dir {
        Dir::new(&self.base_dir)
    }

    pub fn settings_file(&self) -> File {
        self.base().file("settings.json")
    }

    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }

    /// Load the settings file. A missing file yields defaults.
    pub async fn load_settings(&self) -> Result<Settings, ConsoleError> {
        let file = self.settings_file();
        match file.read_json_opt().await? {
            Some(settings) => {
                info!("Loaded settings from {}", file.path().display());
                Ok(settings)
            }
            None => {
                debug!("No settings file at {}, using defaults", file.path().display());
                Ok(Settings::default())
            }
        }
    }

    /// Setup the storage layout (create directories)
    pub async fn setup(&self) -> Result<(), ConsoleError> {
        self.logs_dir().create().await?;
        Ok(())
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Self::new(dir);
        }

        let base_dir = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".runme");

        Self::new(base_dir)
    }
}
