use crate::settings::{PollingTable, S3Settings, POLLING_TABLE_FILE, S3_SETTINGS_FILE};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("Could not read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not write configuration file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not create configuration directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Configuration file {path} is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// File-backed store for the two runtime configuration documents.
///
/// Both files live under one directory (default `/data/config`) and
/// are rewritten whole on save, so a reader never sees a partial
/// table. A missing file is not an error: settings load as `None` and
/// the polling table loads empty.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(S3_SETTINGS_FILE)
    }

    pub fn polling_path(&self) -> PathBuf {
        self.dir.join(POLLING_TABLE_FILE)
    }

    pub fn load_settings(&self) -> Result<Option<S3Settings>, ConfigStoreError> {
        let path = self.settings_path();
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConfigStoreError::Read { path, source: e }),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| ConfigStoreError::Malformed { path, source: e })
    }

    pub fn save_settings(&self, settings: &S3Settings) -> Result<(), ConfigStoreError> {
        self.write_json(&self.settings_path(), settings)
    }

    pub fn load_polling(&self) -> Result<PollingTable, ConfigStoreError> {
        let path = self.polling_path();
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PollingTable::new()),
            Err(e) => return Err(ConfigStoreError::Read { path, source: e }),
        };

        if content.trim().is_empty() {
            return Ok(PollingTable::new());
        }

        serde_json::from_str(&content).map_err(|e| ConfigStoreError::Malformed { path, source: e })
    }

    pub fn save_polling(&self, table: &PollingTable) -> Result<(), ConfigStoreError> {
        self.write_json(&self.polling_path(), table)
    }

    fn write_json<T: serde::Serialize>(
        &self,
        path: &Path,
        value: &T,
    ) -> Result<(), ConfigStoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| ConfigStoreError::CreateDir {
            path: self.dir.clone(),
            source: e,
        })?;

        let json = serde_json::to_string_pretty(value).map_err(|e| ConfigStoreError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })?;

        fs::write(path, json).map_err(|e| ConfigStoreError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;

        debug!(path = %path.display(), "configuration file written");
        Ok(())
    }
}
