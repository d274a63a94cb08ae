//! File-backed settings store.
//!
//! Persists the runtime settings as one postcard blob. Saves go through a
//! temp file in the same directory followed by a rename, so the store
//! always holds either the old blob or the new one — never a torn write,
//! including across power loss.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::warn;

use crate::app::ports::{PersistedSettings, SettingsPort};
use crate::error::StoreError;

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone();
        tmp.set_extension("tmp");
        tmp
    }
}

impl SettingsPort for FileStore {
    fn load(&self) -> Result<PersistedSettings, StoreError> {
        if !Path::exists(&self.path) {
            return Err(StoreError::NotFound);
        }
        let bytes = fs::read(&self.path).map_err(|e| {
            warn!("settings read failed: {e}");
            StoreError::IoError
        })?;
        postcard::from_bytes(&bytes).map_err(|_| StoreError::Corrupted)
    }

    fn save(&self, settings: &PersistedSettings) -> Result<(), StoreError> {
        let bytes = postcard::to_allocvec(settings).map_err(|_| StoreError::IoError)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|_| StoreError::IoError)?;
            }
        }

        let tmp = self.tmp_path();
        {
            let mut f = fs::File::create(&tmp).map_err(|_| StoreError::IoError)?;
            f.write_all(&bytes).map_err(|_| StoreError::IoError)?;
            f.sync_all().map_err(|_| StoreError::IoError)?;
        }
        fs::rename(&tmp, &self.path).map_err(|_| StoreError::IoError)
    }
}
