//! File-per-key storage backend

use crate::{Result, Storage, StorageError};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Stores each key as a file in a directory
///
/// Keys are percent-encoded into file names, so any string is a valid key.
/// Writes go to a temporary file that is renamed over the target, so readers
/// never observe a partially written value.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Store entries under `dir`, which is created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the entries
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}

#[async_trait]
impl Storage for FileStorage {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(e, &path, "read")),
        }
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::io(e, &self.dir, "create_dir_all"))?;

        let path = self.path_for(key);
        // Write to a temporary file first, then rename atomically
        let temp_path = path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StorageError::io(e, &temp_path, "create"))?;
        file.write_all(value.as_bytes())
            .await
            .map_err(|e| StorageError::io(e, &temp_path, "write_all"))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::io(e, &temp_path, "sync_all"))?;
        drop(file);

        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StorageError::io(e, &path, "rename"))?;

        debug!(key, path = %path.display(), bytes = value.len(), "Wrote storage entry");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(e, &path, "remove")),
        }
    }
}
