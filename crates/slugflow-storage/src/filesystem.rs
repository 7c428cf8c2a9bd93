use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, StorageError};
use crate::gateway::{validate_key, ObjectState, ObjectStorage};

/// Filesystem-backed object store.
///
/// Keys map directly to paths under the root directory. Writes go through a
/// sibling temp file and a rename so a concurrent reader never observes a
/// half-written object.
pub struct FilesystemStorage {
    root: PathBuf,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        // The grammar admits "." runs, so ".." segments are legal keys but
        // must not escape the root.
        if key.split('/').any(|segment| segment == "..") {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStorage for FilesystemStorage {
    async fn put_content(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.key_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::from_io(key, e))?;
        }
        let tmp = path.with_extension("partial");
        tokio::fs::write(&tmp, &data)
            .await
            .map_err(|e| StorageError::from_io(key, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::from_io(key, e))?;
        Ok(())
    }

    async fn get_content(&self, key: &str) -> Result<Bytes> {
        let path = self.key_path(key)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::from_io(key, e))?;
        Ok(Bytes::from(data))
    }

    async fn stat(&self, key: &str) -> Result<ObjectState> {
        let path = self.key_path(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(ObjectState::Exists),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ObjectState::NotFound),
            Err(e) => Err(StorageError::from_io(key, e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::from_io(key, e)),
        }
    }
}
