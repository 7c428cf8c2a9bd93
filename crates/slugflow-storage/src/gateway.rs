use std::sync::LazyLock;

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;

use crate::error::{Result, StorageError};

/// Key grammar shared with the builder images.
///
/// Wider than the usual registry-driver default: app names and git revisions
/// put `:` and `.` into keys (`home/{app}:git-{shortsha}/tar`), so backends
/// must accept them.
static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9._:-]*(/[A-Za-z0-9._:-]+)*)+$").unwrap());

/// Validates `key` against the gateway grammar.
///
/// Every gateway operation runs this before touching the backend, so a
/// narrower validator in an underlying driver never gets a say.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || !KEY_PATTERN.is_match(key) {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Existence answer for [`ObjectStorage::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    Exists,
    NotFound,
}

/// Content-addressed blob store used for build artifacts.
///
/// Keys are flat strings matching the gateway grammar; see the key layout in
/// `slugflow-build` for what lives where.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Writes `data` under `key`, atomically replacing any previous content.
    async fn put_content(&self, key: &str, data: Bytes) -> Result<()>;

    /// Reads the full content under `key`.
    async fn get_content(&self, key: &str) -> Result<Bytes>;

    /// Reports whether `key` currently exists.
    async fn stat(&self, key: &str) -> Result<ObjectState>;

    /// Removes `key`. Deleting a missing key is a no-op.
    async fn delete(&self, key: &str) -> Result<()>;
}
