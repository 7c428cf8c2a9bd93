use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied for {0}")]
    PermissionDenied(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

impl StorageError {
    /// Maps a filesystem error for `key` onto the gateway contract.
    pub(crate) fn from_io(key: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                StorageError::PermissionDenied(key.to_string())
            }
            _ => StorageError::Unavailable(format!("{}: {}", key, err)),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
