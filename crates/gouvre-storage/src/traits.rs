//! Storage abstraction trait

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Name-addressed byte storage.
///
/// Names are single path components: no separators, no `..`, never empty. Backends must
/// reject anything else with [`StorageError::InvalidKey`] before touching the medium.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Read the whole file. Missing files are [`StorageError::NotFound`].
    async fn read(&self, name: &str) -> StorageResult<Bytes>;

    /// Create or replace a file.
    async fn write(&self, name: &str, data: &[u8]) -> StorageResult<()>;

    async fn exists(&self, name: &str) -> StorageResult<bool>;

    /// Remove a file. Removing a missing file is not an error.
    async fn delete(&self, name: &str) -> StorageResult<()>;
}
