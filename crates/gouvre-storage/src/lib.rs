//! Gouvre Storage Library
//!
//! A flat, name-addressed file store. Originals, derived thumbnails and secret sidecars all
//! live side by side under one root directory, keyed by plain file name.

pub mod local;
pub mod traits;

pub use local::LocalStorage;
pub use traits::{FileStore, StorageError, StorageResult};

use gouvre_core::AppError;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(name) => AppError::NotFound(format!("File not found: {}", name)),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}
