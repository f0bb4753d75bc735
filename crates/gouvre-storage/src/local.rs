use crate::traits::{FileStore, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Prefix of in-flight writes. Never a valid file name, so a half-written file can't be
/// addressed.
const PARTIAL_PREFIX: &str = ".partial-";

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at `base_path`, creating the directory if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Map a file name to its path under the storage root.
    ///
    /// Names come straight out of client requests and decoded tokens, so anything that could
    /// leave the root directory is refused.
    fn name_to_path(&self, name: &str) -> StorageResult<PathBuf> {
        if name.is_empty() || name == "." || name.contains("..") {
            return Err(StorageError::InvalidKey(format!(
                "'{}' is not a valid file name",
                name
            )));
        }
        if name.starts_with(PARTIAL_PREFIX) {
            return Err(StorageError::InvalidKey(format!(
                "'{}' is not a valid file name",
                name
            )));
        }
        if name.contains('/') || name.contains('\\') || name.contains('\0') {
            return Err(StorageError::InvalidKey(format!(
                "'{}' must not contain path separators",
                name
            )));
        }

        Ok(self.base_path.join(name))
    }
}

#[async_trait]
impl FileStore for LocalStorage {
    async fn read(&self, name: &str) -> StorageResult<Bytes> {
        let path = self.name_to_path(name)?;
        let start = std::time::Instant::now();

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()));
            }
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to read file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        tracing::debug!(
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(Bytes::from(data))
    }

    async fn write(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.name_to_path(name)?;
        let start = std::time::Instant::now();

        let dir = self.base_path.clone();
        let target = path.clone();
        let owned = data.to_vec();
        tokio::task::spawn_blocking(move || persist_atomically(&dir, &target, &owned))
            .await
            .map_err(|e| StorageError::WriteFailed(format!("Write task failed: {}", e)))??;

        tracing::info!(
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(())
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        let path = self.name_to_path(name)?;
        let exists = fs::try_exists(&path).await?;
        Ok(exists && fs::metadata(&path).await?.is_file())
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        let path = self.name_to_path(name)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Local storage delete successful");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Write `data` to a temp file in `dir`, sync it, then rename it over `target`. Readers see
/// either the previous file or the complete new one; on any error the temp file is dropped
/// and removed.
fn persist_atomically(dir: &Path, target: &Path, data: &[u8]) -> StorageResult<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(PARTIAL_PREFIX)
        .tempfile_in(dir)
        .map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create temp file in {}: {}", dir.display(), e))
        })?;

    tmp.write_all(data).map_err(|e| {
        StorageError::WriteFailed(format!("Failed to write file {}: {}", target.display(), e))
    })?;
    tmp.as_file().sync_all().map_err(|e| {
        StorageError::WriteFailed(format!("Failed to sync file {}: {}", target.display(), e))
    })?;

    tmp.persist(target).map_err(|e| {
        StorageError::WriteFailed(format!(
            "Failed to move file into place at {}: {}",
            target.display(),
            e.error
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn storage() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let (_dir, storage) = storage().await;

        storage.write("cat.png", b"pixels").await.unwrap();
        assert!(storage.exists("cat.png").await.unwrap());
        assert_eq!(storage.read("cat.png").await.unwrap(), Bytes::from_static(b"pixels"));

        storage.write("cat.png", b"replaced").await.unwrap();
        assert_eq!(storage.read("cat.png").await.unwrap(), Bytes::from_static(b"replaced"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (_dir, storage) = storage().await;

        assert!(!storage.exists("nope.png").await.unwrap());
        assert!(matches!(
            storage.read("nope.png").await,
            Err(StorageError::NotFound(name)) if name == "nope.png"
        ));
        storage.delete("nope.png").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, storage) = storage().await;

        storage.write("gone.gif", b"x").await.unwrap();
        storage.delete("gone.gif").await.unwrap();
        assert!(!storage.exists("gone.gif").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let (_dir, storage) = storage().await;

        for name in ["", ".", "..", "../etc/passwd", "a/b.png", "/abs.png", "a\\b.png", "x..y"] {
            assert!(
                matches!(storage.write(name, b"x").await, Err(StorageError::InvalidKey(_))),
                "accepted {:?}",
                name
            );
            assert!(matches!(storage.exists(name).await, Err(StorageError::InvalidKey(_))));
        }
    }

    fn entries(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_write_leaves_no_partial_files() {
        let (dir, storage) = storage().await;

        storage.write("a.png", b"one").await.unwrap();
        storage.write("a.png", b"two").await.unwrap();
        assert_eq!(entries(&dir), vec!["a.png".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_write_cleans_up() {
        let (dir, storage) = storage().await;
        std::fs::create_dir(dir.path().join("taken")).unwrap();

        assert!(matches!(
            storage.write("taken", b"data").await,
            Err(StorageError::WriteFailed(_))
        ));
        assert_eq!(entries(&dir), vec!["taken".to_string()]);
        assert!(!storage.exists("taken").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_partial_writes() {
        let (_dir, storage) = storage().await;
        const SIZE: usize = 1 << 20;
        storage.write("big.bin", &vec![b'a'; SIZE]).await.unwrap();

        let writer = {
            let storage = storage.clone();
            tokio::spawn(async move {
                for i in 0..20 {
                    let byte = if i % 2 == 0 { b'b' } else { b'a' };
                    storage.write("big.bin", &vec![byte; SIZE]).await.unwrap();
                }
            })
        };

        for _ in 0..50 {
            let data = storage.read("big.bin").await.unwrap();
            assert_eq!(data.len(), SIZE);
            assert!(data.iter().all(|b| *b == data[0]));
        }
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_partial_names_are_not_addressable() {
        let (_dir, storage) = storage().await;
        assert!(matches!(
            storage.exists(".partial-abc123").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_file() {
        let (dir, storage) = storage().await;
        std::fs::create_dir(dir.path().join("folder")).unwrap();
        assert!(!storage.exists("folder").await.unwrap());
    }
}
