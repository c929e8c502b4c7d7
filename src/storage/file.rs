use crate::error::{Result, TaskpadError};
use crate::storage::Backend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

// ENOSPC; io::ErrorKind::StorageFull needs a newer toolchain than we target
const OS_DISK_FULL: i32 = 28;

/// Durable backend storing one JSON file per record key.
///
/// An optional byte capacity turns writes that would exceed it into
/// [`TaskpadError::QuotaExceeded`], same as a full disk.
pub struct FileBackend {
    root_path: PathBuf,
    capacity: Option<u64>,
}

impl FileBackend {
    const TASKPAD_DIR: &'static str = ".taskpad";

    /// Creates a backend rooted under the given directory, unlimited capacity
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root_path: root.as_ref().join(Self::TASKPAD_DIR),
            capacity: None,
        }
    }

    /// Creates a backend that refuses writes once total stored bytes would
    /// exceed `capacity`
    pub fn with_capacity(root: impl AsRef<Path>, capacity: u64) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new(root)
        }
    }

    fn record_file(&self, key: &str) -> PathBuf {
        self.root_path.join(format!("{key}.json"))
    }

    async fn ensure_root_exists(&self) -> Result<()> {
        if !self.root_path.exists() {
            fs::create_dir_all(&self.root_path).await?;
        }
        Ok(())
    }

    /// Total bytes of stored records, not counting the one about to be
    /// replaced
    async fn used_bytes_excluding(&self, key: &str) -> Result<u64> {
        let excluded = self.record_file(key);
        let mut total = 0u64;

        if !self.root_path.exists() {
            return Ok(0);
        }

        let mut entries = fs::read_dir(&self.root_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path == excluded || path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            total += entry.metadata().await?.len();
        }

        Ok(total)
    }
}

#[async_trait]
impl Backend for FileBackend {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.record_file(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path).await?))
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_root_exists().await?;

        if let Some(capacity) = self.capacity {
            let used = self.used_bytes_excluding(key).await?;
            if used + value.len() as u64 > capacity {
                return Err(TaskpadError::QuotaExceeded);
            }
        }

        fs::write(self.record_file(key), value)
            .await
            .map_err(|err| {
                if err.raw_os_error() == Some(OS_DISK_FULL) {
                    TaskpadError::QuotaExceeded
                } else {
                    TaskpadError::IoError(err)
                }
            })
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.record_file(key);
        if path.exists() {
            fs::remove_file(path).await?;
        }
        Ok(())
    }

    fn capacity(&self) -> Option<u64> {
        self.capacity
    }
}
