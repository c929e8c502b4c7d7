use crate::error::Result;
use crate::storage::Backend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Volatile fallback backend; contents vanish with the process
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        let records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(records.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.remove(key);
        Ok(())
    }
}
