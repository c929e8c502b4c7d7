use crate::error::Result;
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock,
};

pub mod file;
pub mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

/// Record key for the persisted todo list
pub const TODOS_KEY: &str = "taskpad.todos";

/// Record key for the persisted settings
pub const SETTINGS_KEY: &str = "taskpad.settings";

const PROBE_KEY: &str = "taskpad.probe";

/// Key-value persistence capability.
///
/// Writes must fail with [`TaskpadError::QuotaExceeded`] when the backend
/// runs out of capacity, so callers can distinguish that from plain IO
/// failure.
///
/// [`TaskpadError::QuotaExceeded`]: crate::error::TaskpadError::QuotaExceeded
#[async_trait]
pub trait Backend: Send + Sync {
    /// Reads the raw value stored under `key`, `None` when absent
    async fn read(&self, key: &str) -> Result<Option<String>>;

    /// Writes the value under `key`, replacing any previous value
    async fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the value under `key`; removing an absent key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// Byte capacity enforced by the backend, if any
    fn capacity(&self) -> Option<u64> {
        None
    }
}

/// The backend the stores actually talk to.
///
/// Selected once at construction by probing the durable backend with a
/// test write and remove; a failed probe switches permanently to the
/// in-memory fallback. The only other transition is `switch_to_memory`,
/// taken when quota recovery itself fails. There is no re-probing.
pub struct BackendHandle {
    backend: RwLock<Arc<dyn Backend>>,
    fallback: AtomicBool,
}

impl BackendHandle {
    /// Probes `durable` and wraps it, or the in-memory fallback if the
    /// probe fails
    pub async fn select(durable: impl Backend + 'static) -> Self {
        let durable: Arc<dyn Backend> = Arc::new(durable);
        match probe(durable.as_ref()).await {
            Ok(()) => Self {
                backend: RwLock::new(durable),
                fallback: AtomicBool::new(false),
            },
            Err(err) => {
                log::warn!("durable storage unavailable ({err}), falling back to memory");
                Self {
                    backend: RwLock::new(Arc::new(MemoryBackend::new())),
                    fallback: AtomicBool::new(true),
                }
            }
        }
    }

    /// Starts directly on the in-memory backend, skipping the probe
    pub fn in_memory() -> Self {
        Self {
            backend: RwLock::new(Arc::new(MemoryBackend::new())),
            fallback: AtomicBool::new(true),
        }
    }

    /// True when operating entirely in volatile memory
    pub fn using_fallback(&self) -> bool {
        self.fallback.load(Ordering::Relaxed)
    }

    pub async fn read(&self, key: &str) -> Result<Option<String>> {
        self.current().read(key).await
    }

    pub async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.current().write(key, value).await
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        self.current().remove(key).await
    }

    pub fn capacity(&self) -> Option<u64> {
        self.current().capacity()
    }

    /// Abandons the durable backend for good, carrying the live records
    /// over into a fresh in-memory store as far as they can still be read
    pub async fn switch_to_memory(&self) {
        let old = self.current();
        let memory = MemoryBackend::new();
        for key in [TODOS_KEY, SETTINGS_KEY] {
            if let Ok(Some(value)) = old.read(key).await {
                if let Err(err) = memory.write(key, &value).await {
                    log::warn!("could not carry record '{key}' into fallback: {err}");
                }
            }
        }

        let mut guard = self
            .backend
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(memory);
        self.fallback.store(true, Ordering::Relaxed);
        log::warn!("durable storage abandoned, now using in-memory fallback");
    }

    fn current(&self) -> Arc<dyn Backend> {
        self.backend
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

async fn probe(backend: &dyn Backend) -> Result<()> {
    backend.write(PROBE_KEY, "probe").await?;
    backend.remove(PROBE_KEY).await?;
    Ok(())
}
