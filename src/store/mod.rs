use crate::{
    clock::{Clock, SystemClock},
    domain::{Settings, SCHEMA_VERSION},
    notify::{ChangeEvent, ChangeKind, ChangeNotifier, NullNotifier},
    storage::{Backend, BackendHandle, FileBackend, SETTINGS_KEY, TODOS_KEY},
};
use std::path::Path;
use std::sync::Arc;

pub mod migrate;
pub mod settings;
pub mod todos;

pub use settings::SettingsStore;
pub use todos::{ListOptions, StoreStats, TodoStore};

/// Entry point owning the todo and settings stores.
///
/// Construction selects the backend (durable when the probe passes,
/// in-memory fallback otherwise), initializes default settings on first
/// run, and runs the one-time schema migration when the stored version
/// lags behind [`SCHEMA_VERSION`]. Migration failures are logged, never
/// fatal.
pub struct TaskpadStore {
    backend: Arc<BackendHandle>,
    todos: TodoStore,
    settings: SettingsStore,
    notifier: Arc<dyn ChangeNotifier>,
    clock: Arc<dyn Clock>,
}

impl TaskpadStore {
    /// Opens a store over the given durable backend
    pub async fn open(
        durable: impl Backend + 'static,
        notifier: Arc<dyn ChangeNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let backend = Arc::new(BackendHandle::select(durable).await);
        Self::initialize(backend, notifier, clock).await
    }

    /// Opens a file-backed store under `root` with default wiring
    pub async fn open_dir(root: impl AsRef<Path>) -> Self {
        Self::open(
            FileBackend::new(root),
            Arc::new(NullNotifier),
            Arc::new(SystemClock),
        )
        .await
    }

    /// Opens a purely in-memory store, skipping the durable probe
    pub async fn open_in_memory(notifier: Arc<dyn ChangeNotifier>, clock: Arc<dyn Clock>) -> Self {
        Self::initialize(Arc::new(BackendHandle::in_memory()), notifier, clock).await
    }

    async fn initialize(
        backend: Arc<BackendHandle>,
        notifier: Arc<dyn ChangeNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Self {
            todos: TodoStore::new(backend.clone(), notifier.clone(), clock.clone()),
            settings: SettingsStore::new(backend.clone(), notifier.clone(), clock.clone()),
            backend,
            notifier,
            clock,
        };
        store.run_startup_migration().await;
        store
    }

    pub fn todos(&self) -> &TodoStore {
        &self.todos
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// True when operating entirely in volatile memory
    pub fn using_fallback(&self) -> bool {
        self.backend.using_fallback()
    }

    /// Clears both records, rewrites default settings, and emits a
    /// storage-cleared event
    pub async fn reset(&self) -> bool {
        for key in [TODOS_KEY, SETTINGS_KEY] {
            if let Err(err) = self.backend.remove(key).await {
                log::error!("failed to clear record '{key}': {err}");
                return false;
            }
        }

        if !self.write_default_settings().await {
            return false;
        }

        self.notifier.notify(ChangeEvent::new(
            ChangeKind::StorageCleared,
            self.clock.now(),
        ));
        true
    }

    /// First-run settings init plus the version-gated legacy migration
    async fn run_startup_migration(&self) {
        let stored = match self.backend.read(SETTINGS_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Settings>(&raw) {
                Ok(settings) => Some(settings),
                Err(err) => {
                    log::warn!("stored settings record is malformed ({err}), rewriting defaults");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                log::warn!("failed to read settings during startup: {err}");
                return;
            }
        };

        let Some(stored) = stored else {
            self.write_default_settings().await;
            return;
        };

        if !stored.needs_migration() {
            return;
        }

        if stored.predates_v1() {
            match migrate::backfill_legacy_todos(&self.backend, self.clock.now()).await {
                Ok(_) => {}
                Err(err) => {
                    log::error!("legacy todo migration failed, continuing with stored data: {err}")
                }
            }
        }

        // Version advances even when no individual record needed changes
        let mut updated = stored;
        updated.version = SCHEMA_VERSION.to_string();
        match serde_json::to_string(&updated) {
            Ok(json) => {
                if let Err(err) = self.backend.write(SETTINGS_KEY, &json).await {
                    log::error!("failed to record migrated settings version: {err}");
                }
            }
            Err(err) => log::error!("failed to serialize migrated settings: {err}"),
        }
    }

    async fn write_default_settings(&self) -> bool {
        match serde_json::to_string(&Settings::default()) {
            Ok(json) => match self.backend.write(SETTINGS_KEY, &json).await {
                Ok(()) => true,
                Err(err) => {
                    log::error!("failed to write default settings: {err}");
                    false
                }
            },
            Err(err) => {
                log::error!("failed to serialize default settings: {err}");
                false
            }
        }
    }
}
