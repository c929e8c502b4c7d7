//! # Taskpad Core
//!
//! Storage and data-management core for Taskpad todo tracking.
//!
//! This crate owns entity validation, schema migration, filtering and
//! sorting semantics, and the persistence backend (durable key-value
//! files with an in-memory fallback), without any dependency on a
//! specific UI. Hosts call the store operations and observe mutations
//! through the change notifier.

pub mod clock;
pub mod domain;
pub mod error;
pub mod notify;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use domain::{
    FilterMode, NewTodo, Priority, Settings, SortField, SortOrder, SortSpec, Todo, TodoPatch,
    SCHEMA_VERSION,
};
pub use error::{Result, TaskpadError};
pub use notify::{ChangeEvent, ChangeKind, ChangeNotifier, NullNotifier};
pub use storage::{Backend, BackendHandle, FileBackend, MemoryBackend};
pub use store::{ListOptions, SettingsStore, StoreStats, TaskpadStore, TodoStore};
