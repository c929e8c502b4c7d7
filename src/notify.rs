use crate::domain::{settings::Settings, todo::Todo};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What changed in the store
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ChangeKind {
    TodoAdded(Todo),
    TodoUpdated { old: Todo, new: Todo },
    TodoDeleted(Todo),
    TodosImported { count: usize },
    SettingsSaved(Settings),
    StorageCleared,
}

/// Broadcast payload emitted after every successful mutation.
///
/// Serializes as `{type, data, timestamp}` so hosts can forward it onto
/// whatever cross-instance channel they have without re-shaping.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    #[serde(flatten)]
    pub kind: ChangeKind,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, timestamp: DateTime<Utc>) -> Self {
        Self { kind, timestamp }
    }
}

/// Observer for store mutations.
///
/// Fire-and-forget: implementations must not block and cannot veto the
/// mutation that produced the event. Delivery failure is the notifier's
/// problem, never the store's.
pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, event: ChangeEvent);
}

/// Notifier that discards every event, for hosts without observers
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl ChangeNotifier for NullNotifier {
    fn notify(&self, _event: ChangeEvent) {}
}
