use crate::{
    clock::Clock,
    domain::{
        filter_todos, generate_id, sort_todos, validate_todos, FilterMode, NewTodo, SortSpec,
        Todo, TodoPatch,
    },
    error::{Result, TaskpadError},
    notify::{ChangeEvent, ChangeKind, ChangeNotifier},
    storage::{BackendHandle, SETTINGS_KEY, TODOS_KEY},
};
use chrono::Duration;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Completed todos older than this are dropped during quota recovery
const QUOTA_CLEANUP_DAYS: i64 = 30;

/// Filter and sort options for [`TodoStore::get_all`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub filter: Option<FilterMode>,
    pub sort: Option<SortSpec>,
}

/// Read-only snapshot of store health
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub count: usize,
    pub completed_count: usize,
    pub storage_bytes_used: u64,
    pub storage_bytes_available: Option<u64>,
    pub using_fallback: bool,
}

/// CRUD, search, and import/export over the persisted todo list.
///
/// Every operation has a defined fallback value; internal storage or
/// parse failures are logged and never surface to the caller. Mutations
/// persist the whole validated list in a single write and emit a change
/// event on success.
pub struct TodoStore {
    backend: Arc<BackendHandle>,
    notifier: Arc<dyn ChangeNotifier>,
    clock: Arc<dyn Clock>,
}

impl TodoStore {
    pub fn new(
        backend: Arc<BackendHandle>,
        notifier: Arc<dyn ChangeNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            notifier,
            clock,
        }
    }

    /// Returns the stored list, optionally filtered and sorted.
    ///
    /// Empty list on any internal error. Without a sort option the list
    /// keeps its stored most-recent-first order.
    pub async fn get_all(&self, options: ListOptions) -> Vec<Todo> {
        let mut todos = self.load().await;

        if let Some(mode) = options.filter {
            todos = filter_todos(todos, mode, self.clock.now());
        }
        if let Some(spec) = options.sort {
            sort_todos(&mut todos, spec);
        }

        todos
    }

    /// Looks up a single todo by id
    pub async fn get(&self, id: &str) -> Option<Todo> {
        self.load().await.into_iter().find(|t| t.id == id)
    }

    /// Creates a todo and prepends it to the list.
    ///
    /// Returns `None` when the title trims empty or the list could not be
    /// persisted.
    pub async fn add(&self, draft: NewTodo) -> Option<Todo> {
        if draft.title.trim().is_empty() {
            log::debug!("rejected todo with empty title");
            return None;
        }

        let now = self.clock.now();
        let todo = Todo::create(generate_id(now), draft, now);

        let mut todos = self.load().await;
        todos.insert(0, todo.clone());

        if !self.persist(&todos).await {
            return None;
        }

        self.emit(ChangeKind::TodoAdded(todo.clone()));
        Some(todo)
    }

    /// Merges a partial update into the todo with the given id.
    ///
    /// Returns the updated record, or `None` when the id is unknown or
    /// persistence failed.
    pub async fn update(&self, id: &str, patch: TodoPatch) -> Option<Todo> {
        let mut todos = self.load().await;
        let position = todos.iter().position(|t| t.id == id)?;

        let old = todos[position].clone();
        todos[position].apply_patch(patch, self.clock.now());
        let new = todos[position].clone();

        if !self.persist(&todos).await {
            return None;
        }

        self.emit(ChangeKind::TodoUpdated {
            old,
            new: new.clone(),
        });
        Some(new)
    }

    /// Removes the todo with the given id; false when absent
    pub async fn delete(&self, id: &str) -> bool {
        let mut todos = self.load().await;
        let Some(position) = todos.iter().position(|t| t.id == id) else {
            return false;
        };

        let removed = todos.remove(position);
        if !self.persist(&todos).await {
            return false;
        }

        self.emit(ChangeKind::TodoDeleted(removed));
        true
    }

    /// Case-insensitive substring search over title, description, and
    /// tags; a blank query returns the full unfiltered list
    pub async fn search(&self, query: &str) -> Vec<Todo> {
        let todos = self.load().await;
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return todos;
        }

        todos
            .into_iter()
            .filter(|t| t.matches_query(&query))
            .collect()
    }

    /// Derived counters and storage usage
    pub async fn stats(&self) -> StoreStats {
        let todos = self.load().await;
        let completed_count = todos.iter().filter(|t| t.completed).count();

        let mut bytes_used = 0u64;
        for key in [TODOS_KEY, SETTINGS_KEY] {
            if let Ok(Some(raw)) = self.backend.read(key).await {
                bytes_used += raw.len() as u64;
            }
        }

        StoreStats {
            count: todos.len(),
            completed_count,
            storage_bytes_used: bytes_used,
            storage_bytes_available: self
                .backend
                .capacity()
                .map(|capacity| capacity.saturating_sub(bytes_used)),
            using_fallback: self.backend.using_fallback(),
        }
    }

    /// Serializes the validated list for export
    pub async fn export_json(&self) -> String {
        let todos = self.load().await;
        match serde_json::to_string_pretty(&todos) {
            Ok(json) => json,
            Err(err) => {
                log::error!("failed to serialize todos for export: {err}");
                "[]".to_string()
            }
        }
    }

    /// Replaces the whole list with an imported payload.
    ///
    /// The payload must be a JSON array in which every record passes the
    /// required-field checks; anything else is rejected without touching
    /// the stored list. Returns the number of imported todos.
    pub async fn import_json(&self, payload: &str) -> Result<usize> {
        let raw: Value = serde_json::from_str(payload)
            .map_err(|err| TaskpadError::InvalidImport(err.to_string()))?;

        let entries = raw
            .as_array()
            .ok_or_else(|| TaskpadError::InvalidImport("expected a JSON array".to_string()))?;

        let todos = validate_todos(&raw, self.clock.now());
        if todos.len() != entries.len() {
            return Err(TaskpadError::InvalidImport(format!(
                "{} record(s) failed validation",
                entries.len() - todos.len()
            )));
        }

        if !self.persist(&todos).await {
            return Err(TaskpadError::StorageUnavailable(
                "could not persist imported todos".to_string(),
            ));
        }

        let count = todos.len();
        self.emit(ChangeKind::TodosImported { count });
        Ok(count)
    }

    /// Reads and validates the stored list; empty on any failure
    pub(crate) async fn load(&self) -> Vec<Todo> {
        let raw = match self.backend.read(TODOS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                log::warn!("failed to read todos record: {err}");
                return Vec::new();
            }
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("stored todos record is not valid JSON ({err}), starting empty");
                return Vec::new();
            }
        };

        validate_todos(&value, self.clock.now())
    }

    /// Writes the whole list back; quota failures trigger recovery
    async fn persist(&self, todos: &[Todo]) -> bool {
        let json = match serde_json::to_string(todos) {
            Ok(json) => json,
            Err(err) => {
                log::error!("failed to serialize todos: {err}");
                return false;
            }
        };

        match self.backend.write(TODOS_KEY, &json).await {
            Ok(()) => true,
            Err(err) if err.is_quota_exceeded() => self.recover_from_quota(todos).await,
            Err(err) => {
                log::error!("failed to persist todos: {err}");
                false
            }
        }
    }

    /// Quota recovery: drop completed todos older than the cleanup cutoff
    /// and retry; if that still fails, abandon durable storage for memory
    async fn recover_from_quota(&self, todos: &[Todo]) -> bool {
        let cutoff = self.clock.now() - Duration::days(QUOTA_CLEANUP_DAYS);
        let reduced: Vec<Todo> = todos
            .iter()
            .filter(|t| !(t.completed && t.completed_at.unwrap_or(t.created_at) < cutoff))
            .cloned()
            .collect();

        log::warn!(
            "storage quota exceeded, dropping {} completed todo(s) older than {} days",
            todos.len() - reduced.len(),
            QUOTA_CLEANUP_DAYS
        );

        let json = match serde_json::to_string(&reduced) {
            Ok(json) => json,
            Err(err) => {
                log::error!("failed to serialize reduced todo list: {err}");
                return false;
            }
        };

        match self.backend.write(TODOS_KEY, &json).await {
            Ok(()) => true,
            Err(err) => {
                log::warn!("quota recovery failed ({err})");
                self.backend.switch_to_memory().await;
                match self.backend.write(TODOS_KEY, &json).await {
                    Ok(()) => true,
                    Err(err) => {
                        log::error!("fallback write failed: {err}");
                        false
                    }
                }
            }
        }
    }

    fn emit(&self, kind: ChangeKind) {
        self.notifier.notify(ChangeEvent::new(kind, self.clock.now()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::test_support::FixedClock,
        notify::test_support::RecordingNotifier,
        storage::{Backend, MemoryBackend},
    };
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    async fn test_store() -> (TodoStore, Arc<RecordingNotifier>, Arc<FixedClock>) {
        let backend = Arc::new(BackendHandle::select(MemoryBackend::new()).await);
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(FixedClock::new(fixed_now()));
        let store = TodoStore::new(backend, notifier.clone(), clock.clone());
        (store, notifier, clock)
    }

    fn draft(title: &str) -> NewTodo {
        NewTodo {
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// Backend that fails the next N todo-record writes with QuotaExceeded
    struct QuotaBackend {
        inner: MemoryBackend,
        failures_left: AtomicUsize,
    }

    impl QuotaBackend {
        fn failing(times: usize) -> Self {
            Self {
                inner: MemoryBackend::new(),
                failures_left: AtomicUsize::new(times),
            }
        }
    }

    #[async_trait]
    impl Backend for QuotaBackend {
        async fn read(&self, key: &str) -> crate::error::Result<Option<String>> {
            self.inner.read(key).await
        }

        async fn write(&self, key: &str, value: &str) -> crate::error::Result<()> {
            if key == TODOS_KEY {
                let left = self.failures_left.load(Ordering::SeqCst);
                if left > 0 {
                    self.failures_left.store(left - 1, Ordering::SeqCst);
                    return Err(TaskpadError::QuotaExceeded);
                }
            }
            self.inner.write(key, value).await
        }

        async fn remove(&self, key: &str) -> crate::error::Result<()> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn test_add_then_get_round_trips() {
        let (store, _, _) = test_store().await;

        let added = store.add(draft("Buy milk")).await.unwrap();
        let fetched = store.get(&added.id).await.unwrap();

        assert_eq!(fetched, added);
    }

    #[tokio::test]
    async fn test_add_rejects_blank_title() {
        let (store, notifier, _) = test_store().await;

        assert!(store.add(draft("   ")).await.is_none());
        assert!(store.get_all(ListOptions::default()).await.is_empty());
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_new_todos_are_prepended() {
        let (store, _, _) = test_store().await;

        store.add(draft("first")).await.unwrap();
        store.add(draft("second")).await.unwrap();

        let todos = store.get_all(ListOptions::default()).await;
        assert_eq!(todos[0].title, "second");
        assert_eq!(todos[1].title, "first");
    }

    #[tokio::test]
    async fn test_add_emits_event() {
        let (store, notifier, _) = test_store().await;

        let added = store.add(draft("task")).await.unwrap();

        let events = notifier.events();
        assert_eq!(events.len(), 1);
        match &events[0].kind {
            ChangeKind::TodoAdded(todo) => assert_eq!(todo.id, added.id),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_completed_derives_completed_at() {
        let (store, _, clock) = test_store().await;
        let added = store.add(draft("task")).await.unwrap();

        let later = fixed_now() + Duration::hours(1);
        clock.set(later);

        let updated = store
            .update(
                &added.id,
                TodoPatch {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.completed_at, Some(later));

        let reverted = store
            .update(
                &added.id,
                TodoPatch {
                    completed: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!reverted.completed);
        assert!(reverted.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_id_returns_none() {
        let (store, notifier, _) = test_store().await;

        let result = store.update("missing", TodoPatch::default()).await;
        assert!(result.is_none());
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_update_emits_old_and_new() {
        let (store, notifier, _) = test_store().await;
        let added = store.add(draft("before")).await.unwrap();

        store
            .update(
                &added.id,
                TodoPatch {
                    title: Some("after".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let events = notifier.events();
        match &events[1].kind {
            ChangeKind::TodoUpdated { old, new } => {
                assert_eq!(old.title, "before");
                assert_eq!(new.title, "after");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_then_get_returns_none() {
        let (store, _, _) = test_store().await;
        let added = store.add(draft("task")).await.unwrap();

        assert!(store.delete(&added.id).await);
        assert!(store.get(&added.id).await.is_none());
    }

    #[tokio::test]
    async fn test_delete_absent_id_leaves_list_unchanged() {
        let (store, _, _) = test_store().await;
        store.add(draft("keep")).await.unwrap();

        assert!(!store.delete("missing").await);
        assert_eq!(store.get_all(ListOptions::default()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_search_blank_query_returns_full_list() {
        let (store, _, _) = test_store().await;
        store.add(draft("a")).await.unwrap();
        store.add(draft("b")).await.unwrap();

        assert_eq!(store.search("").await.len(), 2);
        assert_eq!(store.search("   ").await.len(), 2);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let (store, _, _) = test_store().await;
        store.add(draft("Team meeting")).await.unwrap();
        store.add(draft("Groceries")).await.unwrap();

        let results = store.search("MEET").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Team meeting");
    }

    #[tokio::test]
    async fn test_get_all_filters_and_sorts() {
        let (store, _, clock) = test_store().await;
        let first = store.add(draft("old")).await.unwrap();
        clock.set(fixed_now() + Duration::hours(1));
        store.add(draft("new")).await.unwrap();
        store
            .update(
                &first.id,
                TodoPatch {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let pending = store
            .get_all(ListOptions {
                filter: Some(FilterMode::Pending),
                sort: None,
            })
            .await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title, "new");

        let sorted = store
            .get_all(ListOptions {
                filter: None,
                sort: Some(SortSpec::default()),
            })
            .await;
        assert_eq!(sorted[0].title, "new");
        assert_eq!(sorted[1].title, "old");
    }

    #[tokio::test]
    async fn test_malformed_stored_record_loads_empty() {
        let backend = Arc::new(BackendHandle::select(MemoryBackend::new()).await);
        backend.write(TODOS_KEY, "not json at all").await.unwrap();
        let store = TodoStore::new(
            backend,
            Arc::new(RecordingNotifier::default()),
            Arc::new(FixedClock::new(fixed_now())),
        );

        assert!(store.get_all(ListOptions::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_stats_counts_and_fallback_flag() {
        let (store, _, _) = test_store().await;
        let added = store.add(draft("done")).await.unwrap();
        store.add(draft("open")).await.unwrap();
        store
            .update(
                &added.id,
                TodoPatch {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.count, 2);
        assert_eq!(stats.completed_count, 1);
        assert!(stats.storage_bytes_used > 0);
        assert!(!stats.using_fallback);
    }

    #[tokio::test]
    async fn test_quota_recovery_drops_old_completed_todos() {
        let clock = Arc::new(FixedClock::new(fixed_now()));
        let backend = Arc::new(BackendHandle::select(QuotaBackend::failing(0)).await);
        let notifier = Arc::new(RecordingNotifier::default());
        let store = TodoStore::new(backend.clone(), notifier, clock.clone());

        // Completed long ago, pending, and completed recently
        let stale = store.add(draft("stale done")).await.unwrap();
        store
            .update(
                &stale.id,
                TodoPatch {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store.add(draft("still open")).await.unwrap();

        clock.set(fixed_now() + Duration::days(40));
        let fresh = store.add(draft("fresh done")).await.unwrap();
        store
            .update(
                &fresh.id,
                TodoPatch {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Next todos write hits the quota once; recovery retries reduced
        let handle_backend = QuotaBackend::failing(1);
        // Re-create the store over a backend that trips once, seeded with
        // the current records
        let raw = backend.read(TODOS_KEY).await.unwrap().unwrap();
        handle_backend.inner.write(TODOS_KEY, &raw).await.unwrap();
        let backend = Arc::new(BackendHandle::select(handle_backend).await);
        let store = TodoStore::new(
            backend.clone(),
            Arc::new(RecordingNotifier::default()),
            clock.clone(),
        );

        let added = store.add(draft("one more")).await;
        assert!(added.is_some());
        assert!(!backend.using_fallback());

        let titles: Vec<_> = store
            .get_all(ListOptions::default())
            .await
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert!(titles.contains(&"one more".to_string()));
        assert!(titles.contains(&"still open".to_string()));
        assert!(titles.contains(&"fresh done".to_string()));
        assert!(!titles.contains(&"stale done".to_string()));
    }

    #[tokio::test]
    async fn test_failed_recovery_switches_to_memory_fallback() {
        let clock = Arc::new(FixedClock::new(fixed_now()));
        let backend = Arc::new(BackendHandle::select(QuotaBackend::failing(usize::MAX)).await);
        let store = TodoStore::new(
            backend.clone(),
            Arc::new(RecordingNotifier::default()),
            clock,
        );

        let added = store.add(draft("survives in memory")).await;
        assert!(added.is_some());
        assert!(backend.using_fallback());
        assert_eq!(store.get_all(ListOptions::default()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_export_then_import_round_trips() {
        let (store, _, _) = test_store().await;
        store.add(draft("a")).await.unwrap();
        store.add(draft("b")).await.unwrap();

        let exported = store.export_json().await;

        let (other, notifier, _) = test_store().await;
        let count = other.import_json(&exported).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(other.get_all(ListOptions::default()).await.len(), 2);
        assert!(matches!(
            &notifier.events()[0].kind,
            ChangeKind::TodosImported { count: 2 }
        ));
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_payloads() {
        let (store, _, _) = test_store().await;
        store.add(draft("keep me")).await.unwrap();

        assert!(store.import_json("not json").await.is_err());
        assert!(store.import_json("{\"not\":\"an array\"}").await.is_err());
        // One invalid record poisons the whole payload, no partial merge
        let mixed = r#"[
            {"id": "1", "title": "ok", "completed": false},
            {"title": "no id", "completed": false}
        ]"#;
        assert!(store.import_json(mixed).await.is_err());

        let todos = store.get_all(ListOptions::default()).await;
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "keep me");
    }
}
