use crate::{
    domain::generate_id,
    error::Result,
    storage::{BackendHandle, TODOS_KEY},
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

/// Backfills legacy todo records written before the 1.0.0 schema.
///
/// Pre-1.0.0 records may lack `id` and `createdAt` and may carry a
/// non-boolean `completed`. Each affected record gets a generated id, the
/// current time, or `completed = false`; the list is written back only if
/// at least one record changed. Returns the number of migrated records.
pub async fn backfill_legacy_todos(backend: &BackendHandle, now: DateTime<Utc>) -> Result<usize> {
    let Some(raw) = backend.read(TODOS_KEY).await? else {
        return Ok(0);
    };

    let mut value: Value = serde_json::from_str(&raw)?;
    let Some(entries) = value.as_array_mut() else {
        log::warn!("stored todos record is not an array, skipping migration");
        return Ok(0);
    };

    let mut migrated = 0usize;
    for entry in entries.iter_mut() {
        let Some(obj) = entry.as_object_mut() else {
            continue;
        };
        let mut changed = false;

        let id_missing = obj
            .get("id")
            .and_then(Value::as_str)
            .map(str::is_empty)
            .unwrap_or(true);
        if id_missing {
            obj.insert("id".to_string(), json!(generate_id(now)));
            changed = true;
        }

        if obj.get("createdAt").and_then(Value::as_str).is_none() {
            obj.insert("createdAt".to_string(), json!(now));
            changed = true;
        }

        if obj.get("completed").and_then(Value::as_bool).is_none() {
            obj.insert("completed".to_string(), json!(false));
            changed = true;
        }

        if changed {
            migrated += 1;
        }
    }

    if migrated > 0 {
        backend
            .write(TODOS_KEY, &serde_json::to_string(&value)?)
            .await?;
        log::info!("migrated {migrated} legacy todo record(s)");
    }

    Ok(migrated)
}
