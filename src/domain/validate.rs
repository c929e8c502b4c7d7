use crate::domain::todo::{Priority, Todo};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

/// Validates and normalizes a raw stored todo list.
///
/// Pure filter-and-normalize pass over whatever was read from storage:
/// never fails. Non-array input yields an empty list; entries without a
/// non-empty `id`, a title that trims non-empty, and a boolean `completed`
/// are dropped; everything else is backfilled with defaults.
pub fn validate_todos(raw: &Value, now: DateTime<Utc>) -> Vec<Todo> {
    let entries = match raw.as_array() {
        Some(entries) => entries,
        None => {
            log::warn!("stored todos record is not an array, starting empty");
            return Vec::new();
        }
    };

    let mut todos = Vec::with_capacity(entries.len());
    let mut dropped = 0usize;

    for entry in entries {
        match normalize_entry(entry, now) {
            Some(todo) => todos.push(todo),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        log::warn!("dropped {} malformed todo record(s) on load", dropped);
    }

    todos
}

fn normalize_entry(entry: &Value, now: DateTime<Utc>) -> Option<Todo> {
    let obj = entry.as_object()?;

    let id = obj.get("id")?.as_str()?;
    if id.is_empty() {
        return None;
    }

    let title = obj.get("title")?.as_str()?.trim();
    if title.is_empty() {
        return None;
    }

    let completed = obj.get("completed")?.as_bool()?;

    let created_at = obj
        .get("createdAt")
        .and_then(parse_timestamp)
        .unwrap_or(now);

    Some(Todo {
        id: id.to_string(),
        title: title.to_string(),
        completed,
        due_date: obj.get("dueDate").and_then(parse_date),
        created_at,
        completed_at: obj.get("completedAt").and_then(parse_timestamp),
        updated_at: obj
            .get("updatedAt")
            .and_then(parse_timestamp)
            .unwrap_or(created_at),
        priority: obj
            .get("priority")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(Priority::Normal),
        tags: obj
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        description: obj
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
    })
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    value
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}
