use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Priority of a todo
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Normal => write!(f, "normal"),
            Self::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            _ => Err(format!(
                "Invalid priority '{}'. Valid priorities: low, normal, high",
                s
            )),
        }
    }
}

/// A single task record.
///
/// Persisted with camelCase keys so records written by earlier schema
/// versions deserialize unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Payload for creating a todo
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub tags: Vec<String>,
}

/// Partial update for an existing todo.
///
/// `id` and `createdAt` are absent on purpose: they are immutable. So is
/// `completedAt` — it is derived from `completed` transitions, never set
/// directly by callers.
#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` clears the due date, `None` leaves it untouched
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub completed: Option<bool>,
}

impl Todo {
    /// Creates a new todo from a draft; the caller supplies id and clock reading
    pub fn create(id: String, draft: NewTodo, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title.trim().to_string(),
            completed: false,
            due_date: draft.due_date,
            created_at: now,
            completed_at: None,
            updated_at: now,
            priority: draft.priority,
            tags: draft.tags,
            description: draft.description,
        }
    }

    /// Merges a partial update into the record.
    ///
    /// A title that trims empty is ignored rather than breaking the
    /// non-empty-title invariant. When `completed` is present,
    /// `completed_at` is re-derived from it unconditionally.
    pub fn apply_patch(&mut self, patch: TodoPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            let trimmed = title.trim();
            if !trimmed.is_empty() {
                self.title = trimmed.to_string();
            }
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
            self.completed_at = if completed { Some(now) } else { None };
        }
        self.updated_at = now;
    }

    /// Checks whether the todo matches a case-insensitive substring query
    /// against title, description, or any tag
    pub fn matches_query(&self, query_lower: &str) -> bool {
        self.title.to_lowercase().contains(query_lower)
            || self.description.to_lowercase().contains(query_lower)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(query_lower))
    }
}

/// Generates an opaque todo id: millisecond timestamp plus a random
/// suffix, collision-resistant for same-millisecond creates
pub fn generate_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", now.timestamp_millis(), &suffix[..8])
}
