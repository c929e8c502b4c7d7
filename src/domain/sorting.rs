use crate::domain::todo::{Priority, Todo};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Fields available for sorting todos
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Created,
    Updated,
    Due,
    Completed,
    Title,
    Priority,
}

/// Sort order direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[serde(rename = "asc")]
    Ascending,
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(SortField::Created),
            "updated" => Ok(SortField::Updated),
            "due" => Ok(SortField::Due),
            "completed" => Ok(SortField::Completed),
            "title" => Ok(SortField::Title),
            "priority" => Ok(SortField::Priority),
            _ => Err(format!(
                "Invalid sort field '{}'. Valid fields: created, updated, due, completed, title, priority",
                s
            )),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Ascending),
            "desc" => Ok(SortOrder::Descending),
            _ => Err(format!(
                "Invalid sort order '{}'. Valid orders: asc, desc",
                s
            )),
        }
    }
}

impl<'de> Deserialize<'de> for SortField {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or_default())
    }
}

/// Field/direction pair; defaults to newest-created first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    #[serde(default)]
    pub field: SortField,
    #[serde(default)]
    pub order: SortOrder,
}

/// Sorts todos in place by the given field and order.
///
/// `Vec::sort_by` is stable, so todos with equal keys keep their stored
/// (most-recent-first) order. Date fields compare as instants with missing
/// values pinned to the Unix epoch; titles compare case-insensitively.
pub fn sort_todos(todos: &mut [Todo], spec: SortSpec) {
    todos.sort_by(|a, b| {
        let cmp = match spec.field {
            SortField::Created => a.created_at.cmp(&b.created_at),
            SortField::Updated => a.updated_at.cmp(&b.updated_at),
            SortField::Due => date_or_epoch(a.due_date.map(to_midnight))
                .cmp(&date_or_epoch(b.due_date.map(to_midnight))),
            SortField::Completed => {
                date_or_epoch(a.completed_at).cmp(&date_or_epoch(b.completed_at))
            }
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortField::Priority => compare_priority(a.priority, b.priority),
        };

        match spec.order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    });
}

fn to_midnight(date: chrono::NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Missing dates compare as the epoch, sorting before every real instant
fn date_or_epoch(date: Option<DateTime<Utc>>) -> DateTime<Utc> {
    date.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Low < Normal < High by urgency
fn compare_priority(a: Priority, b: Priority) -> Ordering {
    a.cmp(&b)
}
