use crate::domain::todo::Todo;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// View filters over the todo list.
///
/// Unrecognized stored values deserialize to `All`, the explicit
/// passthrough case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    Completed,
    Pending,
    Overdue,
    Today,
}

impl<'de> Deserialize<'de> for FilterMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(FilterMode::from_str_lenient(&s))
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Completed => write!(f, "completed"),
            Self::Pending => write!(f, "pending"),
            Self::Overdue => write!(f, "overdue"),
            Self::Today => write!(f, "today"),
        }
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(FilterMode::All),
            "completed" => Ok(FilterMode::Completed),
            "pending" => Ok(FilterMode::Pending),
            "overdue" => Ok(FilterMode::Overdue),
            "today" => Ok(FilterMode::Today),
            _ => Err(format!(
                "Invalid filter '{}'. Valid filters: all, completed, pending, overdue, today",
                s
            )),
        }
    }
}

impl FilterMode {
    /// Parses a mode string, treating anything unrecognized as `All`
    pub fn from_str_lenient(s: &str) -> Self {
        s.parse().unwrap_or(FilterMode::All)
    }
}

/// Applies a view filter to the list.
///
/// `overdue` and `today` both exclude completed todos; a due date is
/// overdue once its UTC midnight lies strictly before `now`, so a todo due
/// today already counts as overdue.
pub fn filter_todos(todos: Vec<Todo>, mode: FilterMode, now: DateTime<Utc>) -> Vec<Todo> {
    match mode {
        FilterMode::All => todos,
        FilterMode::Completed => todos.into_iter().filter(|t| t.completed).collect(),
        FilterMode::Pending => todos.into_iter().filter(|t| !t.completed).collect(),
        FilterMode::Overdue => todos
            .into_iter()
            .filter(|t| {
                !t.completed
                    && t.due_date
                        .map(|d| d.and_time(NaiveTime::MIN).and_utc() < now)
                        .unwrap_or(false)
            })
            .collect(),
        FilterMode::Today => {
            let today = now.date_naive();
            todos
                .into_iter()
                .filter(|t| !t.completed && t.due_date == Some(today))
                .collect()
        }
    }
}
