//! Task list module
//!
//! This module handles the to-do list kept next to the timer: the task data
//! structures, the in-memory `TaskManager` and its optional SQLite mirror.

pub mod manager;
pub mod store;

pub use manager::TaskManager;
pub use store::{SqliteTaskRepository, StoreError, TaskRepository, TaskRow};

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for task input that cannot be accepted
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("unknown priority '{0}' (expected Low, Medium or High)")]
    UnknownPriority(String),

    #[error("invalid due date '{0}' (expected YYYY-MM-DD)")]
    InvalidDueDate(String),
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    /// Sort rank, higher is more urgent
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Priority::Low),
            "Medium" => Ok(Priority::Medium),
            "High" => Ok(Priority::High),
            other => Err(TaskError::UnknownPriority(other.to_string())),
        }
    }
}

/// A to-do item; the title is its key within the list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    pub priority: Priority,
    /// Serialized as `YYYY-MM-DD` or `null`
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
}

impl Task {
    /// Create an open task
    pub fn new(title: impl Into<String>, priority: Priority, due_date: Option<NaiveDate>) -> Self {
        Self {
            title: title.into(),
            priority,
            due_date,
            completed: false,
        }
    }

    pub fn mark_complete(&mut self) {
        self.completed = true;
    }
}

/// Parse a due date given as `YYYY-MM-DD` or as a full ISO-8601 datetime
pub fn parse_due_date(s: &str) -> Result<NaiveDate, TaskError> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt.date());
        }
    }
    Err(TaskError::InvalidDueDate(s.to_string()))
}
