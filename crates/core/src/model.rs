use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::capture::CaptureError;

pub const DEFAULT_ESTIMATED_MINUTES: u32 = 30;

/// Task priority, totally ordered `Low < Medium < High < Urgent`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Priority {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" | "0" => Ok(Priority::Low),
            "medium" | "med" | "m" | "1" => Ok(Priority::Medium),
            "high" | "h" | "2" => Ok(Priority::High),
            "urgent" | "u" | "3" => Ok(Priority::Urgent),
            other => Err(CaptureError::UnknownPriority(other.to_string())),
        }
    }
}

impl ValueEnum for Priority {
    fn value_variants<'a>() -> &'a [Self] {
        &Priority::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

/// A tracked unit of work. The identifier is fixed at creation; everything
/// else may be edited by the owner of the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub(crate) id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub completed_date: Option<DateTime<Utc>>,
    #[serde(default = "default_estimated_minutes")]
    pub estimated_minutes: u32,
    #[serde(default)]
    pub actual_minutes: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_estimated_minutes() -> u32 {
    DEFAULT_ESTIMATED_MINUTES
}

impl Task {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Overdue means a due date strictly before `now` on a task that is still open.
    /// Never stored; always evaluated against the caller's clock.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => !self.is_completed && due < now,
            None => false,
        }
    }

    /// True when the due date is at most `window` after `now`, past-due included.
    pub fn is_due_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.due_date.map_or(false, |due| due - now <= window)
    }

    pub fn complete_at(&mut self, when: DateTime<Utc>) {
        self.is_completed = true;
        self.completed_date = Some(when);
    }

    pub fn uncomplete(&mut self) {
        self.is_completed = false;
        self.completed_date = None;
    }

    /// Append a tag unless an identical one is present. Returns whether it was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|existing| existing == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|existing| existing != tag);
        before != self.tags.len()
    }
}

/// Attributes for a task that has not been assigned an identifier yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub estimated_minutes: u32,
    pub tags: Vec<String>,
}

impl Default for NewTask {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            due_date: None,
            priority: Priority::default(),
            estimated_minutes: DEFAULT_ESTIMATED_MINUTES,
            tags: Vec::new(),
        }
    }
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn into_task(self) -> Task {
        self.into_task_with_id(Ulid::new().to_string())
    }

    pub(crate) fn into_task_with_id(self, id: String) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            priority: self.priority,
            is_completed: false,
            completed_date: None,
            estimated_minutes: self.estimated_minutes,
            actual_minutes: 0,
            tags: self.tags,
        }
    }
}

impl From<&Task> for NewTask {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            priority: task.priority,
            estimated_minutes: task.estimated_minutes,
            tags: task.tags.clone(),
        }
    }
}
