use thiserror::Error;

use crate::model::Priority;

/// Normalized input for creating a task from any client (CLI, UI shell).
///
/// This is the only place titles and estimates are validated; the store
/// accepts whatever [`crate::model::NewTask`] it is handed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInput {
    pub text: Vec<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<String>,
    pub estimated_minutes: Option<u32>,
    pub tags: Vec<String>,
}

impl TaskInput {
    pub fn require_text(&self) -> Result<(), CaptureError> {
        if self.text.iter().all(|word| word.trim().is_empty()) {
            return Err(CaptureError::EmptyTitle);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Task title cannot be empty")]
    EmptyTitle,
    #[error("Estimated minutes must be greater than zero")]
    NonPositiveEstimate,
    #[error("Unknown priority '{0}': expected low|medium|high|urgent")]
    UnknownPriority(String),
    #[error("Unrecognized date specification '{0}'. Try YYYY-MM-DD, today, tomorrow, +3d, mon")]
    InvalidDate(String),
    #[error("Invalid duration '{0}'. Try 45, 45m or 2h")]
    InvalidDuration(String),
}
