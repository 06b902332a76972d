use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::error::StorageError;
use crate::events::{ChangeEvent, SubscriptionId, Subscribers};
use crate::model::{NewTask, Priority, Task};
use crate::services::gamification::Progress;
use crate::services::metrics::{self, TaskQuery};
use crate::services::timer::FocusLedger;
use crate::storage::{MemoryRepository, TaskRepository, UnavailableRepository};

/// Sole owner of the task collection.
///
/// Every mutation is applied in memory first, then written through to the
/// repository, then announced to subscribers. A failed write is returned to
/// the caller while the in-memory collection stays authoritative.
///
/// Operations that name an unknown task id are silent no-ops: they report
/// `false`/`None`, touch neither memory nor storage, and emit no event.
pub struct TaskStore {
    tasks: Vec<Task>,
    repository: Box<dyn TaskRepository>,
    clock: Arc<dyn Clock>,
    subscribers: Subscribers,
}

impl fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks.len())
            .field("subscribers", &self.subscribers)
            .finish()
    }
}

impl TaskStore {
    /// Open a store over `repository` and load its contents. Missing or
    /// unreadable data yields an empty collection.
    pub fn open(repository: Box<dyn TaskRepository>, clock: Arc<dyn Clock>) -> Self {
        let mut store = Self {
            tasks: Vec::new(),
            repository,
            clock,
            subscribers: Subscribers::new(),
        };
        store.tasks = store.read_repository();
        store
    }

    /// Open the configured backend. A store that cannot be opened at all is
    /// treated like an unreadable one: the session starts empty and every
    /// later save reports the failure.
    pub fn from_config(config: &AppConfig) -> Self {
        let repository = match config.open_repository() {
            Ok(repository) => repository,
            Err(err) => {
                tracing::warn!(
                    error = %format!("{err:#}"),
                    backend = %config.backend(),
                    "failed to open task storage; starting with an empty collection"
                );
                Box::new(UnavailableRepository::new(format!("{err:#}")))
            }
        };
        Self::open(repository, Arc::new(SystemClock))
    }

    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryRepository::new()), Arc::new(SystemClock))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + Send + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Replace the in-memory collection with what storage holds.
    pub fn load(&mut self) -> usize {
        self.tasks = self.read_repository();
        let count = self.tasks.len();
        self.subscribers.notify(&ChangeEvent::Reloaded { count });
        count
    }

    pub fn save(&mut self) -> Result<(), StorageError> {
        self.repository.save_all(&self.tasks)
    }

    fn read_repository(&self) -> Vec<Task> {
        match self.repository.load_all() {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "tasks loaded");
                tasks
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load tasks; starting with an empty collection");
                Vec::new()
            }
        }
    }

    fn commit(&mut self, event: ChangeEvent) -> Result<(), StorageError> {
        let saved = self.save();
        if let Err(err) = &saved {
            tracing::error!(error = %err, "failed to persist tasks");
        }
        self.subscribers.notify(&event);
        saved
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id() == id)
    }

    /// Append a task under a freshly generated id.
    pub fn add(&mut self, new_task: NewTask) -> Result<Task, StorageError> {
        let task = new_task.into_task();
        self.tasks.push(task.clone());
        self.commit(ChangeEvent::TaskAdded(task.id().to_string()))?;
        Ok(task)
    }

    /// Replace the stored task with the same id. Returns `false` when no such
    /// task exists.
    pub fn update(&mut self, task: Task) -> Result<bool, StorageError> {
        let Some(index) = self.position(task.id()) else {
            tracing::debug!(task_id = task.id(), "update ignored; task not found");
            return Ok(false);
        };
        let id = task.id().to_string();
        self.tasks[index] = task;
        self.commit(ChangeEvent::TaskUpdated(id))?;
        Ok(true)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, StorageError> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        self.tasks.remove(index);
        self.commit(ChangeEvent::TaskDeleted(id.to_string()))?;
        Ok(true)
    }

    /// Flip completion, stamping or clearing the completion date with it.
    /// Returns the new completion state, or `None` for an unknown id.
    pub fn toggle_completion(&mut self, id: &str) -> Result<Option<bool>, StorageError> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };
        let now = self.clock.now();
        let task = &mut self.tasks[index];
        if task.is_completed {
            task.uncomplete();
        } else {
            task.complete_at(now);
        }
        let completed = task.is_completed;
        self.commit(ChangeEvent::CompletionToggled {
            id: id.to_string(),
            completed,
        })?;
        Ok(Some(completed))
    }

    /// Remove every task.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.tasks.clear();
        self.commit(ChangeEvent::TasksCleared)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        metrics::completed_count(&self.tasks)
    }

    pub fn pending_count(&self) -> usize {
        metrics::pending_count(&self.tasks)
    }

    pub fn completion_rate(&self) -> f64 {
        metrics::completion_rate(&self.tasks)
    }

    pub fn overdue_tasks(&self) -> Vec<&Task> {
        metrics::overdue_tasks(&self.tasks, self.now())
    }

    pub fn tasks_due_today(&self) -> Vec<&Task> {
        metrics::tasks_due_today(&self.tasks, self.now(), &Local)
    }

    pub fn current_streak(&self) -> u32 {
        metrics::current_streak(&self.tasks, self.now(), &Local)
    }

    pub fn tasks_by_priority(&self) -> BTreeMap<Priority, Vec<&Task>> {
        metrics::tasks_by_priority(&self.tasks)
    }

    pub fn smart_suggestions(&self) -> Vec<&Task> {
        metrics::smart_suggestions(&self.tasks, self.now())
    }

    pub fn suggestions_or_fallback(&self) -> Vec<&Task> {
        metrics::suggestions_or_fallback(&self.tasks, self.now())
    }

    pub fn filtered_tasks(&self, query: &TaskQuery) -> Vec<&Task> {
        metrics::filtered_tasks(&self.tasks, query)
    }

    pub fn progress(&self) -> Progress {
        Progress::compute(
            self.completed_count(),
            self.current_streak(),
            self.completion_rate(),
        )
    }
}

impl FocusLedger for TaskStore {
    fn record_focus(&mut self, task_id: &str, minutes: u32) -> Result<bool, StorageError> {
        let Some(mut task) = self.get(task_id).cloned() else {
            tracing::debug!(task_id, "focus minutes dropped; task no longer exists");
            return Ok(false);
        };
        task.actual_minutes = task.actual_minutes.saturating_add(minutes);
        self.update(task)
    }
}
