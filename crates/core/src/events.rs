//! Change notifications so a reactive shell can re-render after each mutation.

use std::fmt;

use crate::services::timer::{Phase, TimerState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    TaskAdded(String),
    TaskUpdated(String),
    TaskDeleted(String),
    CompletionToggled { id: String, completed: bool },
    TasksCleared,
    Reloaded { count: usize },
    TimerChanged { state: TimerState, remaining_seconds: u32 },
    PhaseCompleted { phase: Phase, task_id: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&ChangeEvent) + Send>;

/// Registered observers, called in subscription order.
#[derive(Default)]
pub struct Subscribers {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Callback)>,
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.callbacks.len())
            .finish()
    }
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        before != self.callbacks.len()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn notify(&mut self, event: &ChangeEvent) {
        match event {
            ChangeEvent::TaskAdded(id) => tracing::debug!(task_id = id.as_str(), "task added"),
            ChangeEvent::TaskUpdated(id) => tracing::debug!(task_id = id.as_str(), "task updated"),
            ChangeEvent::TaskDeleted(id) => tracing::debug!(task_id = id.as_str(), "task deleted"),
            ChangeEvent::CompletionToggled { id, completed } => {
                tracing::debug!(task_id = id.as_str(), completed, "task completion toggled")
            }
            ChangeEvent::TasksCleared => tracing::debug!("tasks cleared"),
            ChangeEvent::Reloaded { count } => tracing::debug!(count, "tasks reloaded"),
            ChangeEvent::TimerChanged {
                state,
                remaining_seconds,
            } => tracing::trace!(state = ?state, remaining_seconds, "timer changed"),
            ChangeEvent::PhaseCompleted { phase, task_id } => {
                tracing::debug!(phase = ?phase, task_id = ?task_id, "timer phase completed")
            }
        }
        for (_, callback) in self.callbacks.iter_mut() {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn delivers_events_until_unsubscribed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut subscribers = Subscribers::new();
        let sink = seen.clone();
        let id = subscribers.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        subscribers.notify(&ChangeEvent::TaskAdded("a".into()));
        assert!(subscribers.unsubscribe(id));
        assert!(!subscribers.unsubscribe(id));
        subscribers.notify(&ChangeEvent::TaskDeleted("a".into()));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ChangeEvent::TaskAdded("a".into())]
        );
        assert!(subscribers.is_empty());
    }

    #[test]
    fn ids_are_unique_per_registry() {
        let mut subscribers = Subscribers::new();
        let first = subscribers.subscribe(|_| {});
        let second = subscribers.subscribe(|_| {});
        assert_ne!(first, second);
        assert_eq!(subscribers.len(), 2);
    }
}
