use crate::config::AppConfig;
use crate::error::StorageError;
use crate::events::{ChangeEvent, SubscriptionId};
use crate::model::{NewTask, Task};
use crate::services::tasks::TaskStore;
use crate::services::timer::{FocusTimer, PhaseCompletion};

/// Composition root for one running session: the single task store and the
/// single focus timer, wired so that rules spanning both hold.
#[derive(Debug)]
pub struct Session {
    store: TaskStore,
    timer: FocusTimer,
}

impl Session {
    pub fn new(store: TaskStore, timer: FocusTimer) -> Self {
        Self { store, timer }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(TaskStore::from_config(config), FocusTimer::new(config.timer()))
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn timer(&self) -> &FocusTimer {
        &self.timer
    }

    pub fn subscribe_store<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + Send + 'static,
    {
        self.store.subscribe(callback)
    }

    pub fn subscribe_timer<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + Send + 'static,
    {
        self.timer.subscribe(callback)
    }

    pub fn add(&mut self, new_task: NewTask) -> Result<Task, StorageError> {
        self.store.add(new_task)
    }

    pub fn update(&mut self, task: Task) -> Result<bool, StorageError> {
        self.store.update(task)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, StorageError> {
        self.store.delete(id)
    }

    /// Toggle completion; completing the task the timer is bound to stops the timer.
    pub fn toggle_completion(&mut self, id: &str) -> Result<Option<bool>, StorageError> {
        let toggled = self.store.toggle_completion(id);
        let completed = match &toggled {
            Ok(state) => *state,
            Err(_) => self.store.get(id).map(|task| task.is_completed),
        };
        if completed == Some(true) && self.timer.is_bound_to(id) {
            self.timer.stop();
        }
        toggled
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.store.clear()
    }

    pub fn start_focus(&mut self, task_id: Option<&str>) -> bool {
        self.timer.start(task_id)
    }

    pub fn pause_focus(&mut self) -> bool {
        self.timer.pause()
    }

    pub fn stop_focus(&mut self) {
        self.timer.stop()
    }

    /// Deliver one elapsed second to the timer.
    pub fn tick(&mut self) -> Result<Option<PhaseCompletion>, StorageError> {
        self.timer.tick(&mut self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimerConfig;
    use crate::services::timer::{Phase, TimerState};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn session() -> Session {
        Session::new(TaskStore::in_memory(), FocusTimer::default())
    }

    #[test]
    fn completed_focus_phase_adds_twenty_five_minutes() {
        let mut session = session();
        let id = session.add(NewTask::titled("Write report")).unwrap().id().to_string();

        assert!(session.start_focus(Some(&id)));
        assert_eq!(session.timer().remaining_seconds(), 1500);
        let mut completions = Vec::new();
        for _ in 0..1500 {
            if let Some(done) = session.tick().unwrap() {
                completions.push(done);
            }
        }

        assert_eq!(completions.len(), 1);
        assert_eq!(session.timer().phase(), Phase::Break);
        assert_eq!(session.timer().remaining_seconds(), 300);
        assert_eq!(session.store().get(&id).unwrap().actual_minutes, 25);
    }

    #[test]
    fn completing_bound_task_stops_timer() {
        let mut session = session();
        let id = session.add(NewTask::titled("Focus me")).unwrap().id().to_string();
        session.start_focus(Some(&id));
        session.tick().unwrap();

        assert_eq!(session.toggle_completion(&id).unwrap(), Some(true));
        assert_eq!(session.timer().state(), TimerState::Idle);
        assert_eq!(session.timer().bound_task(), None);
        assert_eq!(session.timer().remaining_seconds(), 1500);
    }

    #[test]
    fn completing_other_task_leaves_timer_running() {
        let mut session = session();
        let bound = session.add(NewTask::titled("Bound")).unwrap().id().to_string();
        let other = session.add(NewTask::titled("Other")).unwrap().id().to_string();
        session.start_focus(Some(&bound));

        session.toggle_completion(&other).unwrap();
        assert_eq!(session.timer().state(), TimerState::Running(Phase::Focus));
        assert_eq!(session.timer().bound_task(), Some(bound.as_str()));
    }

    #[test]
    fn reopening_bound_task_does_not_stop_timer() {
        let mut session = session();
        let id = session.add(NewTask::titled("Reopen")).unwrap().id().to_string();
        session.toggle_completion(&id).unwrap();
        session.start_focus(Some(&id));

        assert_eq!(session.toggle_completion(&id).unwrap(), Some(false));
        assert!(session.timer().is_running());
    }

    #[test]
    fn deleted_bound_task_is_not_credited() {
        let mut session = Session::new(
            TaskStore::in_memory(),
            FocusTimer::new(TimerConfig {
                focus_seconds: 120,
                break_seconds: 30,
            }),
        );
        let id = session.add(NewTask::titled("Ephemeral")).unwrap().id().to_string();
        session.start_focus(Some(&id));
        session.delete(&id).unwrap();

        let mut last = None;
        for _ in 0..120 {
            last = session.tick().unwrap().or(last);
        }
        let completion = last.expect("focus phase completed");
        assert_eq!(completion.minutes_recorded, 0);
        assert!(session.store().is_empty());
    }

    #[test]
    fn corrupt_database_does_not_prevent_startup() {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).expect("config");
        std::fs::write(config.db_path(), b"garbage bytes where sqlite should be").unwrap();

        let session = Session::from_config(&config);
        assert!(session.store().is_empty());
        assert_eq!(session.timer().state(), TimerState::Idle);
    }

    #[test]
    fn subscribers_observe_store_and_timer_changes() {
        let mut session = session();
        let store_events = Arc::new(Mutex::new(Vec::new()));
        let timer_events = Arc::new(Mutex::new(Vec::new()));
        let store_sink = store_events.clone();
        let timer_sink = timer_events.clone();
        session.subscribe_store(move |event| store_sink.lock().unwrap().push(event.clone()));
        session.subscribe_timer(move |event| timer_sink.lock().unwrap().push(event.clone()));

        let id = session.add(NewTask::titled("Watched")).unwrap().id().to_string();
        session.start_focus(Some(&id));
        session.toggle_completion(&id).unwrap();

        assert_eq!(
            *store_events.lock().unwrap(),
            vec![
                ChangeEvent::TaskAdded(id.clone()),
                ChangeEvent::CompletionToggled {
                    id,
                    completed: true
                },
            ]
        );
        assert_eq!(
            *timer_events.lock().unwrap(),
            vec![
                ChangeEvent::TimerChanged {
                    state: TimerState::Running(Phase::Focus),
                    remaining_seconds: 1500,
                },
                ChangeEvent::TimerChanged {
                    state: TimerState::Idle,
                    remaining_seconds: 1500,
                },
            ]
        );
    }
}
