//! Two-phase focus/break countdown.
//!
//! The timer never owns a clock: the host calls [`FocusTimer::tick`] once per
//! elapsed second while the timer is running. A completed phase always lands
//! in the idle state with the next phase loaded, waiting for an explicit
//! [`FocusTimer::start`].

use serde::Serialize;

use crate::config::TimerConfig;
use crate::error::StorageError;
use crate::events::{ChangeEvent, SubscriptionId, Subscribers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Focus,
    Break,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Focus => "Focus Time",
            Phase::Break => "Break Time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimerState {
    Idle,
    Running(Phase),
    Paused(Phase),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Idle,
    Running,
    Paused,
}

/// Where completed focus minutes are credited.
pub trait FocusLedger {
    /// Add `minutes` to the task's actual time. Returns `false` when the task
    /// no longer exists.
    fn record_focus(&mut self, task_id: &str, minutes: u32) -> Result<bool, StorageError>;
}

/// Report of a phase that ran down to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseCompletion {
    pub phase: Phase,
    pub task_id: Option<String>,
    pub minutes_recorded: u32,
}

#[derive(Debug)]
pub struct FocusTimer {
    config: TimerConfig,
    status: Status,
    phase: Phase,
    remaining_seconds: u32,
    bound_task: Option<String>,
    subscribers: Subscribers,
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}

impl FocusTimer {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            status: Status::Idle,
            phase: Phase::Focus,
            remaining_seconds: config.focus_seconds,
            bound_task: None,
            subscribers: Subscribers::new(),
        }
    }

    pub fn config(&self) -> TimerConfig {
        self.config
    }

    pub fn state(&self) -> TimerState {
        match self.status {
            Status::Idle => TimerState::Idle,
            Status::Running => TimerState::Running(self.phase),
            Status::Paused => TimerState::Paused(self.phase),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    pub fn is_break_phase(&self) -> bool {
        self.phase == Phase::Break
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn bound_task(&self) -> Option<&str> {
        self.bound_task.as_deref()
    }

    pub fn is_bound_to(&self, task_id: &str) -> bool {
        self.bound_task.as_deref() == Some(task_id)
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

    fn phase_duration(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Focus => self.config.focus_seconds,
            Phase::Break => self.config.break_seconds,
        }
    }

    fn announce(&mut self) {
        let event = ChangeEvent::TimerChanged {
            state: self.state(),
            remaining_seconds: self.remaining_seconds,
        };
        self.subscribers.notify(&event);
    }

    /// Start or resume the countdown. Resuming from pause keeps the remaining
    /// time; starting from idle loads the full duration of the current phase.
    /// A given task id replaces the binding, `None` keeps the existing one.
    /// Returns `false` when already running.
    pub fn start(&mut self, task_id: Option<&str>) -> bool {
        if self.status == Status::Running {
            return false;
        }
        if self.status == Status::Idle {
            self.remaining_seconds = self.phase_duration(self.phase);
        }
        if let Some(id) = task_id {
            self.bound_task = Some(id.to_string());
        }
        self.status = Status::Running;
        self.announce();
        true
    }

    /// Returns `false` unless the timer was running.
    pub fn pause(&mut self) -> bool {
        if self.status != Status::Running {
            return false;
        }
        self.status = Status::Paused;
        self.announce();
        true
    }

    /// Back to an idle focus phase with no bound task.
    pub fn stop(&mut self) {
        self.status = Status::Idle;
        self.phase = Phase::Focus;
        self.remaining_seconds = self.config.focus_seconds;
        self.bound_task = None;
        self.announce();
    }

    /// Advance one second. Does nothing unless running. When the countdown
    /// reaches zero the phase completes exactly once; a finished focus phase
    /// credits the bound task through `ledger`.
    pub fn tick(
        &mut self,
        ledger: &mut dyn FocusLedger,
    ) -> Result<Option<PhaseCompletion>, StorageError> {
        if self.status != Status::Running {
            return Ok(None);
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            self.announce();
            return Ok(None);
        }
        self.complete_phase(ledger).map(Some)
    }

    fn complete_phase(
        &mut self,
        ledger: &mut dyn FocusLedger,
    ) -> Result<PhaseCompletion, StorageError> {
        let finished = self.phase;
        self.status = Status::Idle;

        let mut recorded = Ok(false);
        let mut minutes_recorded = 0;
        match finished {
            Phase::Break => {
                self.phase = Phase::Focus;
            }
            Phase::Focus => {
                if let Some(task_id) = self.bound_task.as_deref() {
                    recorded = ledger.record_focus(task_id, self.config.focus_minutes());
                    if matches!(recorded, Ok(true)) {
                        minutes_recorded = self.config.focus_minutes();
                    }
                }
                self.phase = Phase::Break;
            }
        }
        self.remaining_seconds = self.phase_duration(self.phase);

        let completion = PhaseCompletion {
            phase: finished,
            task_id: self.bound_task.clone(),
            minutes_recorded,
        };
        tracing::info!(
            phase = ?finished,
            task_id = ?completion.task_id,
            minutes_recorded,
            "focus timer phase completed"
        );
        self.subscribers.notify(&ChangeEvent::PhaseCompleted {
            phase: finished,
            task_id: completion.task_id.clone(),
        });
        self.announce();
        recorded?;
        Ok(completion)
    }

    /// Remaining time as `MM:SS`.
    pub fn display_text(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_seconds / 60,
            self.remaining_seconds % 60
        )
    }

    /// Fraction of the current phase already elapsed.
    pub fn progress(&self) -> f64 {
        let total = self.phase_duration(self.phase);
        if total == 0 {
            return 0.0;
        }
        let elapsed = total.saturating_sub(self.remaining_seconds);
        elapsed as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Ledger {
        minutes: HashMap<String, u32>,
        calls: usize,
    }

    impl Ledger {
        fn with_task(id: &str) -> Self {
            let mut ledger = Self::default();
            ledger.minutes.insert(id.to_string(), 0);
            ledger
        }
    }

    impl FocusLedger for Ledger {
        fn record_focus(&mut self, task_id: &str, minutes: u32) -> Result<bool, StorageError> {
            self.calls += 1;
            match self.minutes.get_mut(task_id) {
                Some(total) => {
                    *total += minutes;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    struct BrokenLedger;

    impl FocusLedger for BrokenLedger {
        fn record_focus(&mut self, _task_id: &str, _minutes: u32) -> Result<bool, StorageError> {
            Err(StorageError::Corrupt("write failed".into()))
        }
    }

    fn run_ticks(timer: &mut FocusTimer, ledger: &mut Ledger, count: u32) -> Vec<PhaseCompletion> {
        (0..count)
            .filter_map(|_| timer.tick(ledger).unwrap())
            .collect()
    }

    #[test]
    fn new_timer_is_idle_in_focus_phase() {
        let timer = FocusTimer::default();
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.remaining_seconds(), 1500);
        assert!(!timer.is_break_phase());
        assert_eq!(timer.display_text(), "25:00");
    }

    #[test]
    fn full_focus_phase_credits_bound_task_and_loads_break() {
        let mut timer = FocusTimer::default();
        let mut ledger = Ledger::with_task("task-1");
        assert!(timer.start(Some("task-1")));
        assert_eq!(timer.remaining_seconds(), 1500);

        let completions = run_ticks(&mut timer, &mut ledger, 1500);
        assert_eq!(
            completions,
            vec![PhaseCompletion {
                phase: Phase::Focus,
                task_id: Some("task-1".into()),
                minutes_recorded: 25,
            }]
        );
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.phase(), Phase::Break);
        assert_eq!(timer.remaining_seconds(), 300);
        assert_eq!(ledger.minutes["task-1"], 25);
        assert_eq!(ledger.calls, 1);
    }

    #[test]
    fn ticks_after_completion_do_nothing_until_restarted() {
        let mut timer = FocusTimer::default();
        let mut ledger = Ledger::with_task("t");
        timer.start(Some("t"));
        run_ticks(&mut timer, &mut ledger, 1600);
        assert_eq!(timer.remaining_seconds(), 300);
        assert_eq!(ledger.calls, 1);
    }

    #[test]
    fn break_completion_returns_to_focus_without_crediting() {
        let mut timer = FocusTimer::default();
        let mut ledger = Ledger::with_task("t");
        timer.start(Some("t"));
        run_ticks(&mut timer, &mut ledger, 1500);

        assert!(timer.start(None));
        assert_eq!(timer.state(), TimerState::Running(Phase::Break));
        assert_eq!(timer.bound_task(), Some("t"));
        let completions = run_ticks(&mut timer, &mut ledger, 300);

        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].phase, Phase::Break);
        assert_eq!(completions[0].minutes_recorded, 0);
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.phase(), Phase::Focus);
        assert_eq!(timer.remaining_seconds(), 1500);
        assert_eq!(ledger.calls, 1);
    }

    #[test]
    fn pause_preserves_remaining_and_resume_continues() {
        let mut timer = FocusTimer::default();
        let mut ledger = Ledger::default();
        timer.start(None);
        run_ticks(&mut timer, &mut ledger, 100);
        assert!(timer.pause());
        assert_eq!(timer.state(), TimerState::Paused(Phase::Focus));

        run_ticks(&mut timer, &mut ledger, 50);
        assert_eq!(timer.remaining_seconds(), 1400);

        assert!(timer.start(None));
        assert_eq!(timer.remaining_seconds(), 1400);
        assert_eq!(timer.display_text(), "23:20");
    }

    #[test]
    fn misuse_is_an_idempotent_no_op() {
        let mut timer = FocusTimer::default();
        assert!(!timer.pause());
        timer.stop();
        timer.stop();
        assert_eq!(timer.state(), TimerState::Idle);
        assert!(timer.start(None));
        assert!(!timer.start(Some("other")));
        assert_eq!(timer.bound_task(), None);
    }

    #[test]
    fn stop_resets_everything() {
        let mut timer = FocusTimer::default();
        let mut ledger = Ledger::with_task("t");
        timer.start(Some("t"));
        run_ticks(&mut timer, &mut ledger, 1500);
        timer.stop();
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.phase(), Phase::Focus);
        assert_eq!(timer.remaining_seconds(), 1500);
        assert_eq!(timer.bound_task(), None);
    }

    #[test]
    fn unbound_focus_phase_records_nothing() {
        let mut timer = FocusTimer::new(TimerConfig {
            focus_seconds: 3,
            break_seconds: 1,
        });
        let mut ledger = Ledger::default();
        timer.start(None);
        let completions = run_ticks(&mut timer, &mut ledger, 3);
        assert_eq!(completions[0].task_id, None);
        assert_eq!(ledger.calls, 0);
        assert!(timer.is_break_phase());
        assert_eq!(timer.remaining_seconds(), 1);
    }

    #[test]
    fn missing_task_is_tolerated() {
        let mut timer = FocusTimer::new(TimerConfig {
            focus_seconds: 60,
            break_seconds: 10,
        });
        let mut ledger = Ledger::default();
        timer.start(Some("gone"));
        let completions = run_ticks(&mut timer, &mut ledger, 60);
        assert_eq!(completions[0].minutes_recorded, 0);
        assert_eq!(ledger.calls, 1);
    }

    #[test]
    fn ledger_failure_still_moves_to_break() {
        let mut timer = FocusTimer::new(TimerConfig {
            focus_seconds: 1,
            break_seconds: 5,
        });
        timer.start(Some("t"));
        assert!(timer.tick(&mut BrokenLedger).is_err());
        assert_eq!(timer.state(), TimerState::Idle);
        assert!(timer.is_break_phase());
        assert_eq!(timer.remaining_seconds(), 5);
    }

    #[test]
    fn zero_length_phase_completes_on_first_tick() {
        let mut timer = FocusTimer::new(TimerConfig {
            focus_seconds: 0,
            break_seconds: 0,
        });
        let mut ledger = Ledger::default();
        timer.start(None);
        assert_eq!(run_ticks(&mut timer, &mut ledger, 5).len(), 1);
        assert_eq!(timer.remaining_seconds(), 0);
    }

    #[test]
    fn progress_tracks_elapsed_fraction() {
        let mut timer = FocusTimer::new(TimerConfig {
            focus_seconds: 100,
            break_seconds: 20,
        });
        let mut ledger = Ledger::default();
        assert_eq!(timer.progress(), 0.0);
        timer.start(None);
        run_ticks(&mut timer, &mut ledger, 25);
        assert!((timer.progress() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn announces_state_changes() {
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut timer = FocusTimer::new(TimerConfig {
            focus_seconds: 2,
            break_seconds: 1,
        });
        timer.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        let mut ledger = Ledger::default();

        timer.start(None);
        run_ticks(&mut timer, &mut ledger, 2);

        let events = seen.lock().unwrap();
        assert!(events.contains(&ChangeEvent::PhaseCompleted {
            phase: Phase::Focus,
            task_id: None
        }));
        assert_eq!(
            events.last(),
            Some(&ChangeEvent::TimerChanged {
                state: TimerState::Idle,
                remaining_seconds: 1
            })
        );
    }
}
