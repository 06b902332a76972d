use std::fmt;

use serde::Serialize;

/// Completed tasks needed per level.
pub const TASKS_PER_LEVEL: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Badge {
    FirstSteps,
    GettingStarted,
    Productive,
    TaskMaster,
    WeekWarrior,
    MonthChampion,
    Efficient,
}

impl Badge {
    pub fn label(&self) -> &'static str {
        match self {
            Badge::FirstSteps => "First Steps",
            Badge::GettingStarted => "Getting Started",
            Badge::Productive => "Productive",
            Badge::TaskMaster => "Task Master",
            Badge::WeekWarrior => "Week Warrior",
            Badge::MonthChampion => "Month Champion",
            Badge::Efficient => "Efficient",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy)]
enum Threshold {
    Completed(usize),
    Streak(u32),
    Rate(f64),
}

/// Badge rules in presentation order.
const BADGE_RULES: [(Badge, Threshold); 7] = [
    (Badge::FirstSteps, Threshold::Completed(1)),
    (Badge::GettingStarted, Threshold::Completed(10)),
    (Badge::Productive, Threshold::Completed(50)),
    (Badge::TaskMaster, Threshold::Completed(100)),
    (Badge::WeekWarrior, Threshold::Streak(7)),
    (Badge::MonthChampion, Threshold::Streak(30)),
    (Badge::Efficient, Threshold::Rate(0.8)),
];

pub fn user_level(completed: usize) -> usize {
    (completed / TASKS_PER_LEVEL + 1).max(1)
}

/// Fraction of the current level already earned, in `[0, 1)`.
pub fn progress_to_next_level(completed: usize) -> f64 {
    let into_level = completed - (user_level(completed) - 1) * TASKS_PER_LEVEL;
    into_level as f64 / TASKS_PER_LEVEL as f64
}

pub fn available_badges(completed: usize, streak: u32, completion_rate: f64) -> Vec<Badge> {
    BADGE_RULES
        .iter()
        .filter(|(_, threshold)| match *threshold {
            Threshold::Completed(min) => completed >= min,
            Threshold::Streak(min) => streak >= min,
            Threshold::Rate(min) => completion_rate >= min,
        })
        .map(|(badge, _)| *badge)
        .collect()
}

/// Snapshot of the gamification metrics for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub level: usize,
    pub progress_to_next_level: f64,
    pub badges: Vec<Badge>,
}

impl Progress {
    pub fn compute(completed: usize, streak: u32, completion_rate: f64) -> Self {
        Self {
            level: user_level(completed),
            progress_to_next_level: progress_to_next_level(completed),
            badges: available_badges(completed, streak, completion_rate),
        }
    }
}
