//! Derived, read-only views over a task collection.
//!
//! Everything here is a pure function of the slice it is given plus an
//! explicit "now" (and time zone for calendar questions), so results are
//! recomputed on every call and never cached across mutations.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::model::{Priority, Task};

/// Look-ahead for the "due soon" half of the suggestion rule.
pub const SUGGESTION_WINDOW_HOURS: i64 = 24;

pub fn completed_count(tasks: &[Task]) -> usize {
    tasks.iter().filter(|task| task.is_completed).count()
}

pub fn pending_count(tasks: &[Task]) -> usize {
    tasks.iter().filter(|task| !task.is_completed).count()
}

/// Share of completed tasks; 0 for an empty collection.
pub fn completion_rate(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    completed_count(tasks) as f64 / tasks.len() as f64
}

pub fn overdue_tasks(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    tasks.iter().filter(|task| task.is_overdue_at(now)).collect()
}

/// Tasks due within the local calendar day containing `now`.
pub fn tasks_due_today<'a, Tz: TimeZone>(
    tasks: &'a [Task],
    now: DateTime<Utc>,
    tz: &Tz,
) -> Vec<&'a Task> {
    let today = now.with_timezone(tz).date_naive();
    let start = start_of_day(today, tz);
    let end = today
        .succ_opt()
        .map(|tomorrow| start_of_day(tomorrow, tz))
        .unwrap_or(start + Duration::hours(24));

    tasks
        .iter()
        .filter(|task| matches!(task.due_date, Some(due) if due >= start && due < end))
        .collect()
}

fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    first_local_instant(date, |local| {
        tz.from_local_datetime(local)
            .earliest()
            .map(|resolved| resolved.with_timezone(&Utc))
    })
}

/// First whole hour of `date` that exists in local time. Midnight falls in a
/// DST gap in some zones, in which case the day starts at the end of the gap.
fn first_local_instant<F>(date: NaiveDate, resolve: F) -> DateTime<Utc>
where
    F: Fn(&NaiveDateTime) -> Option<DateTime<Utc>>,
{
    (0..24)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|local| resolve(&local))
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// Consecutive calendar days, ending today, with at least one completion.
/// Today without a completion means a streak of 0.
pub fn current_streak<Tz: TimeZone>(tasks: &[Task], now: DateTime<Utc>, tz: &Tz) -> u32 {
    let completion_days: HashSet<NaiveDate> = tasks
        .iter()
        .filter_map(|task| task.completed_date)
        .map(|completed| completed.with_timezone(tz).date_naive())
        .collect();

    let mut streak = 0;
    let mut day = Some(now.with_timezone(tz).date_naive());
    while let Some(current) = day {
        if !completion_days.contains(&current) {
            break;
        }
        streak += 1;
        day = current.pred_opt();
    }
    streak
}

/// Open tasks grouped by priority; collection order is kept inside each group.
pub fn tasks_by_priority(tasks: &[Task]) -> BTreeMap<Priority, Vec<&Task>> {
    let mut groups: BTreeMap<Priority, Vec<&Task>> = BTreeMap::new();
    for task in tasks.iter().filter(|task| !task.is_completed) {
        groups.entry(task.priority).or_default().push(task);
    }
    groups
}

/// Ranking shared by suggestions and task lists: priority descending, then
/// earlier due date (dated before undated), then title.
pub fn suggestion_order(a: &Task, b: &Task) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.title.cmp(&b.title))
}

fn is_suggestion_candidate(task: &Task, now: DateTime<Utc>) -> bool {
    !task.is_completed
        && (task.priority == Priority::Urgent
            || task.is_due_within(now, Duration::hours(SUGGESTION_WINDOW_HOURS)))
}

/// Open urgent tasks together with open tasks due within the next 24 hours
/// (past-due included), each task at most once, ranked by [`suggestion_order`].
pub fn smart_suggestions(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut candidates: Vec<&Task> = tasks
        .iter()
        .filter(|task| is_suggestion_candidate(task, now))
        .filter(|task| seen.insert(task.id()))
        .collect();
    candidates.sort_by(|a, b| suggestion_order(a, b));
    candidates
}

/// Smart suggestions, or every open task in the same ranking when there are none.
pub fn suggestions_or_fallback(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    let suggestions = smart_suggestions(tasks, now);
    if !suggestions.is_empty() {
        return suggestions;
    }
    let mut open: Vec<&Task> = tasks.iter().filter(|task| !task.is_completed).collect();
    open.sort_by(|a, b| suggestion_order(a, b));
    open
}

/// Filter for task lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub search: Option<String>,
    pub priority: Option<Priority>,
}

impl TaskQuery {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                task.title.to_lowercase().contains(&needle)
                    || task.description.to_lowercase().contains(&needle)
                    || task
                        .tags
                        .iter()
                        .any(|tag| tag.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

/// Tasks matching `query`, open before completed, each half in suggestion order.
pub fn filtered_tasks<'a>(tasks: &'a [Task], query: &TaskQuery) -> Vec<&'a Task> {
    let mut matching: Vec<&Task> = tasks.iter().filter(|task| query.matches(task)).collect();
    matching.sort_by(|a, b| {
        a.is_completed
            .cmp(&b.is_completed)
            .then_with(|| suggestion_order(a, b))
    });
    matching
}
