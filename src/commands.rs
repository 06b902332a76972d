use std::fmt;
use std::io::Write;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, Utc};
use taskfusion_core::{Session, Task, TaskQuery};

use crate::capture::{CaptureError, TaskInput};
use crate::cli::{CliCommand, DeleteArgs, EditArgs, ListArgs, ResetArgs};
use crate::parser;

pub fn execute<W: Write>(session: &mut Session, command: CliCommand, mut writer: W) -> Result<()> {
    match command {
        CliCommand::Add(args) => handle_add(session, TaskInput::from(args), &mut writer),
        CliCommand::List(args) => handle_list(session, &args, &mut writer),
        CliCommand::Edit(args) => handle_edit(session, &args, &mut writer),
        CliCommand::Toggle(args) => handle_toggle(session, &args.id, &mut writer),
        CliCommand::Delete(args) => handle_delete(session, &args, &mut writer),
        CliCommand::Stats => handle_stats(session, &mut writer),
        CliCommand::Suggest => handle_suggest(session, &mut writer),
        CliCommand::Reset(args) => handle_reset(session, &args, &mut writer),
        CliCommand::Focus(_) => Err(anyhow!("focus runs on the async timer loop")),
    }
}

fn handle_add<W: Write>(session: &mut Session, input: TaskInput, mut writer: W) -> Result<()> {
    let new_task = parser::prepare_new_task(&input)?;
    let task = session.add(new_task)?;
    writeln!(writer, "Added {} {}", task.id(), task.title)?;
    Ok(())
}

fn handle_list<W: Write>(session: &Session, args: &ListArgs, mut writer: W) -> Result<()> {
    let store = session.store();
    let now = store.now();

    if args.grouped {
        let groups = store.tasks_by_priority();
        if groups.is_empty() {
            writeln!(writer, "No open tasks")?;
        }
        for (priority, tasks) in groups.iter().rev() {
            writeln!(writer, "{} ({})", priority, tasks.len())?;
            for task in tasks {
                writeln!(writer, "  {}", TaskLine { task: *task, now })?;
            }
        }
        return Ok(());
    }

    let query = TaskQuery {
        search: args.search.clone(),
        priority: args.priority,
    };
    let tasks = store.filtered_tasks(&query);
    if tasks.is_empty() {
        writeln!(writer, "No tasks found")?;
    }
    for task in tasks {
        writeln!(writer, "{}", TaskLine { task, now })?;
    }
    Ok(())
}

fn handle_edit<W: Write>(session: &mut Session, args: &EditArgs, mut writer: W) -> Result<()> {
    let Some(existing) = session.store().get(&args.id) else {
        writeln!(writer, "Not found: {}", args.id)?;
        return Ok(());
    };

    let mut task = existing.clone();
    if let Some(title) = &args.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(CaptureError::EmptyTitle.into());
        }
        task.title = title.to_string();
    }
    if let Some(description) = &args.description {
        task.description = description.trim().to_string();
    }
    if let Some(priority) = args.priority {
        task.priority = priority;
    }
    if let Some(spec) = &args.due_date {
        task.due_date = Some(parser::parse_date_spec(spec)?);
    }
    if args.clear_due {
        task.due_date = None;
    }
    if let Some(minutes) = args.estimated_minutes {
        if minutes == 0 {
            return Err(CaptureError::NonPositiveEstimate.into());
        }
        task.estimated_minutes = minutes;
    }
    for tag in parser::normalize_tags(&args.add_tags) {
        task.add_tag(&tag);
    }
    for tag in parser::normalize_tags(&args.remove_tags) {
        task.remove_tag(&tag);
    }

    let title = task.title.clone();
    if session.update(task)? {
        writeln!(writer, "Updated {} {}", args.id, title)?;
    } else {
        writeln!(writer, "Not found: {}", args.id)?;
    }
    Ok(())
}

fn handle_toggle<W: Write>(session: &mut Session, id: &str, mut writer: W) -> Result<()> {
    match session.toggle_completion(id)? {
        Some(true) => writeln!(writer, "Completed {}", id)?,
        Some(false) => writeln!(writer, "Reopened {}", id)?,
        None => writeln!(writer, "Not found: {}", id)?,
    }
    Ok(())
}

fn handle_delete<W: Write>(session: &mut Session, args: &DeleteArgs, mut writer: W) -> Result<()> {
    let mut deleted = 0usize;
    let mut missing = Vec::new();
    for id in &args.ids {
        if session.delete(id)? {
            deleted += 1;
        } else {
            missing.push(id.clone());
        }
    }
    writeln!(writer, "{}", SummaryLine::deleted(deleted))?;
    if !missing.is_empty() {
        writeln!(writer, "Not found: {}", missing.join(", "))?;
    }
    Ok(())
}

fn handle_stats<W: Write>(session: &Session, mut writer: W) -> Result<()> {
    let store = session.store();
    let progress = store.progress();
    let streak = store.current_streak();

    writeln!(writer, "Completed: {}", store.completed_count())?;
    writeln!(writer, "Pending: {}", store.pending_count())?;
    writeln!(
        writer,
        "Completion rate: {}%",
        (store.completion_rate() * 100.0) as u32
    )?;
    writeln!(
        writer,
        "Current streak: {} day{}",
        streak,
        if streak == 1 { "" } else { "s" }
    )?;
    writeln!(writer, "Overdue: {}", store.overdue_tasks().len())?;
    writeln!(writer, "Due today: {}", store.tasks_due_today().len())?;
    writeln!(
        writer,
        "Level {} ({}% to next)",
        progress.level,
        (progress.progress_to_next_level * 100.0).round() as u32
    )?;
    if progress.badges.is_empty() {
        writeln!(writer, "Badges: none yet")?;
    } else {
        let labels: Vec<&str> = progress.badges.iter().map(|badge| badge.label()).collect();
        writeln!(writer, "Badges: {}", labels.join(", "))?;
    }
    Ok(())
}

fn handle_suggest<W: Write>(session: &Session, mut writer: W) -> Result<()> {
    let store = session.store();
    let now = store.now();
    let suggestions = store.smart_suggestions();
    if suggestions.is_empty() {
        let fallback = store.suggestions_or_fallback();
        if fallback.is_empty() {
            writeln!(writer, "Nothing to suggest")?;
            return Ok(());
        }
        writeln!(writer, "Nothing urgent; open tasks by priority:")?;
        for task in fallback {
            writeln!(writer, "{}", TaskLine { task, now })?;
        }
        return Ok(());
    }
    for task in suggestions {
        writeln!(writer, "{}", TaskLine { task, now })?;
    }
    Ok(())
}

fn handle_reset<W: Write>(session: &mut Session, args: &ResetArgs, mut writer: W) -> Result<()> {
    if !args.yes {
        return Err(anyhow!("refusing to delete every task without --yes"));
    }
    let count = session.store().len();
    session.clear()?;
    writeln!(writer, "Removed {} task{}", count, if count == 1 { "" } else { "s" })?;
    Ok(())
}

/// One task rendered on a single line.
struct TaskLine<'a> {
    task: &'a Task,
    now: DateTime<Utc>,
}

impl fmt::Display for TaskLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = self.task;
        let mark = if task.is_completed { "x" } else { " " };
        write!(f, "[{}] {} {:<6} {}", mark, task.id(), task.priority.label(), task.title)?;
        if let Some(due) = task.due_date {
            let local = due.with_timezone(&Local);
            write!(f, "  due {}", local.format("%Y-%m-%d %H:%M"))?;
            if task.is_overdue_at(self.now) {
                write!(f, " (overdue)")?;
            }
        }
        if !task.tags.is_empty() {
            let tags: Vec<String> = task.tags.iter().map(|tag| format!("#{}", tag)).collect();
            write!(f, "  {}", tags.join(" "))?;
        }
        if task.actual_minutes > 0 {
            write!(f, "  {}/{}m", task.actual_minutes, task.estimated_minutes)?;
        }
        Ok(())
    }
}

enum SummaryLine {
    Deleted(usize),
    NoneDeleted,
}

impl SummaryLine {
    fn deleted(count: usize) -> Self {
        if count > 0 {
            SummaryLine::Deleted(count)
        } else {
            SummaryLine::NoneDeleted
        }
    }
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryLine::Deleted(count) => {
                write!(
                    f,
                    "Deleted {} task{}",
                    count,
                    if *count == 1 { "" } else { "s" }
                )
            }
            SummaryLine::NoneDeleted => write!(f, "No tasks deleted"),
        }
    }
}
