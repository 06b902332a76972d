use std::path::PathBuf;

use clap::{value_parser, ArgAction, Args, Parser, Subcommand};

use crate::capture::TaskInput;
use crate::config::{StorageBackend, TimerConfig};
use crate::model::Priority;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskfusion",
    version,
    about = "Personal task tracking with streaks, smart suggestions and a focus timer.",
    after_help = "Examples:\n  taskfusion add Review proposal #work due:tomorrow p:high\n  taskfusion list --search review\n  taskfusion focus 01HX...\n  taskfusion stats"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Storage backend for the task collection
    #[arg(long, value_enum, global = true)]
    pub backend: Option<StorageBackend>,

    /// Override the tracing filter (e.g. "info", "debug", or full directives)
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Create a task
    Add(AddArgs),
    /// List tasks, open ones first
    List(ListArgs),
    /// Change fields of an existing task
    Edit(EditArgs),
    /// Mark a task done, or reopen it
    Toggle(IdArgs),
    /// Delete one or more tasks by id
    Delete(DeleteArgs),
    /// Show completion metrics, streak, level and badges
    Stats,
    /// Show ranked suggestions of what to work on next
    Suggest,
    /// Run one focus or break phase, optionally bound to a task
    Focus(FocusArgs),
    /// Delete every task
    Reset(ResetArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task title with optional inline tokens (#tag, due:, t:, p:)
    #[arg(value_name = "TEXT", required = true)]
    pub text: Vec<String>,

    /// Longer description
    #[arg(long)]
    pub description: Option<String>,

    /// Priority (overrides inline p: token)
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Due date (ISO e.g. 2026-12-24, today, +3d, mon)
    #[arg(long = "due", value_name = "DATE")]
    pub due_date: Option<String>,

    /// Estimated minutes
    #[arg(long = "estimate", value_parser = value_parser!(u32))]
    pub estimated_minutes: Option<u32>,

    /// Add tags (comma-separated or repeated flag; '#' prefix optional)
    #[arg(long, value_delimiter = ',', action = ArgAction::Append)]
    pub tag: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Case-insensitive match on title, description or tags
    #[arg(long)]
    pub search: Option<String>,

    /// Only show tasks with this priority
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Group open tasks by priority instead of a flat list
    #[arg(long)]
    pub grouped: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// New due date (same formats as `add --due`)
    #[arg(long = "due", value_name = "DATE", conflicts_with = "clear_due")]
    pub due_date: Option<String>,

    /// Remove the due date
    #[arg(long)]
    pub clear_due: bool,

    #[arg(long = "estimate", value_parser = value_parser!(u32))]
    pub estimated_minutes: Option<u32>,

    #[arg(long = "add-tag", value_delimiter = ',', action = ArgAction::Append)]
    pub add_tags: Vec<String>,

    #[arg(long = "remove-tag", value_delimiter = ',', action = ArgAction::Append)]
    pub remove_tags: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// One or more task ids to delete
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct FocusArgs {
    /// Task to credit when the focus phase completes
    #[arg(value_name = "ID")]
    pub task_id: Option<String>,

    #[arg(long, default_value_t = 1500, value_parser = value_parser!(u32))]
    pub focus_seconds: u32,

    #[arg(long, default_value_t = 300, value_parser = value_parser!(u32))]
    pub break_seconds: u32,

    /// Run the break phase right after the focus phase completes
    #[arg(long)]
    pub with_break: bool,
}

impl FocusArgs {
    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig {
            focus_seconds: self.focus_seconds,
            break_seconds: self.break_seconds,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ResetArgs {
    /// Confirm deletion of every task
    #[arg(long)]
    pub yes: bool,
}

impl From<&AddArgs> for TaskInput {
    fn from(args: &AddArgs) -> Self {
        TaskInput {
            text: args.text.clone(),
            description: args.description.clone(),
            priority: args.priority,
            due_date: args.due_date.clone(),
            estimated_minutes: args.estimated_minutes,
            tags: args.tag.clone(),
        }
    }
}

impl From<AddArgs> for TaskInput {
    fn from(args: AddArgs) -> Self {
        TaskInput {
            text: args.text,
            description: args.description,
            priority: args.priority,
            due_date: args.due_date,
            estimated_minutes: args.estimated_minutes,
            tags: args.tag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_flags() {
        let cli = Cli::parse_from([
            "taskfusion",
            "--backend",
            "json",
            "add",
            "Plan",
            "sprint",
            "--priority",
            "urgent",
            "--tag",
            "work,planning",
        ]);
        assert_eq!(cli.backend, Some(StorageBackend::Json));
        let CliCommand::Add(args) = cli.command else {
            panic!("expected add");
        };
        let input = TaskInput::from(args);
        assert_eq!(input.text, vec!["Plan", "sprint"]);
        assert_eq!(input.priority, Some(Priority::Urgent));
        assert_eq!(input.tags, vec!["work", "planning"]);
    }

    #[test]
    fn focus_defaults_to_standard_durations() {
        let cli = Cli::parse_from(["taskfusion", "focus"]);
        let CliCommand::Focus(args) = cli.command else {
            panic!("expected focus");
        };
        assert_eq!(args.timer_config(), TimerConfig::default());
        assert!(args.task_id.is_none());
    }

    #[test]
    fn edit_rejects_due_and_clear_due_together() {
        let parsed = Cli::try_parse_from([
            "taskfusion",
            "edit",
            "abc",
            "--due",
            "today",
            "--clear-due",
        ]);
        assert!(parsed.is_err());
    }
}
