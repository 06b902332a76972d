use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection, Row};

use crate::config::AppConfig;
use crate::error::StorageError;
use crate::model::{Priority, Task};
use crate::storage::TaskRepository;

/// SQLite-backed task repository, one row per task keyed by id.
pub struct Database {
    conn: Connection,
}

/// Raw column values before validation.
struct TaskRow {
    id: String,
    title: String,
    description: String,
    due_date: Option<String>,
    priority: String,
    is_completed: bool,
    completed_date: Option<String>,
    estimated_minutes: i64,
    actual_minutes: i64,
    tags: String,
}

impl Database {
    pub fn initialize(config: &AppConfig) -> Result<Self, StorageError> {
        Self::open(config.db_path())
    }

    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    fn apply_migrations(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT);
             CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                due_date TEXT,
                priority TEXT NOT NULL DEFAULT 'Medium',
                is_completed INTEGER NOT NULL DEFAULT 0,
                completed_date TEXT,
                estimated_minutes INTEGER NOT NULL DEFAULT 30,
                actual_minutes INTEGER NOT NULL DEFAULT 0,
                tags TEXT NOT NULL DEFAULT '[]'
             );
             CREATE INDEX IF NOT EXISTS idx_tasks_position ON tasks(position);
             INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', '1');
            ",
        )?;
        Ok(())
    }
}

impl TaskRepository for Database {
    fn load_all(&self) -> Result<Vec<Task>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, due_date, priority, is_completed, completed_date, \
             estimated_minutes, actual_minutes, tags FROM tasks ORDER BY position ASC",
        )?;
        let rows = stmt.query_map([], read_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.into_task()?);
        }
        Ok(tasks)
    }

    fn save_all(&mut self, tasks: &[Task]) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM tasks", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tasks (
                    id, position, title, description, due_date, priority, is_completed,
                    completed_date, estimated_minutes, actual_minutes, tags
                ) VALUES (
                    :id, :position, :title, :description, :due_date, :priority, :is_completed,
                    :completed_date, :estimated_minutes, :actual_minutes, :tags
                )",
            )?;
            for (position, task) in tasks.iter().enumerate() {
                let tags_json = serde_json::to_string(&task.tags)?;
                stmt.execute(named_params![
                    ":id": task.id(),
                    ":position": position as i64,
                    ":title": &task.title,
                    ":description": &task.description,
                    ":due_date": task.due_date.map(|dt| dt.to_rfc3339()),
                    ":priority": task.priority.label(),
                    ":is_completed": task.is_completed,
                    ":completed_date": task.completed_date.map(|dt| dt.to_rfc3339()),
                    ":estimated_minutes": task.estimated_minutes as i64,
                    ":actual_minutes": task.actual_minutes as i64,
                    ":tags": tags_json,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(count = tasks.len(), "tasks written to sqlite");
        Ok(())
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        due_date: row.get("due_date")?,
        priority: row.get("priority")?,
        is_completed: row.get("is_completed")?,
        completed_date: row.get("completed_date")?,
        estimated_minutes: row.get("estimated_minutes")?,
        actual_minutes: row.get("actual_minutes")?,
        tags: row.get("tags")?,
    })
}

impl TaskRow {
    fn into_task(self) -> Result<Task, StorageError> {
        let priority = self
            .priority
            .parse::<Priority>()
            .map_err(|err| StorageError::Corrupt(format!("task {}: {}", self.id, err)))?;
        let tags: Vec<String> = serde_json::from_str(&self.tags)?;
        Ok(Task {
            due_date: parse_datetime(&self.id, self.due_date)?,
            completed_date: parse_datetime(&self.id, self.completed_date)?,
            estimated_minutes: to_minutes(&self.id, self.estimated_minutes)?,
            actual_minutes: to_minutes(&self.id, self.actual_minutes)?,
            id: self.id,
            title: self.title,
            description: self.description,
            priority,
            is_completed: self.is_completed,
            tags,
        })
    }
}

fn parse_datetime(id: &str, raw: Option<String>) -> Result<Option<DateTime<Utc>>, StorageError> {
    raw.map(|value| {
        DateTime::parse_from_rfc3339(&value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|err| StorageError::Corrupt(format!("task {}: bad timestamp '{}': {}", id, value, err)))
    })
    .transpose()
}

fn to_minutes(id: &str, raw: i64) -> Result<u32, StorageError> {
    u32::try_from(raw)
        .map_err(|_| StorageError::Corrupt(format!("task {}: minutes out of range ({})", id, raw)))
}
