use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;

use crate::database::Database;
use crate::storage::{JsonFileRepository, TaskRepository};

static DEFAULT_DB_NAME: &str = "taskfusion.sqlite3";
static DEFAULT_JSON_NAME: &str = "tasks.json";
static ENV_DATA_DIR: &str = "TASKFUSION_DATA_DIR";
static ENV_STORAGE: &str = "TASKFUSION_STORAGE";

pub const DEFAULT_FOCUS_SECONDS: u32 = 1500;
pub const DEFAULT_BREAK_SECONDS: u32 = 300;

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("app", "taskfusion", "taskfusion"));

/// Which durable medium backs the task collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Json,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Json => "json",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "db" => Ok(StorageBackend::Sqlite),
            "json" => Ok(StorageBackend::Json),
            other => Err(anyhow!(
                "Unknown storage backend '{}': expected sqlite|json",
                other
            )),
        }
    }
}

impl ValueEnum for StorageBackend {
    fn value_variants<'a>() -> &'a [Self] {
        &[StorageBackend::Sqlite, StorageBackend::Json]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

/// Phase durations for the focus timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub focus_seconds: u32,
    pub break_seconds: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus_seconds: DEFAULT_FOCUS_SECONDS,
            break_seconds: DEFAULT_BREAK_SECONDS,
        }
    }
}

impl TimerConfig {
    /// Whole minutes credited to a task when a focus phase completes.
    pub fn focus_minutes(&self) -> u32 {
        self.focus_seconds / 60
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    db_path: PathBuf,
    json_path: PathBuf,
    backend: StorageBackend,
    timer: TimerConfig,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory using the provided override,
    /// environment variables, and platform defaults.
    pub fn discover(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        let mut config = Self::from_data_dir(data_dir)?;
        if let Ok(raw) = env::var(ENV_STORAGE) {
            config.backend = raw
                .parse()
                .with_context(|| format!("Invalid {} value", ENV_STORAGE))?;
        }
        Ok(config)
    }

    /// Construct [`AppConfig`] directly from a resolved data directory.
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let db_path = data_dir.join(DEFAULT_DB_NAME);
        let json_path = data_dir.join(DEFAULT_JSON_NAME);
        Ok(Self {
            data_dir,
            db_path,
            json_path,
            backend: StorageBackend::default(),
            timer: TimerConfig::default(),
        })
    }

    pub fn with_backend(mut self, backend: StorageBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_timer(mut self, timer: TimerConfig) -> Self {
        self.timer = timer;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    pub fn backend(&self) -> StorageBackend {
        self.backend
    }

    pub fn timer(&self) -> TimerConfig {
        self.timer
    }

    /// Open the repository selected by [`AppConfig::backend`].
    pub fn open_repository(&self) -> Result<Box<dyn TaskRepository>> {
        match self.backend {
            StorageBackend::Sqlite => Ok(Box::new(Database::initialize(self)?)),
            StorageBackend::Json => Ok(Box::new(JsonFileRepository::new(self.json_path.clone()))),
        }
    }
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if cfg!(debug_assertions) {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let dev_dir = manifest_dir.join("..").join("tmp").join("dev-taskfusion");
        return Ok(dev_dir);
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".taskfusion"));
    }

    Ok(env::current_dir()?.join(".taskfusion"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn from_data_dir_places_store_files_inside() {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).expect("config");
        assert_eq!(config.db_path(), dir.path().join("taskfusion.sqlite3"));
        assert_eq!(config.json_path(), dir.path().join("tasks.json"));
        assert_eq!(config.backend(), StorageBackend::Sqlite);
        assert_eq!(config.timer(), TimerConfig::default());
    }

    #[test]
    fn discover_creates_missing_override_dir() {
        let dir = TempDir::new().expect("temp dir");
        let nested = dir.path().join("nested").join("data");
        let config = AppConfig::discover(Some(nested.clone())).expect("discover");
        assert!(nested.is_dir());
        assert_eq!(config.data_dir(), nested.as_path());
    }

    #[test]
    fn parses_backend_labels() {
        assert_eq!("JSON".parse::<StorageBackend>().unwrap(), StorageBackend::Json);
        assert_eq!("db".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert!("redis".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn default_timer_credits_twenty_five_minutes() {
        assert_eq!(TimerConfig::default().focus_minutes(), 25);
    }
}
