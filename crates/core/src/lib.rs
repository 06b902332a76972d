pub mod capture;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod model;
pub mod parser;
pub mod services;
pub mod storage;

pub use capture::{CaptureError, TaskInput};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, StorageBackend, TimerConfig};
pub use database::Database;
pub use error::StorageError;
pub use events::{ChangeEvent, SubscriptionId};
pub use model::*;
pub use services::{
    Badge, FocusTimer, Phase, PhaseCompletion, Progress, Session, TaskQuery, TaskStore,
    TimerState,
};
pub use storage::{JsonFileRepository, MemoryRepository, TaskRepository, UnavailableRepository};
