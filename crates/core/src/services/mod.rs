pub mod gamification;
pub mod metrics;
pub mod session;
pub mod tasks;
pub mod timer;

pub use gamification::{Badge, Progress};
pub use metrics::TaskQuery;
pub use session::Session;
pub use tasks::TaskStore;
pub use timer::{FocusLedger, FocusTimer, Phase, PhaseCompletion, TimerState};
