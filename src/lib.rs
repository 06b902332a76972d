pub mod cli;
pub mod commands;
pub mod config;
pub mod focus;
pub mod logging;

pub use taskfusion_core::capture;
pub use taskfusion_core::model;
pub use taskfusion_core::parser;
pub use taskfusion_core::{AppConfig, Session};
