//! Core utilities: configuration, errors, logging, validation, week keys

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;
pub mod week;

// Re-exports for convenience
pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_startup_configuration};
pub use week::WeekKey;
