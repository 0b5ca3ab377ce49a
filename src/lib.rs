//! Tusabot - Telegram bot for a party community
//!
//! Registers guests through a short questionnaire, verifies their membership
//! in the community's Telegram channels (and optionally its VK group), lets
//! administrators author and broadcast event posters, and nudges users who
//! have gone quiet for several weeks in a row.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, validation, ISO-week keys
//! - `storage`: SQLite persistence (users, attendance, posters) and caches
//! - `session`: per-user conversational state and input routing
//! - `verify`: Telegram channel and VK group membership checks
//! - `scheduler`: weekly re-engagement tick and broadcast fan-out
//! - `telegram`: bot setup, dispatcher schema, menus and handlers

pub mod core;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod telegram;
pub mod verify;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use crate::storage::{create_pool, get_connection, DbConnection, DbPool};
pub use crate::telegram::{create_bot, schema, Bot, HandlerDeps};
