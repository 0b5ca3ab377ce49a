//! Telegram-facing layer: bot setup, handlers, menus, delivery

pub mod admin;
pub mod bot;
pub mod callbacks;
pub mod delivery;
pub mod handlers;
pub mod menu;
pub mod messages;
pub mod notifications;

/// The bot type used throughout the crate.
pub type Bot = teloxide::Bot;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use delivery::{BotDelivery, Delivery, DeliveryError};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use notifications::{notify_admin_startup, notify_admin_text};
