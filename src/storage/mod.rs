//! Database access: users, attendance, posters, caches

pub mod cache;
pub mod db;
pub mod posters;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};
