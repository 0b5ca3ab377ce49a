//! Handler types and dependencies

use std::sync::Arc;

use crate::scheduler::Broadcaster;
use crate::session::SessionStore;
use crate::storage::cache::StoreCache;
use crate::storage::db::DbPool;
use crate::verify::VkClient;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub sessions: Arc<SessionStore>,
    pub cache: Arc<StoreCache>,
    pub vk: Option<Arc<VkClient>>,
    pub broadcaster: Arc<Broadcaster>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(
        db_pool: Arc<DbPool>,
        sessions: Arc<SessionStore>,
        cache: Arc<StoreCache>,
        vk: Option<Arc<VkClient>>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            db_pool,
            sessions,
            cache,
            vk,
            broadcaster,
        }
    }
}
