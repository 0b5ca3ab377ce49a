//! Read-through caches over the user table
//!
//! Broadcasts and lookups hit the known-user set and the VK-id map on every
//! event, so both are kept in memory, loaded once at startup and updated on
//! every successful write. The database stays the source of truth; a cache
//! miss falls back to it.

use dashmap::{DashMap, DashSet};
use rusqlite::Connection;

use crate::core::error::AppResult;
use crate::storage::db;

/// In-memory view of the known-user set and linked VK ids.
#[derive(Debug, Default)]
pub struct StoreCache {
    known: DashSet<i64>,
    vk_ids: DashMap<i64, String>,
}

impl StoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads both caches from the database.
    pub fn load(conn: &Connection) -> AppResult<Self> {
        let cache = Self::new();
        for tg_id in db::list_known_user_ids(conn)? {
            cache.known.insert(tg_id);
            if let Some(user) = db::get_user(conn, tg_id)? {
                if let Some(vk_id) = user.vk_id {
                    cache.vk_ids.insert(tg_id, vk_id);
                }
            }
        }
        log::info!("Loaded {} known users into cache", cache.known.len());
        Ok(cache)
    }

    /// Records a user after a successful row write.
    pub fn note_user(&self, tg_id: i64) {
        self.known.insert(tg_id);
    }

    /// Records a VK link after a successful write.
    pub fn note_vk_id(&self, tg_id: i64, vk_id: &str) {
        self.known.insert(tg_id);
        self.vk_ids.insert(tg_id, vk_id.to_string());
    }

    /// Drops cached state for a user; the next read goes to the database.
    pub fn invalidate(&self, tg_id: i64) {
        self.vk_ids.remove(&tg_id);
    }

    pub fn is_known(&self, tg_id: i64) -> bool {
        self.known.contains(&tg_id)
    }

    /// Cached VK id, falling back to the database on a miss.
    pub fn vk_id(&self, conn: &Connection, tg_id: i64) -> AppResult<Option<String>> {
        if let Some(cached) = self.vk_ids.get(&tg_id) {
            return Ok(Some(cached.clone()));
        }
        let from_db = db::get_user(conn, tg_id)?.and_then(|u| u.vk_id);
        if let Some(ref vk_id) = from_db {
            self.vk_ids.insert(tg_id, vk_id.clone());
        }
        Ok(from_db)
    }

    /// Snapshot of all known user ids (broadcast recipient list).
    pub fn known_user_ids(&self) -> Vec<i64> {
        self.known.iter().map(|id| *id).collect()
    }

    pub fn known_count(&self) -> usize {
        self.known.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::{init_schema, set_vk_id, upsert_user, UserPatch};
    use pretty_assertions::assert_eq;

    fn memory_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn load_picks_up_existing_rows() {
        let conn = memory_conn();
        upsert_user(&conn, 1, &UserPatch::default()).unwrap();
        set_vk_id(&conn, 1, "id42").unwrap();
        upsert_user(&conn, 2, &UserPatch::default()).unwrap();

        let cache = StoreCache::load(&conn).unwrap();
        assert!(cache.is_known(1));
        assert!(cache.is_known(2));
        assert_eq!(cache.vk_id(&conn, 1).unwrap().as_deref(), Some("id42"));
        assert_eq!(cache.vk_id(&conn, 2).unwrap(), None);
    }

    #[test]
    fn miss_falls_back_to_database() {
        let conn = memory_conn();
        let cache = StoreCache::new();
        upsert_user(&conn, 5, &UserPatch::default()).unwrap();
        set_vk_id(&conn, 5, "id7").unwrap();

        assert_eq!(cache.vk_id(&conn, 5).unwrap().as_deref(), Some("id7"));
        // Second read comes from the cache
        assert_eq!(cache.vk_id(&conn, 5).unwrap().as_deref(), Some("id7"));
    }

    #[test]
    fn invalidate_forces_reread() {
        let conn = memory_conn();
        let cache = StoreCache::new();
        upsert_user(&conn, 5, &UserPatch::default()).unwrap();
        set_vk_id(&conn, 5, "id7").unwrap();
        assert_eq!(cache.vk_id(&conn, 5).unwrap().as_deref(), Some("id7"));

        set_vk_id(&conn, 5, "id8").unwrap();
        cache.invalidate(5);
        assert_eq!(cache.vk_id(&conn, 5).unwrap().as_deref(), Some("id8"));
    }
}
