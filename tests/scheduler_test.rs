//! Integration tests for the weekly re-engagement tick
//!
//! Run with: cargo test --test scheduler_test

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::NamedTempFile;

use tusabot::core::week::WeekKey;
use tusabot::scheduler::{finalize_previous_week, weekly_tick, Broadcaster, SchedulerDeps, REENGAGE_TEXT};
use tusabot::storage::cache::StoreCache;
use tusabot::storage::db::{self, UserPatch};
use tusabot::storage::posters;
use tusabot::storage::{create_pool, get_connection, DbPool};
use tusabot::telegram::delivery::{Delivery, DeliveryError};

#[derive(Default)]
struct RecordingDelivery {
    texts: Mutex<Vec<(i64, String)>>,
    posters: Mutex<Vec<i64>>,
    blocked_ids: Vec<i64>,
}

#[async_trait]
impl Delivery for RecordingDelivery {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        if self.blocked_ids.contains(&chat_id) {
            return Err(DeliveryError::Blocked);
        }
        self.texts.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_poster(&self, chat_id: i64, _poster: &posters::Poster) -> Result<(), DeliveryError> {
        if self.blocked_ids.contains(&chat_id) {
            return Err(DeliveryError::Blocked);
        }
        self.posters.lock().unwrap().push(chat_id);
        Ok(())
    }
}

fn test_pool() -> (Arc<DbPool>, NamedTempFile) {
    let file = NamedTempFile::new().expect("temp db file");
    let pool = create_pool(file.path().to_str().expect("utf8 path")).expect("pool");
    (Arc::new(pool), file)
}

fn deps(pool: Arc<DbPool>, delivery: Arc<RecordingDelivery>) -> SchedulerDeps {
    let cache = {
        let conn = get_connection(&pool).unwrap();
        Arc::new(StoreCache::load(&conn).unwrap())
    };
    SchedulerDeps {
        db_pool: pool,
        cache,
        delivery,
        broadcaster: Arc::new(Broadcaster::new(4)),
        vk: None,
        admin_chat_id: 0,
    }
}

fn seed_user(pool: &DbPool, tg_id: i64, missed_in_row: i64, attended_prev: bool) {
    let conn = get_connection(pool).unwrap();
    db::upsert_user(&conn, tg_id, &UserPatch::default()).unwrap();
    db::set_missed_in_row(&conn, tg_id, missed_in_row).unwrap();
    if attended_prev {
        db::mark_attended(&conn, tg_id, WeekKey::previous(Utc::now())).unwrap();
    }
}

#[tokio::test]
async fn attending_resets_the_counter_silently() {
    let (pool, _file) = test_pool();
    seed_user(&pool, 1, 5, true);
    let delivery = Arc::new(RecordingDelivery::default());

    let nudged = finalize_previous_week(&deps(Arc::clone(&pool), Arc::clone(&delivery)))
        .await
        .unwrap();

    assert_eq!(nudged, 0);
    assert!(delivery.texts.lock().unwrap().is_empty());
    let conn = get_connection(&pool).unwrap();
    assert_eq!(db::get_user(&conn, 1).unwrap().unwrap().missed_in_row, 0);
}

#[tokio::test]
async fn third_consecutive_miss_triggers_the_nudge() {
    let (pool, _file) = test_pool();
    seed_user(&pool, 1, 0, false); // miss 1, stays quiet
    seed_user(&pool, 2, 1, false); // miss 2, stays quiet
    seed_user(&pool, 3, 2, false); // miss 3, nudged

    let delivery = Arc::new(RecordingDelivery::default());
    let nudged = finalize_previous_week(&deps(Arc::clone(&pool), Arc::clone(&delivery)))
        .await
        .unwrap();

    assert_eq!(nudged, 1);
    let texts = delivery.texts.lock().unwrap();
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0], (3, REENGAGE_TEXT.to_string()));

    let conn = get_connection(&pool).unwrap();
    assert_eq!(db::get_user(&conn, 1).unwrap().unwrap().missed_in_row, 1);
    assert_eq!(db::get_user(&conn, 2).unwrap().unwrap().missed_in_row, 2);
    assert_eq!(db::get_user(&conn, 3).unwrap().unwrap().missed_in_row, 3);
}

#[tokio::test]
async fn sending_does_not_reset_the_counter() {
    let (pool, _file) = test_pool();
    seed_user(&pool, 1, 3, false);
    let delivery = Arc::new(RecordingDelivery::default());

    finalize_previous_week(&deps(Arc::clone(&pool), Arc::clone(&delivery)))
        .await
        .unwrap();

    // The counter keeps growing until the user actually comes back
    let conn = get_connection(&pool).unwrap();
    assert_eq!(db::get_user(&conn, 1).unwrap().unwrap().missed_in_row, 4);
    assert_eq!(delivery.texts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn blocked_recipient_does_not_abort_the_batch() {
    let (pool, _file) = test_pool();
    seed_user(&pool, 1, 2, false);
    seed_user(&pool, 2, 2, false);
    let delivery = Arc::new(RecordingDelivery {
        blocked_ids: vec![1],
        ..RecordingDelivery::default()
    });

    let nudged = finalize_previous_week(&deps(Arc::clone(&pool), Arc::clone(&delivery)))
        .await
        .unwrap();

    assert_eq!(nudged, 1);
    // Counters were persisted for both, the blocked row stays in the table
    let conn = get_connection(&pool).unwrap();
    assert_eq!(db::get_user(&conn, 1).unwrap().unwrap().missed_in_row, 3);
    assert_eq!(db::get_user(&conn, 2).unwrap().unwrap().missed_in_row, 3);
}

#[tokio::test]
async fn weekly_tick_broadcasts_the_newest_poster() {
    let (pool, _file) = test_pool();
    seed_user(&pool, 1, 0, true);
    seed_user(&pool, 2, 0, true);
    {
        let conn = get_connection(&pool).unwrap();
        posters::add_poster(&conn, "old", "Старая", None).unwrap();
        posters::add_poster(&conn, "new", "Новая", None).unwrap();
    }

    let delivery = Arc::new(RecordingDelivery::default());
    weekly_tick(&deps(Arc::clone(&pool), Arc::clone(&delivery))).await;

    let mut sent = delivery.posters.lock().unwrap().clone();
    sent.sort_unstable();
    assert_eq!(sent, vec![1, 2]);
}

#[tokio::test]
async fn weekly_tick_without_poster_only_finalizes() {
    let (pool, _file) = test_pool();
    seed_user(&pool, 1, 2, false);

    let delivery = Arc::new(RecordingDelivery::default());
    weekly_tick(&deps(Arc::clone(&pool), Arc::clone(&delivery))).await;

    assert!(delivery.posters.lock().unwrap().is_empty());
    assert_eq!(delivery.texts.lock().unwrap().len(), 1);
}
