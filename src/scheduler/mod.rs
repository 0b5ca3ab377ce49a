//! Weekly re-engagement scheduler
//!
//! Fires once per configured weekday/time (converted to UTC once at startup),
//! finalizes the week that just ended for every known user, and then fans the
//! newest poster out through the shared [`Broadcaster`]. The broadcast guard
//! also serializes this tick against the admin's manual "broadcast now".

pub mod broadcast;

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Utc};
use tokio::task::JoinHandle;

pub use broadcast::{BroadcastReport, Broadcaster};

use crate::core::config;
use crate::core::error::AppResult;
use crate::core::week::WeekKey;
use crate::storage::cache::StoreCache;
use crate::storage::db::{self, DbPool};
use crate::storage::posters;
use crate::telegram::delivery::Delivery;
use crate::verify::VkClient;

/// Text sent to users who have been away too long.
pub const REENGAGE_TEXT: &str = "Мы очень скучаем без тебя 🥹\n\
    Новая неделя, новые вечеринки 🥳\n\
    Возвращайся скорее, будем делать тыц тыц тыц как в старые добрые 💃🕺🏻";

/// Everything the weekly tick needs.
pub struct SchedulerDeps {
    pub db_pool: Arc<DbPool>,
    pub cache: Arc<StoreCache>,
    pub delivery: Arc<dyn Delivery>,
    pub broadcaster: Arc<Broadcaster>,
    pub vk: Option<Arc<VkClient>>,
    /// Primary admin chat for the summary report; 0 disables it.
    pub admin_chat_id: i64,
}

/// Applies one finalized week to a user's miss counter.
///
/// Returns (new counter, whether to send a re-engagement message). Attending
/// resets the counter; sending never does, so a user keeps being nudged until
/// they actually come back.
pub fn apply_week(attended_prev: bool, missed_in_row: i64) -> (i64, bool) {
    if attended_prev {
        (0, false)
    } else {
        let missed = missed_in_row + 1;
        (missed, missed > config::schedule::MISS_THRESHOLD)
    }
}

/// First instant strictly after `after` matching (weekday, hour, minute) UTC.
pub fn next_fire(after: DateTime<Utc>, weekday: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    let mut day = after.date_naive();
    for _ in 0..8 {
        if day.weekday().num_days_from_monday() == weekday % 7 {
            if let Some(naive) = day.and_hms_opt(hour, minute, 0) {
                let candidate = Utc.from_utc_datetime(&naive);
                if candidate > after {
                    return candidate;
                }
            }
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    // Unreachable for sane inputs; fall back to one week ahead
    after + ChronoDuration::days(7)
}

/// Finalizes the previous ISO week for every known user.
///
/// Attendance resets the miss counter; a miss increments it and, past the
/// threshold, triggers a re-engagement message. Delivery failures are logged
/// and skipped, never aborting the batch.
pub async fn finalize_previous_week(deps: &SchedulerDeps) -> AppResult<usize> {
    let prev_key = WeekKey::previous(Utc::now());
    let conn = db::get_connection(&deps.db_pool)?;
    let user_ids = db::list_known_user_ids(&conn)?;

    let mut nudged = 0;
    for tg_id in user_ids {
        let Some(user) = db::get_user(&conn, tg_id)? else {
            continue;
        };
        let attended_prev = db::attended(&conn, tg_id, prev_key)?;
        let (missed, should_send) = apply_week(attended_prev, user.missed_in_row);

        if let Err(e) = db::set_missed_in_row(&conn, tg_id, missed) {
            log::error!("Failed to persist miss counter for {}: {}", tg_id, e);
            continue;
        }

        if should_send {
            match deps.delivery.send_text(tg_id, REENGAGE_TEXT).await {
                Ok(()) => nudged += 1,
                Err(e) => log::warn!("Re-engagement send to {} failed: {}", tg_id, e),
            }
        }
    }

    log::info!("Finalized week {}: {} re-engagement messages sent", prev_key, nudged);
    Ok(nudged)
}

/// One weekly tick: finalize the ended week, then broadcast the newest poster.
pub async fn weekly_tick(deps: &SchedulerDeps) {
    if let Err(e) = finalize_previous_week(deps).await {
        log::error!("Weekly finalize failed: {}", e);
    }

    let poster = match db::get_connection(&deps.db_pool).map_err(crate::core::AppError::from) {
        Ok(conn) => posters::current_poster(&conn).unwrap_or_else(|e| {
            log::error!("Failed to load current poster: {}", e);
            None
        }),
        Err(e) => {
            log::error!("Weekly broadcast skipped, no DB connection: {}", e);
            return;
        }
    };

    let Some(poster) = poster else {
        log::info!("Weekly broadcast skipped: no poster configured");
        return;
    };

    let recipients = deps.cache.known_user_ids();
    match deps
        .broadcaster
        .broadcast_poster(deps.delivery.as_ref(), &poster, &recipients, deps.vk.as_deref())
        .await
    {
        Some(report) => {
            log::info!("Weekly broadcast: {}", report.summary());
            if deps.admin_chat_id != 0 {
                if let Err(e) = deps.delivery.send_text(deps.admin_chat_id, &report.summary()).await {
                    log::warn!("Failed to deliver broadcast report to admin: {}", e);
                }
            }
        }
        None => log::warn!("Weekly broadcast skipped: another broadcast is already running"),
    }
}

/// Spawns the weekly timer task.
pub fn spawn_weekly(deps: SchedulerDeps) -> JoinHandle<()> {
    tokio::spawn(async move {
        let weekday = *config::schedule::WEEKLY_DAY;
        let hour = config::schedule::hour_utc();
        let minute = *config::schedule::WEEKLY_MINUTE;

        loop {
            let now = Utc::now();
            let fire_at = next_fire(now, weekday, hour, minute);
            let wait = (fire_at - now)
                .to_std()
                .unwrap_or_else(|_| std::time::Duration::from_secs(60));
            log::info!("Next weekly tick at {} (in {}s)", fire_at, wait.as_secs());
            tokio::time::sleep(wait).await;
            weekly_tick(&deps).await;
        }
    })
}
