//! Broadcast fan-out
//!
//! One broadcast at a time (the weekly timer and the admin button can fire
//! near-simultaneously); sends run with bounded concurrency; failures are
//! isolated per recipient and folded into a summary report.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::stream::{self, StreamExt};
use tokio::sync::Mutex;

use crate::storage::posters::Poster;
use crate::telegram::delivery::{Delivery, DeliveryError};
use crate::verify::VkClient;

/// Outcome of one fan-out, reported to the operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub blocked: usize,
    pub failed: usize,
    pub total: usize,
    /// None when no VK cross-post was attempted.
    pub vk_posted: Option<bool>,
}

impl BroadcastReport {
    /// One-line summary for the admin notification.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "Рассылка завершена: отправлено {}/{} (заблокировали: {}, ошибок: {})",
            self.sent, self.total, self.blocked, self.failed
        );
        match self.vk_posted {
            Some(true) => line.push_str("\nVK: опубликовано ✅"),
            Some(false) => line.push_str("\nVK: не удалось опубликовать ❌"),
            None => {}
        }
        line
    }
}

/// Serializes broadcasts and bounds their concurrency.
pub struct Broadcaster {
    guard: Mutex<()>,
    limit: usize,
}

impl Broadcaster {
    pub fn new(limit: usize) -> Self {
        Self {
            guard: Mutex::new(()),
            limit: limit.max(1),
        }
    }

    /// Sends the poster to every recipient, optionally cross-posting to VK.
    ///
    /// Returns None when another broadcast is already running; the caller
    /// reports that instead of queuing a duplicate send.
    pub async fn broadcast_poster(
        &self,
        delivery: &dyn Delivery,
        poster: &Poster,
        recipients: &[i64],
        vk: Option<&VkClient>,
    ) -> Option<BroadcastReport> {
        let _running = self.guard.try_lock().ok()?;

        let mut report = self
            .fan_out(recipients, |chat_id| delivery.send_poster(chat_id, poster))
            .await;

        if let Some(client) = vk {
            let mut message = poster.caption.clone();
            if let Some(url) = &poster.ticket_url {
                message.push_str("\n\nБилеты: ");
                message.push_str(url);
            }
            report.vk_posted = match client.publish_to_group(&message).await {
                Ok(posted) => Some(posted),
                Err(e) => {
                    log::error!("VK cross-post failed: {}", e);
                    Some(false)
                }
            };
        }

        Some(report)
    }

    /// Sends plain text to every recipient (admin text broadcast).
    pub async fn broadcast_text(
        &self,
        delivery: &dyn Delivery,
        text: &str,
        recipients: &[i64],
    ) -> Option<BroadcastReport> {
        let _running = self.guard.try_lock().ok()?;
        Some(self.fan_out(recipients, |chat_id| delivery.send_text(chat_id, text)).await)
    }

    async fn fan_out<F, Fut>(&self, recipients: &[i64], send: F) -> BroadcastReport
    where
        F: Fn(i64) -> Fut,
        Fut: std::future::Future<Output = Result<(), DeliveryError>>,
    {
        let sent = AtomicUsize::new(0);
        let blocked = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        stream::iter(recipients.iter().copied())
            .for_each_concurrent(self.limit, |chat_id| {
                let send = &send;
                let sent = &sent;
                let blocked = &blocked;
                let failed = &failed;
                async move {
                    match send(chat_id).await {
                        Ok(()) => {
                            sent.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(DeliveryError::Blocked) => {
                            blocked.fetch_add(1, Ordering::Relaxed);
                            log::debug!("Recipient {} has blocked the bot, skipping", chat_id);
                        }
                        Err(DeliveryError::Other(e)) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            log::error!("Broadcast send to {} failed: {}", chat_id, e);
                        }
                    }
                }
            })
            .await;

        BroadcastReport {
            sent: sent.into_inner(),
            blocked: blocked.into_inner(),
            failed: failed.into_inner(),
            total: recipients.len(),
            vk_posted: None,
        }
    }
}
