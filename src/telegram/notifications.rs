use teloxide::prelude::*;

use crate::core::config::admin::ADMIN_USER_ID;
use crate::telegram::Bot;

/// Sends a plain-text notification to the primary administrator.
///
/// Silently does nothing when ADMIN_USER_ID is not configured; failures are
/// logged, never propagated, so notifications cannot break a handler.
pub async fn notify_admin_text(bot: &Bot, text: &str) {
    let admin_id = *ADMIN_USER_ID;
    if admin_id == 0 {
        log::debug!("Admin notification skipped (ADMIN_USER_ID not set): {}", text);
        return;
    }

    if let Err(e) = bot.send_message(ChatId(admin_id), text).await {
        log::error!("Failed to send admin notification: {}", e);
    }
}

/// Notifies the primary administrator that the bot has (re)started.
pub async fn notify_admin_startup(bot: &Bot, bot_username: Option<&str>) {
    let name = bot_username.unwrap_or("bot");
    notify_admin_text(bot, &format!("🤖 @{} запущен и готов к работе", name)).await;
}
