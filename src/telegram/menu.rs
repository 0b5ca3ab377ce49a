//! Main menu: poster display with navigation, subscription checks, VK linking

use teloxide::prelude::*;
use teloxide::types::{FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};

use crate::core::config;
use crate::core::error::AppResult;
use crate::session::ConversationMode;
use crate::storage::db::get_connection;
use crate::storage::posters;
use crate::telegram::delivery::ticket_keyboard;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::Bot;
use crate::verify::{self, BotOracle, MembershipStatus, VerificationReport};

/// Keyboard for the gender step of registration.
pub fn gender_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("👨 Мужской", "gender_male")],
        vec![InlineKeyboardButton::callback("👩 Женский", "gender_female")],
    ])
}

fn menu_action_rows(user_id: i64, vk_linked: bool) -> Vec<Vec<InlineKeyboardButton>> {
    let mut rows = vec![vec![InlineKeyboardButton::callback(
        "🔄 Проверить подписки",
        "check_all",
    )]];
    if config::vk::enabled() {
        let label = if vk_linked {
            "🔄 Перепривязать VK"
        } else {
            "🔗 Привязать VK профиль"
        };
        rows.push(vec![InlineKeyboardButton::callback(label, "link_vk")]);
    }
    if config::admin::is_admin(user_id) {
        rows.push(vec![InlineKeyboardButton::callback("🛠 Админ-панель", "admin:refresh")]);
    }
    rows
}

/// Shows the main menu: the selected poster (newest by default) with
/// navigation and action buttons, or a text menu when no poster exists.
pub async fn show_main_menu(bot: &Bot, chat_id: ChatId, user_id: i64, deps: &HandlerDeps) -> AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;
    let list = posters::list_posters(&conn)?;
    let vk_linked = deps.cache.vk_id(&conn, user_id)?.is_some();
    drop(conn);

    if list.is_empty() {
        bot.send_message(chat_id, "Афиш пока нет 😔 Загляните позже!")
            .reply_markup(InlineKeyboardMarkup::new(menu_action_rows(user_id, vk_linked)))
            .await?;
        return Ok(());
    }

    let session = deps.sessions.session(user_id);
    let index = {
        let mut session = session.lock().await;
        let index = session.poster_cursor.unwrap_or(list.len() - 1).min(list.len() - 1);
        session.poster_cursor = Some(index);
        index
    };
    let poster = &list[index];

    let mut rows = Vec::new();
    // Ticket links only work on the current poster; older ones answer that
    // the event has already happened
    if index + 1 == list.len() {
        if let Some(ticket) = ticket_keyboard(poster) {
            rows.extend(ticket.inline_keyboard);
        }
    } else if poster.ticket_url.is_some() {
        rows.push(vec![InlineKeyboardButton::callback("🎟 Купить билет", "past_event")]);
    }
    let mut nav_row = Vec::new();
    if index > 0 {
        nav_row.push(InlineKeyboardButton::callback("⬅️ Предыдущая", "poster_prev"));
    }
    if index + 1 < list.len() {
        nav_row.push(InlineKeyboardButton::callback("➡️ Следующая", "poster_next"));
    }
    if !nav_row.is_empty() {
        rows.push(nav_row);
    }
    rows.extend(menu_action_rows(user_id, vk_linked));

    bot.send_photo(chat_id, InputFile::file_id(FileId(poster.file_id.clone())))
        .caption(poster.caption.clone())
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// Moves the poster cursor one step and re-renders the menu.
pub async fn shift_poster_cursor(bot: &Bot, chat_id: ChatId, user_id: i64, deps: &HandlerDeps, delta: i64) -> AppResult<()> {
    let session = deps.sessions.session(user_id);
    {
        let mut session = session.lock().await;
        let current = session.poster_cursor.unwrap_or(0) as i64;
        session.poster_cursor = Some((current + delta).max(0) as usize);
    }
    show_main_menu(bot, chat_id, user_id, deps).await
}

fn channel_line(channel: &str, status: MembershipStatus) -> String {
    let label = match config::channels::public_link(channel) {
        Some(url) => format!("[{}]({})", channel, url),
        None => channel.to_string(),
    };
    match status {
        MembershipStatus::Confirmed => format!("✅ {}", label),
        MembershipStatus::NotMember => format!("❌ {} - не подписан", label),
        MembershipStatus::Unknown => format!("❓ {} - не удалось проверить", label),
    }
}

/// Renders a verification report the way the "check subscriptions" screen
/// shows it: one line per channel, an optional VK line, and a verdict.
pub fn render_report(report: &VerificationReport, vk_linked: bool) -> String {
    let mut lines = vec!["📋 Статус подписок:".to_string(), String::new()];

    for check in &report.channels {
        lines.push(channel_line(&check.channel, check.status));
    }

    if config::vk::enabled() {
        let group_link = format!("[VK группа](https://vk.com/{})", *config::vk::VK_GROUP_DOMAIN);
        let vk_line = match (vk_linked, report.vk) {
            (false, _) => format!("⚠️ {} - профиль не привязан", group_link),
            (true, Some(MembershipStatus::Confirmed)) => format!("✅ {}", group_link),
            (true, Some(MembershipStatus::NotMember)) => format!("❌ {} - не подписан", group_link),
            (true, _) => format!("❓ {} - не удалось проверить", group_link),
        };
        lines.push(vk_line);
    }

    lines.push(String::new());
    if report.passed() {
        lines.push("🎉 Все подписки на месте!".to_string());
    } else {
        lines.push("Подпишитесь на всё и нажмите «Перепроверить» 👇".to_string());
    }
    lines.join("\n")
}

/// Runs the full verification for a user and sends the report.
pub async fn run_subscription_check(bot: &Bot, chat_id: ChatId, user_id: i64, deps: &HandlerDeps) -> AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;
    let vk_id = deps.cache.vk_id(&conn, user_id)?;
    drop(conn);

    let oracle = BotOracle::new(bot.clone());
    let channels = config::channels::configured();
    let report = verify::verify_user(&oracle, &channels, deps.vk.as_deref(), user_id, vk_id.as_deref()).await;

    let mut rows = Vec::new();
    if config::vk::enabled() {
        let label = if vk_id.is_some() {
            "🔄 Перепривязать VK"
        } else {
            "🔗 Привязать VK профиль"
        };
        rows.push(vec![InlineKeyboardButton::callback(label, "link_vk")]);
    }
    rows.push(vec![InlineKeyboardButton::callback("🔄 Перепроверить", "check_all")]);
    rows.push(vec![InlineKeyboardButton::callback("🏠 Главное меню", "back_to_menu")]);

    bot.send_message(chat_id, render_report(&report, vk_id.is_some()))
        .parse_mode(ParseMode::Markdown)
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// Puts the user into VK-linking mode and prompts for a profile.
pub async fn prompt_vk_link(bot: &Bot, chat_id: ChatId, user_id: i64, deps: &HandlerDeps) -> AppResult<()> {
    let session = deps.sessions.session(user_id);
    session.lock().await.set_mode(ConversationMode::AwaitingVkInput);
    bot.send_message(
        chat_id,
        "Пришлите ссылку на ваш профиль VK (например, https://vk.com/id12345) или его номер.",
    )
    .reply_markup(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "❌ Отмена",
        "back_to_menu",
    )]]))
    .await?;
    Ok(())
}
