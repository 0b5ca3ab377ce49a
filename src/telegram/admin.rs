//! Admin panel: poster authoring, broadcasts, user lookup and statistics
//!
//! Every admin action arrives as an `admin:<action>` callback; each one is
//! re-checked against the configured admin list, the button being visible is
//! not an authorization.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId};

use crate::core::config;
use crate::core::error::AppResult;
use crate::session::{ConversationMode, PosterDraft};
use crate::storage::db::{self, get_connection};
use crate::storage::posters;
use crate::telegram::delivery::BotDelivery;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::Bot;

fn panel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("🧩 Создать афишу", "admin:create_poster"),
            InlineKeyboardButton::callback("📋 Список афиш", "admin:list_posters"),
        ],
        vec![
            InlineKeyboardButton::callback("📤 Разослать афишу", "admin:broadcast_now"),
            InlineKeyboardButton::callback("🗑 Удалить афишу", "admin:delete_poster"),
        ],
        vec![
            InlineKeyboardButton::callback("🔗 Задать ссылку", "admin:set_ticket"),
            InlineKeyboardButton::callback("📝 Текстовая рассылка", "admin:broadcast_text"),
        ],
        vec![
            InlineKeyboardButton::callback("🔍 Проверка по нику", "admin:check_by_username"),
            InlineKeyboardButton::callback("🔄 Обновить", "admin:refresh"),
        ],
        vec![InlineKeyboardButton::callback("👥 Пользователи", "admin:users_count")],
        vec![InlineKeyboardButton::callback("🏠 Главное меню", "back_to_menu")],
    ])
}

fn back_to_panel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "🔙 К панели",
        "admin:back_to_panel",
    )]])
}

/// Shows (or refreshes) the admin panel.
///
/// Edits the originating message when possible so the "refresh" button
/// updates in place; photo messages cannot become text, so those fall back
/// to a fresh message.
pub async fn show_admin_panel(
    bot: &Bot,
    chat_id: ChatId,
    edit: Option<MessageId>,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;
    let poster_count = posters::list_posters(&conn)?.len();
    drop(conn);

    let text = format!(
        "🛠 Админ-панель\n\nПользователей в базе: {}\nАфиш: {}",
        deps.cache.known_count(),
        poster_count
    );

    if let Some(message_id) = edit {
        if bot
            .edit_message_text(chat_id, message_id, text.clone())
            .reply_markup(panel_keyboard())
            .await
            .is_ok()
        {
            return Ok(());
        }
    }
    bot.send_message(chat_id, text).reply_markup(panel_keyboard()).await?;
    Ok(())
}

fn poster_list_text(list: &[posters::Poster]) -> String {
    if list.is_empty() {
        return "Афиш пока нет.".to_string();
    }
    let mut lines = vec![format!("📋 Афиши ({}):", list.len()), String::new()];
    for (index, poster) in list.iter().enumerate() {
        let mut title: String = poster.caption.chars().take(50).collect();
        if poster.caption.chars().count() > 50 {
            title.push('…');
        }
        let current = if index + 1 == list.len() { " ← текущая" } else { "" };
        let ticket = if poster.ticket_url.is_some() { " 🎟" } else { "" };
        lines.push(format!("{}. {}{}{}", index + 1, title, ticket, current));
    }
    lines.join("\n")
}

fn stats_text(stats: &db::UserStats) -> String {
    format!(
        "👥 Пользователей: {}\nС привязанным VK: {}\nМужчин: {}, женщин: {}\nНовых за сегодня: {}",
        stats.total, stats.with_vk, stats.male, stats.female, stats.registered_today
    )
}

/// Dispatches an `admin:<action>` callback.
pub async fn handle_admin_callback(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    user_id: i64,
    action: &str,
    deps: &HandlerDeps,
) -> AppResult<()> {
    if !config::admin::is_admin(user_id) {
        bot.send_message(chat_id, "Недостаточно прав.").await?;
        return Ok(());
    }

    match action {
        "refresh" | "back_to_panel" => {
            show_admin_panel(bot, chat_id, message_id, deps).await?;
        }
        "create_poster" => {
            let draft = PosterDraft::new();
            let prompt = draft.prompt();
            let session = deps.sessions.session(user_id);
            session.lock().await.set_mode(ConversationMode::AuthoringPoster(draft));
            bot.send_message(chat_id, prompt)
                .reply_markup(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                    "❌ Отменить",
                    "admin:cancel_poster",
                )]]))
                .await?;
        }
        "confirm_poster" => {
            let session = deps.sessions.session(user_id);
            let mut session = session.lock().await;
            let confirmed = match &session.mode {
                ConversationMode::AuthoringPoster(draft) => Some(draft.confirm()),
                _ => None,
            };
            match confirmed {
                Some(Ok(new_poster)) => {
                    let conn = get_connection(&deps.db_pool)?;
                    posters::add_poster(
                        &conn,
                        &new_poster.file_id,
                        &new_poster.caption,
                        new_poster.ticket_url.as_deref(),
                    )?;
                    session.set_mode(ConversationMode::Idle);
                    // New poster becomes current; the menu should show it
                    session.poster_cursor = None;
                    log::info!("✅ Admin {} published a new poster", user_id);
                    bot.send_message(chat_id, "Афиша сохранена ✅")
                        .reply_markup(back_to_panel_keyboard())
                        .await?;
                }
                Some(Err(rule)) => {
                    // Draft stays as-is so the admin can fix the input
                    bot.send_message(chat_id, format!("Не получилось сохранить: {}", rule))
                        .await?;
                }
                None => {
                    bot.send_message(chat_id, "Нет активного черновика.").await?;
                }
            }
        }
        "cancel_poster" => {
            let session = deps.sessions.session(user_id);
            session.lock().await.set_mode(ConversationMode::Idle);
            bot.send_message(chat_id, "Создание афиши отменено.")
                .reply_markup(back_to_panel_keyboard())
                .await?;
        }
        "list_posters" => {
            let conn = get_connection(&deps.db_pool)?;
            let list = posters::list_posters(&conn)?;
            drop(conn);
            bot.send_message(chat_id, poster_list_text(&list))
                .reply_markup(back_to_panel_keyboard())
                .await?;
        }
        "delete_poster" => {
            let conn = get_connection(&deps.db_pool)?;
            let removed = posters::delete_current_poster(&conn)?;
            drop(conn);
            let text = if removed {
                log::info!("🗑 Admin {} deleted the current poster", user_id);
                "Текущая афиша удалена 🗑"
            } else {
                "Удалять нечего: афиш нет."
            };
            bot.send_message(chat_id, text).reply_markup(back_to_panel_keyboard()).await?;
        }
        "set_ticket" => {
            let conn = get_connection(&deps.db_pool)?;
            let has_poster = posters::current_poster(&conn)?.is_some();
            drop(conn);
            if !has_poster {
                bot.send_message(chat_id, "Сначала создайте афишу.")
                    .reply_markup(back_to_panel_keyboard())
                    .await?;
                return Ok(());
            }
            let session = deps.sessions.session(user_id);
            session.lock().await.set_mode(ConversationMode::AwaitingTicketUrl);
            bot.send_message(
                chat_id,
                "Пришлите ссылку на билеты для текущей афиши (или «-», чтобы убрать её).",
            )
            .await?;
        }
        "broadcast_text" => {
            let session = deps.sessions.session(user_id);
            session.lock().await.set_mode(ConversationMode::AwaitingBroadcastText);
            bot.send_message(chat_id, "Пришлите текст рассылки. Он уйдёт всем пользователям.")
                .await?;
        }
        "broadcast_now" => {
            let conn = get_connection(&deps.db_pool)?;
            let poster = posters::current_poster(&conn)?;
            drop(conn);
            let Some(poster) = poster else {
                bot.send_message(chat_id, "Рассылать нечего: афиш нет.")
                    .reply_markup(back_to_panel_keyboard())
                    .await?;
                return Ok(());
            };

            let recipients = deps.cache.known_user_ids();
            log::info!("📤 Admin {} started a poster broadcast to {} users", user_id, recipients.len());
            let delivery = BotDelivery::new(bot.clone());
            let outcome = deps
                .broadcaster
                .broadcast_poster(&delivery, &poster, &recipients, deps.vk.as_deref())
                .await;
            let text = match outcome {
                Some(report) => report.summary(),
                None => "Рассылка уже идёт, подождите её завершения.".to_string(),
            };
            bot.send_message(chat_id, text).reply_markup(back_to_panel_keyboard()).await?;
        }
        "check_by_username" => {
            let session = deps.sessions.session(user_id);
            session
                .lock()
                .await
                .set_mode(ConversationMode::AwaitingLookup { continuous: true });
            bot.send_message(
                chat_id,
                "Пришлите @username или Telegram ID пользователя. Можно несколько подряд.",
            )
            .reply_markup(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                "🔙 Завершить проверку",
                "admin:stop_check",
            )]]))
            .await?;
        }
        "stop_check" => {
            let session = deps.sessions.session(user_id);
            session.lock().await.set_mode(ConversationMode::Idle);
            bot.send_message(chat_id, "Проверка завершена.")
                .reply_markup(back_to_panel_keyboard())
                .await?;
        }
        "users_count" => {
            let conn = get_connection(&deps.db_pool)?;
            let stats = db::user_stats(&conn)?;
            drop(conn);
            bot.send_message(chat_id, stats_text(&stats))
                .reply_markup(back_to_panel_keyboard())
                .await?;
        }
        other => {
            log::warn!("Unknown admin callback: {}", other);
        }
    }
    Ok(())
}
