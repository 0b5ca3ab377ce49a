//! Free-text and photo message handling
//!
//! Every inbound message first touches the user row (username refresh,
//! known-set, weekly attendance) and then goes through the session router;
//! text that no active mode claims is ignored rather than answered.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};

use crate::core::config;
use crate::core::error::AppResult;
use crate::core::validation::{extract_vk_handle, parse_age, validate_ticket_url};
use crate::core::week::WeekKey;
use crate::session::router::{route, InputKind, Route};
use crate::session::{ConversationMode, DraftStep, RegistrationStep, Session, StepOutcome};
use crate::storage::db::{self, get_connection, Gender, UserPatch};
use crate::storage::posters;
use crate::telegram::delivery::BotDelivery;
use crate::telegram::handlers::{HandlerDeps, HandlerError};
use crate::telegram::menu;
use crate::telegram::Bot;
use crate::verify::{self, BotOracle, MembershipStatus};

/// Refreshes the user row and records weekly attendance.
///
/// Runs on every inbound event; any message within a week counts as activity
/// for that week. Best-effort: a storage failure is logged and never blocks
/// handling the event itself.
pub(crate) fn touch_user(deps: &HandlerDeps, tg_id: i64, username: Option<&str>) {
    if let Err(e) = refresh_user(deps, tg_id, username) {
        log::warn!("Failed to refresh user {} in storage: {}", tg_id, e);
    }
}

fn refresh_user(deps: &HandlerDeps, tg_id: i64, username: Option<&str>) -> AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;
    db::upsert_user(
        &conn,
        tg_id,
        &UserPatch {
            username: username.map(str::to_string),
            ..UserPatch::default()
        },
    )?;
    db::mark_attended(&conn, tg_id, WeekKey::current())?;
    deps.cache.note_user(tg_id);
    Ok(())
}

pub async fn handle_text_message(bot: Bot, msg: Message, deps: HandlerDeps) -> Result<(), HandlerError> {
    let Some(from) = &msg.from else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;
    touch_user(&deps, user_id, from.username.as_deref());

    let session = deps.sessions.session(user_id);
    let mut session = session.lock().await;

    match route(&session.mode, InputKind::Text) {
        Route::Registration(step) => {
            let completed =
                handle_registration_text(&bot, msg.chat.id, user_id, step, text, &mut session, &deps).await?;
            if completed {
                // The menu re-locks the session for the poster cursor;
                // render it only after the guard is gone
                drop(session);
                menu::show_main_menu(&bot, msg.chat.id, user_id, &deps).await?;
            }
        }
        Route::VkInput => {
            handle_vk_input(&bot, msg.chat.id, user_id, text, &mut session, &deps).await?;
        }
        Route::TicketUrl => {
            handle_ticket_url(&bot, msg.chat.id, user_id, text, &mut session, &deps).await?;
        }
        Route::BroadcastText => {
            if !config::admin::is_admin(user_id) {
                session.set_mode(ConversationMode::Idle);
                return Ok(());
            }
            session.set_mode(ConversationMode::Idle);
            drop(session);

            let recipients = deps.cache.known_user_ids();
            log::info!("📝 Admin {} started a text broadcast to {} users", user_id, recipients.len());
            let delivery = BotDelivery::new(bot.clone());
            let outcome = deps.broadcaster.broadcast_text(&delivery, text, &recipients).await;
            let reply = match outcome {
                Some(report) => report.summary(),
                None => "Рассылка уже идёт, подождите её завершения.".to_string(),
            };
            bot.send_message(msg.chat.id, reply).await?;
        }
        Route::Lookup { continuous } => {
            handle_lookup(&bot, msg.chat.id, user_id, text, continuous, &mut session, &deps).await?;
        }
        Route::Wizard => {
            handle_wizard_text(&bot, msg.chat.id, text, &mut session).await?;
        }
        Route::Ignore => {}
    }
    Ok(())
}

pub async fn handle_photo_message(bot: Bot, msg: Message, deps: HandlerDeps) -> Result<(), HandlerError> {
    let Some(from) = &msg.from else {
        return Ok(());
    };
    let Some(photos) = msg.photo() else {
        return Ok(());
    };
    // The last size is the largest rendition of the same photo
    let Some(photo) = photos.last() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;
    touch_user(&deps, user_id, from.username.as_deref());

    let session = deps.sessions.session(user_id);
    let mut session = session.lock().await;

    if route(&session.mode, InputKind::Photo) != Route::Wizard {
        return Ok(());
    }
    let ConversationMode::AuthoringPoster(draft) = &mut session.mode else {
        return Ok(());
    };
    match draft.accept_photo(&photo.file.id.0) {
        StepOutcome::Advanced(_) => {
            bot.send_message(msg.chat.id, draft.prompt()).await?;
        }
        StepOutcome::WrongInput(note) => {
            bot.send_message(msg.chat.id, format!("{}{}", note, draft.prompt())).await?;
        }
    }
    Ok(())
}

/// Returns true when this message completed the registration; the caller
/// renders the menu after releasing the session guard.
async fn handle_registration_text(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    step: RegistrationStep,
    text: &str,
    session: &mut Session,
    deps: &HandlerDeps,
) -> AppResult<bool> {
    match step {
        RegistrationStep::Name => {
            let name = text.trim();
            if name.is_empty() {
                bot.send_message(chat_id, RegistrationStep::Name.prompt()).await?;
                return Ok(false);
            }
            let conn = get_connection(&deps.db_pool)?;
            let saved = db::upsert_user(
                &conn,
                user_id,
                &UserPatch {
                    name: Some(name.to_string()),
                    ..UserPatch::default()
                },
            );
            drop(conn);
            if let Err(e) = saved {
                // The step does not advance until the write lands
                log::error!("Failed to save name for user {}: {}", user_id, e);
                bot.send_message(chat_id, "Не получилось сохранить, попробуйте ещё раз.").await?;
                return Ok(false);
            }
            session.set_mode(ConversationMode::Registering(RegistrationStep::Gender));
            bot.send_message(chat_id, RegistrationStep::Gender.prompt())
                .reply_markup(menu::gender_keyboard())
                .await?;
        }
        RegistrationStep::Gender => {
            // Gender is selected with a button, not typed
            bot.send_message(chat_id, "Пожалуйста, выберите пол кнопкой ниже:")
                .reply_markup(menu::gender_keyboard())
                .await?;
        }
        RegistrationStep::Age => {
            let age = match parse_age(text) {
                Ok(age) => age,
                Err(reason) => {
                    bot.send_message(chat_id, reason).await?;
                    return Ok(false);
                }
            };
            // Completion writes all three fields in one upsert
            let conn = get_connection(&deps.db_pool)?;
            let profile = db::get_user(&conn, user_id)?;
            let saved = db::upsert_user(
                &conn,
                user_id,
                &UserPatch {
                    name: profile.as_ref().and_then(|u| u.name.clone()),
                    gender: profile.as_ref().map(|u| u.gender).filter(|g| *g != Gender::Unset),
                    age: Some(age),
                    ..UserPatch::default()
                },
            );
            drop(conn);
            if let Err(e) = saved {
                log::error!("Failed to save age for user {}: {}", user_id, e);
                bot.send_message(chat_id, "Не получилось сохранить, попробуйте ещё раз.").await?;
                return Ok(false);
            }
            session.set_mode(ConversationMode::Idle);
            log::info!("🎉 User {} completed registration", user_id);
            bot.send_message(chat_id, "Регистрация завершена! 🎉").await?;
            return Ok(true);
        }
    }
    Ok(false)
}

async fn handle_vk_input(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    text: &str,
    session: &mut Session,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let Some(handle) = extract_vk_handle(text) else {
        bot.send_message(
            chat_id,
            "Не похоже на профиль VK. Пришлите ссылку вида https://vk.com/id12345 или номер профиля.",
        )
        .await?;
        return Ok(());
    };

    let conn = get_connection(&deps.db_pool)?;
    db::set_vk_id(&conn, user_id, &handle)?;
    drop(conn);
    deps.cache.note_vk_id(user_id, &handle);
    session.set_mode(ConversationMode::Idle);
    log::info!("🔗 User {} linked VK profile {}", user_id, handle);

    let mut reply = format!("VK профиль привязан: vk.com/{} ✅", handle);
    if let Some(client) = deps.vk.as_deref() {
        match client.member_status(&handle).await {
            MembershipStatus::Confirmed => reply.push_str("\nВы состоите в нашей группе 🎉"),
            MembershipStatus::NotMember => {
                reply.push_str(&format!(
                    "\nВы ещё не в группе: vk.com/{}",
                    *config::vk::VK_GROUP_DOMAIN
                ));
            }
            MembershipStatus::Unknown => {}
        }
    }
    bot.send_message(chat_id, reply)
        .reply_markup(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            "🏠 Главное меню",
            "back_to_menu",
        )]]))
        .await?;
    Ok(())
}

async fn handle_ticket_url(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    text: &str,
    session: &mut Session,
    deps: &HandlerDeps,
) -> AppResult<()> {
    if !config::admin::is_admin(user_id) {
        session.set_mode(ConversationMode::Idle);
        return Ok(());
    }

    let trimmed = text.trim();
    let new_url = if trimmed == "-" {
        None
    } else {
        if let Err(reason) = validate_ticket_url(trimmed) {
            bot.send_message(chat_id, reason).await?;
            return Ok(());
        }
        Some(trimmed)
    };

    let conn = get_connection(&deps.db_pool)?;
    let updated = posters::set_current_ticket_url(&conn, new_url)?;
    drop(conn);
    session.set_mode(ConversationMode::Idle);

    let reply = match (updated, new_url) {
        (false, _) => "Афиш нет, ссылку сохранять некуда.",
        (true, Some(_)) => "Ссылка на билеты обновлена ✅",
        (true, None) => "Ссылка на билеты убрана.",
    };
    bot.send_message(chat_id, reply).await?;
    Ok(())
}

async fn handle_lookup(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    text: &str,
    continuous: bool,
    session: &mut Session,
    deps: &HandlerDeps,
) -> AppResult<()> {
    if !config::admin::is_admin(user_id) {
        session.set_mode(ConversationMode::Idle);
        return Ok(());
    }

    let query = text.trim();
    let conn = get_connection(&deps.db_pool)?;
    let target = if let Some(username) = query.strip_prefix('@') {
        db::find_user_by_username(&conn, username)?
    } else if let Ok(tg_id) = query.parse::<i64>() {
        db::get_user(&conn, tg_id)?
    } else {
        db::find_user_by_username(&conn, query)?
    };
    drop(conn);
    session.finish_lookup();

    let stop_keyboard = || {
        continuous.then(|| {
            InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                "🔙 Завершить проверку",
                "admin:stop_check",
            )]])
        })
    };

    let Some(target) = target else {
        let mut request = bot.send_message(chat_id, format!("Пользователь «{}» не найден.", query));
        if let Some(keyboard) = stop_keyboard() {
            request = request.reply_markup(keyboard);
        }
        request.await?;
        return Ok(());
    };

    let profile = format!(
        "👤 {}\nID: {}\nUsername: {}\nПол: {}, возраст: {}\nVK: {}\nРегистрация: {}\nПропусков подряд: {}",
        target.name.as_deref().unwrap_or("Без имени"),
        target.tg_id,
        target.username.as_deref().map(|u| format!("@{}", u)).unwrap_or_else(|| "—".to_string()),
        target.gender.label(),
        target.age.map(|a| a.to_string()).unwrap_or_else(|| "—".to_string()),
        target.vk_id.as_deref().unwrap_or("не привязан"),
        if target.registration_complete() { "завершена ✅" } else { "не завершена ❌" },
        target.missed_in_row,
    );
    bot.send_message(chat_id, profile).await?;

    let oracle = BotOracle::new(bot.clone());
    let report = verify::verify_user(
        &oracle,
        &config::channels::configured(),
        deps.vk.as_deref(),
        target.tg_id,
        target.vk_id.as_deref(),
    )
    .await;
    let mut request = bot
        .send_message(chat_id, menu::render_report(&report, target.vk_id.is_some()))
        .parse_mode(ParseMode::Markdown);
    if let Some(keyboard) = stop_keyboard() {
        request = request.reply_markup(keyboard);
    }
    request.await?;
    Ok(())
}

async fn handle_wizard_text(bot: &Bot, chat_id: ChatId, text: &str, session: &mut Session) -> AppResult<()> {
    let ConversationMode::AuthoringPoster(draft) = &mut session.mode else {
        return Ok(());
    };
    match draft.accept_text(text) {
        StepOutcome::Advanced(DraftStep::Confirm) => {
            bot.send_message(chat_id, format!("{}\n\n{}", draft.summary(), draft.prompt()))
                .reply_markup(InlineKeyboardMarkup::new(vec![vec![
                    InlineKeyboardButton::callback("✅ Опубликовать", "admin:confirm_poster"),
                    InlineKeyboardButton::callback("❌ Отменить", "admin:cancel_poster"),
                ]]))
                .await?;
        }
        StepOutcome::Advanced(_) => {
            bot.send_message(chat_id, draft.prompt()).await?;
        }
        StepOutcome::WrongInput(note) => {
            bot.send_message(chat_id, format!("{}{}", note, draft.prompt())).await?;
        }
    }
    Ok(())
}
