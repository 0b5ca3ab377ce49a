//! Inline keyboard callback dispatch

use teloxide::prelude::*;

use crate::session::{ConversationMode, RegistrationStep};
use crate::storage::db::{self, get_connection, Gender, UserPatch};
use crate::telegram::handlers::{HandlerDeps, HandlerError};
use crate::telegram::messages::touch_user;
use crate::telegram::{admin, menu, Bot};

pub async fn handle_callback_query(bot: Bot, q: CallbackQuery, deps: HandlerDeps) -> Result<(), HandlerError> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let message_id = q.message.as_ref().map(|m| m.id());
    let user_id = q.from.id.0 as i64;
    touch_user(&deps, user_id, q.from.username.as_deref());

    if data == "past_event" {
        bot.answer_callback_query(q.id.clone())
            .text("Это мероприятие уже прошло 📅")
            .show_alert(true)
            .await?;
        return Ok(());
    }
    bot.answer_callback_query(q.id.clone()).await?;

    if let Some(action) = data.strip_prefix("admin:") {
        admin::handle_admin_callback(&bot, chat_id, message_id, user_id, action, &deps).await?;
        return Ok(());
    }

    match data {
        "back_to_menu" => {
            menu::show_main_menu(&bot, chat_id, user_id, &deps).await?;
        }
        "gender_male" | "gender_female" => {
            let gender = if data == "gender_male" { Gender::Male } else { Gender::Female };
            let conn = get_connection(&deps.db_pool)?;
            let saved = db::upsert_user(
                &conn,
                user_id,
                &UserPatch {
                    gender: Some(gender),
                    ..UserPatch::default()
                },
            );
            drop(conn);
            if let Err(e) = saved {
                // Same corrective reply as the typed steps; the mode stays put
                log::error!("Failed to save gender for user {}: {}", user_id, e);
                bot.send_message(chat_id, "Не получилось сохранить, попробуйте ещё раз.").await?;
                return Ok(());
            }

            let session = deps.sessions.session(user_id);
            let mut session = session.lock().await;
            if session.mode == ConversationMode::Registering(RegistrationStep::Gender) {
                session.set_mode(ConversationMode::Registering(RegistrationStep::Age));
                bot.send_message(chat_id, RegistrationStep::Age.prompt()).await?;
            } else {
                bot.send_message(chat_id, "Пол обновлён ✅").await?;
            }
        }
        "poster_prev" => {
            menu::shift_poster_cursor(&bot, chat_id, user_id, &deps, -1).await?;
        }
        "poster_next" => {
            menu::shift_poster_cursor(&bot, chat_id, user_id, &deps, 1).await?;
        }
        "link_vk" => {
            menu::prompt_vk_link(&bot, chat_id, user_id, &deps).await?;
        }
        "check_all" => {
            menu::run_subscription_check(&bot, chat_id, user_id, &deps).await?;
        }
        other => {
            log::warn!("Unknown callback: {}", other);
        }
    }
    Ok(())
}
