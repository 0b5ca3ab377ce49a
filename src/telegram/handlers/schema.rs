//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{HandlerDeps, HandlerError};
use crate::core::config;
use crate::session::registration::resume_step;
use crate::session::{ConversationMode, RegistrationStep};
use crate::storage::db::get_user;
use crate::storage::get_connection;
use crate::telegram::bot::Command;
use crate::telegram::messages::{handle_photo_message, handle_text_message, touch_user};
use crate::telegram::{admin, callbacks, menu, Bot};

/// Creates the main dispatcher schema for the bot.
///
/// The same handler tree is used in production and in integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_photos = deps.clone();
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        // Commands first so "/start" never reaches the text router
        .branch(command_handler(deps_commands))
        .branch(photo_handler(deps_photos))
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callback))
}

/// Handler for bot commands (/start, /menu, /admin, /id)
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);
                let Some(from) = msg.from.clone() else {
                    return Ok(());
                };
                let user_id = i64::try_from(from.id.0).unwrap_or(0);
                touch_user(&deps, user_id, from.username.as_deref());

                match cmd {
                    Command::Start => {
                        handle_start(&bot, msg.chat.id, user_id, &deps).await?;
                    }
                    Command::Menu => {
                        menu::show_main_menu(&bot, msg.chat.id, user_id, &deps).await?;
                    }
                    Command::Admin => {
                        if config::admin::is_admin(user_id) {
                            admin::show_admin_panel(&bot, msg.chat.id, None, &deps).await?;
                        } else {
                            bot.send_message(msg.chat.id, "Недостаточно прав.").await?;
                        }
                    }
                    Command::Id => {
                        let mut text = format!("Ваш Telegram ID: {}", user_id);
                        if msg.chat.id.0 != user_id {
                            text.push_str(&format!("\nID этого чата: {}", msg.chat.id.0));
                        }
                        bot.send_message(msg.chat.id, text).await?;
                    }
                }
                Ok(())
            }
        },
    ))
}

/// /start either begins (or resumes) registration or shows the menu.
async fn handle_start(bot: &Bot, chat_id: ChatId, user_id: i64, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let conn = get_connection(&deps.db_pool)?;
    let profile = get_user(&conn, user_id)?;
    drop(conn);

    match resume_step(profile.as_ref()) {
        Some(step) => {
            let session = deps.sessions.session(user_id);
            session.lock().await.set_mode(ConversationMode::Registering(step));
            let mut request = bot.send_message(chat_id, step.prompt());
            if step == RegistrationStep::Gender {
                request = request.reply_markup(menu::gender_keyboard());
            }
            request.await?;
        }
        None => {
            menu::show_main_menu(bot, chat_id, user_id, deps).await?;
        }
    }
    Ok(())
}

/// Handler for photo messages (poster wizard input)
fn photo_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.photo().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move { handle_photo_message(bot, msg, deps).await }
        })
}

/// Handler for free-text messages (everything the session router owns)
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().map(|text| !text.starts_with('/')).unwrap_or(false))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move { handle_text_message(bot, msg, deps).await }
        })
}

/// Handler for callback queries (inline keyboard buttons)
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move { callbacks::handle_callback_query(bot, q, deps).await }
    })
}
