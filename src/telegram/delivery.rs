//! Outbound delivery seam
//!
//! Broadcasts and the scheduler talk to recipients through [`Delivery`]
//! instead of the bot directly, so fan-out logic is testable with a mock.
//! Blocked recipients surface as `DeliveryError::Blocked` and are swallowed
//! per-recipient; the user row is never pruned.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile};
use thiserror::Error;

use crate::storage::posters::Poster;
use crate::telegram::Bot;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The recipient blocked the bot; swallowed during broadcasts.
    #[error("recipient blocked the bot")]
    Blocked,

    #[error("delivery failed: {0}")]
    Other(String),
}

/// Sends messages to one recipient.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError>;
    async fn send_poster(&self, chat_id: i64, poster: &Poster) -> Result<(), DeliveryError>;
}

/// Inline keyboard with the "buy ticket" button, when the poster carries a
/// parseable URL.
pub fn ticket_keyboard(poster: &Poster) -> Option<InlineKeyboardMarkup> {
    let raw = poster.ticket_url.as_deref()?;
    let url = url::Url::parse(raw).ok()?;
    Some(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
        "🎟 Купить билет",
        url,
    )]]))
}

fn classify(err: teloxide::RequestError) -> DeliveryError {
    match err {
        teloxide::RequestError::Api(teloxide::ApiError::BotBlocked) => DeliveryError::Blocked,
        other => DeliveryError::Other(other.to_string()),
    }
}

/// Live delivery through the Bot API.
pub struct BotDelivery {
    bot: Bot,
}

impl BotDelivery {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Delivery for BotDelivery {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map(|_| ())
            .map_err(classify)
    }

    async fn send_poster(&self, chat_id: i64, poster: &Poster) -> Result<(), DeliveryError> {
        let photo = InputFile::file_id(FileId(poster.file_id.clone()));
        let mut request = self.bot.send_photo(ChatId(chat_id), photo).caption(poster.caption.clone());
        if let Some(keyboard) = ticket_keyboard(poster) {
            request = request.reply_markup(keyboard);
        }
        request.await.map(|_| ()).map_err(classify)
    }
}
