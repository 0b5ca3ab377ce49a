//! Telegram-backed membership oracle

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{Recipient, UserId};

use super::{MembershipOracle, MembershipStatus};
use crate::telegram::Bot;

/// Resolves a normalized channel reference into a Bot API recipient:
/// numeric ids become chat ids, everything else is a channel username.
pub fn recipient_for(channel: &str) -> Recipient {
    match channel.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(channel.to_string()),
    }
}

/// Membership oracle backed by `getChatMember`.
///
/// The bot must be an administrator of the checked channels, otherwise the
/// API rejects the call and the status degrades to `Unknown`.
pub struct BotOracle {
    bot: Bot,
}

impl BotOracle {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MembershipOracle for BotOracle {
    async fn channel_status(&self, channel: &str, user_id: i64) -> MembershipStatus {
        let user_id = match u64::try_from(user_id) {
            Ok(id) => UserId(id),
            Err(_) => return MembershipStatus::Unknown,
        };

        match self.bot.get_chat_member(recipient_for(channel), user_id).await {
            Ok(member) => {
                let kind = &member.kind;
                if kind.is_owner() || kind.is_administrator() || kind.is_member() {
                    MembershipStatus::Confirmed
                } else {
                    MembershipStatus::NotMember
                }
            }
            Err(e) => {
                log::warn!(
                    "Failed to check subscription for user {} on {}: {}",
                    user_id,
                    channel,
                    e
                );
                MembershipStatus::Unknown
            }
        }
    }
}
