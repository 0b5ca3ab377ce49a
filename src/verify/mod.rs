//! Membership verification across Telegram channels and the VK group
//!
//! Every check normalizes into a tri-state [`MembershipStatus`]; `Unknown`
//! means the check itself could not run (oracle unreachable, integration
//! unconfigured, handle unresolvable) and is never coerced to `NotMember`.

pub mod telegram;
pub mod vk;

use async_trait::async_trait;
use futures_util::future::join_all;

pub use telegram::BotOracle;
pub use vk::VkClient;

/// Result of one membership check against one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    Confirmed,
    NotMember,
    /// The check could not be performed; distinct from a negative answer.
    Unknown,
}

/// Answers "is this user a member of this channel" for the chat platform.
///
/// A trait seam so verification logic is testable without a live bot.
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    async fn channel_status(&self, channel: &str, user_id: i64) -> MembershipStatus;
}

/// One channel's check outcome within a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCheck {
    pub channel: String,
    pub status: MembershipStatus,
}

/// Aggregated verification outcome for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub channels: Vec<ChannelCheck>,
    /// None when the VK integration is unconfigured or the user has no
    /// linked profile; excluded from the aggregate in that case.
    pub vk: Option<MembershipStatus>,
}

impl VerificationReport {
    /// True iff every configured check resolved to `Confirmed`.
    ///
    /// `Unknown` is not a pass; unconfigured channels simply do not appear.
    pub fn passed(&self) -> bool {
        self.channels.iter().all(|c| c.status == MembershipStatus::Confirmed)
            && self.vk.map_or(true, |s| s == MembershipStatus::Confirmed)
    }
}

/// Runs all configured checks for one user.
///
/// The Telegram channels are checked concurrently; a failure on one never
/// blocks or alters the others. The VK check runs only when the integration
/// is configured and the user has a linked profile.
pub async fn verify_user(
    oracle: &dyn MembershipOracle,
    channels: &[String],
    vk: Option<&VkClient>,
    user_id: i64,
    vk_id: Option<&str>,
) -> VerificationReport {
    let checks = channels.iter().map(|channel| async move {
        ChannelCheck {
            channel: channel.clone(),
            status: oracle.channel_status(channel, user_id).await,
        }
    });
    let channels = join_all(checks).await;

    let vk_status = match (vk, vk_id) {
        (Some(client), Some(vk_id)) => Some(client.member_status(vk_id).await),
        _ => None,
    };

    VerificationReport {
        channels,
        vk: vk_status,
    }
}
