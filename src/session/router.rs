//! Conversation mode routing
//!
//! Single decision point mapping (active mode, input kind) to the handler
//! that owns the input. Registration outranks every awaiting-flag so a stale
//! flag can never hijack a mid-registration reply. Input with no active mode
//! is a no-op, not an error.

use super::{ConversationMode, DraftStep, RegistrationStep};

/// Kind of inbound user event the router disambiguates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Photo,
}

/// Where the input should be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Registration(RegistrationStep),
    VkInput,
    TicketUrl,
    BroadcastText,
    Lookup { continuous: bool },
    Wizard,
    /// No active mode claims this input.
    Ignore,
}

/// Resolves the handler for one inbound event.
pub fn route(mode: &ConversationMode, input: InputKind) -> Route {
    match (mode, input) {
        // Registration always wins; a photo mid-registration is noise
        (ConversationMode::Registering(step), InputKind::Text) => Route::Registration(*step),
        (ConversationMode::Registering(_), InputKind::Photo) => Route::Ignore,

        (ConversationMode::AwaitingVkInput, InputKind::Text) => Route::VkInput,
        (ConversationMode::AwaitingTicketUrl, InputKind::Text) => Route::TicketUrl,
        (ConversationMode::AwaitingBroadcastText, InputKind::Text) => Route::BroadcastText,
        (ConversationMode::AwaitingLookup { continuous }, InputKind::Text) => Route::Lookup {
            continuous: *continuous,
        },

        // The wizard owns both kinds; it rejects the wrong one itself
        (ConversationMode::AuthoringPoster(draft), InputKind::Photo) => {
            if draft.step == DraftStep::Photo {
                Route::Wizard
            } else {
                Route::Ignore
            }
        }
        (ConversationMode::AuthoringPoster(_), InputKind::Text) => Route::Wizard,

        (ConversationMode::Idle, _) => Route::Ignore,
        (_, InputKind::Photo) => Route::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PosterDraft;
    use pretty_assertions::assert_eq;

    #[test]
    fn idle_text_is_noop() {
        assert_eq!(route(&ConversationMode::Idle, InputKind::Text), Route::Ignore);
        assert_eq!(route(&ConversationMode::Idle, InputKind::Photo), Route::Ignore);
    }

    #[test]
    fn registration_claims_text() {
        let mode = ConversationMode::Registering(RegistrationStep::Age);
        assert_eq!(route(&mode, InputKind::Text), Route::Registration(RegistrationStep::Age));
        assert_eq!(route(&mode, InputKind::Photo), Route::Ignore);
    }

    #[test]
    fn awaiting_flags_claim_text_only() {
        assert_eq!(route(&ConversationMode::AwaitingVkInput, InputKind::Text), Route::VkInput);
        assert_eq!(route(&ConversationMode::AwaitingVkInput, InputKind::Photo), Route::Ignore);
        assert_eq!(
            route(&ConversationMode::AwaitingTicketUrl, InputKind::Text),
            Route::TicketUrl
        );
        assert_eq!(
            route(&ConversationMode::AwaitingBroadcastText, InputKind::Text),
            Route::BroadcastText
        );
    }

    #[test]
    fn lookup_carries_continuous_flag() {
        assert_eq!(
            route(&ConversationMode::AwaitingLookup { continuous: true }, InputKind::Text),
            Route::Lookup { continuous: true }
        );
        assert_eq!(
            route(&ConversationMode::AwaitingLookup { continuous: false }, InputKind::Text),
            Route::Lookup { continuous: false }
        );
    }

    #[test]
    fn wizard_takes_photo_only_at_photo_step() {
        let fresh = ConversationMode::AuthoringPoster(PosterDraft::new());
        assert_eq!(route(&fresh, InputKind::Photo), Route::Wizard);

        let mut advanced = PosterDraft::new();
        advanced.accept_photo("file1");
        let mode = ConversationMode::AuthoringPoster(advanced);
        assert_eq!(route(&mode, InputKind::Photo), Route::Ignore);
        assert_eq!(route(&mode, InputKind::Text), Route::Wizard);
    }
}
