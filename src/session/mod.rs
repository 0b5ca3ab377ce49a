//! Per-user conversational state
//!
//! Each user has exactly one [`ConversationMode`] at a time; switching modes
//! drops whatever transient state the old mode carried (a poster draft lives
//! inside its variant, so it cannot leak into another wizard).

pub mod registration;
pub mod router;
pub mod wizard;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

pub use registration::RegistrationStep;
pub use wizard::{DraftStep, PosterDraft, StepOutcome};

/// The single active conversational mode of a user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConversationMode {
    #[default]
    Idle,
    /// Mid-registration; the step is re-derived from persisted data on entry.
    Registering(RegistrationStep),
    /// Next free-text message is a VK profile to link.
    AwaitingVkInput,
    /// Next free-text message is the ticket URL for the current poster (admin).
    AwaitingTicketUrl,
    /// Next free-text message is broadcast to all known users (admin).
    AwaitingBroadcastText,
    /// Next free-text message is a username/id to look up (admin).
    /// Continuous mode keeps the flag after each lookup until explicitly stopped.
    AwaitingLookup { continuous: bool },
    /// Poster authoring wizard; the draft lives inside the variant.
    AuthoringPoster(PosterDraft),
}

/// One user's session: active mode plus the menu poster cursor.
#[derive(Debug, Default)]
pub struct Session {
    pub mode: ConversationMode,
    /// Index into the ordered poster list the main menu currently shows;
    /// None means "the newest".
    pub poster_cursor: Option<usize>,
}

impl Session {
    /// Replaces the active mode, dropping the previous mode's state.
    pub fn set_mode(&mut self, mode: ConversationMode) {
        self.mode = mode;
    }

    /// Clears a single-shot lookup after it has handled one input;
    /// continuous lookups keep their flag.
    pub fn finish_lookup(&mut self) {
        if self.mode == (ConversationMode::AwaitingLookup { continuous: false }) {
            self.mode = ConversationMode::Idle;
        }
    }
}

/// Concurrent map of per-user sessions.
///
/// The inner `tokio::Mutex` serializes events within one user's session;
/// events for different users proceed independently.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: DashMap<i64, Arc<Mutex<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for a user, creating an idle one on first contact.
    pub fn session(&self, tg_id: i64) -> Arc<Mutex<Session>> {
        self.inner
            .entry(tg_id)
            .or_insert_with(|| Arc::new(Mutex::new(Session::default())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_change_drops_draft() {
        let mut session = Session::default();
        let mut draft = PosterDraft::new();
        draft.accept_photo("file1");
        session.set_mode(ConversationMode::AuthoringPoster(draft));

        session.set_mode(ConversationMode::AwaitingVkInput);
        assert_eq!(session.mode, ConversationMode::AwaitingVkInput);

        // Starting the wizard again begins from a fresh draft
        session.set_mode(ConversationMode::AuthoringPoster(PosterDraft::new()));
        match &session.mode {
            ConversationMode::AuthoringPoster(d) => assert_eq!(d.file_id, None),
            other => panic!("unexpected mode {:?}", other),
        }
    }

    #[test]
    fn continuous_lookup_survives_finish() {
        let mut session = Session::default();
        session.set_mode(ConversationMode::AwaitingLookup { continuous: true });
        session.finish_lookup();
        assert_eq!(session.mode, ConversationMode::AwaitingLookup { continuous: true });
    }

    #[test]
    fn single_shot_lookup_clears_on_finish() {
        let mut session = Session::default();
        session.set_mode(ConversationMode::AwaitingLookup { continuous: false });
        session.finish_lookup();
        assert_eq!(session.mode, ConversationMode::Idle);
    }

    #[tokio::test]
    async fn store_hands_out_same_session() {
        let store = SessionStore::new();
        {
            let session = store.session(1);
            session.lock().await.set_mode(ConversationMode::AwaitingVkInput);
        }
        let session = store.session(1);
        assert_eq!(session.lock().await.mode, ConversationMode::AwaitingVkInput);
    }
}
