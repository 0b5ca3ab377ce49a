//! Integration tests for poster authoring and the ordered poster list
//!
//! Run with: cargo test --test poster_wizard_test

use tempfile::NamedTempFile;

use tusabot::session::router::{route, InputKind, Route};
use tusabot::session::{ConversationMode, DraftStep, PosterDraft, Session, StepOutcome};
use tusabot::storage::posters;
use tusabot::storage::{create_pool, get_connection, DbPool};

fn test_pool() -> (DbPool, NamedTempFile) {
    let file = NamedTempFile::new().expect("temp db file");
    let pool = create_pool(file.path().to_str().expect("utf8 path")).expect("pool");
    (pool, file)
}

#[test]
fn authored_draft_becomes_the_current_poster() {
    let (pool, _file) = test_pool();
    let conn = get_connection(&pool).unwrap();

    let mut draft = PosterDraft::new();
    assert_eq!(draft.accept_photo("file-abc"), StepOutcome::Advanced(DraftStep::Caption));
    assert_eq!(
        draft.accept_text("Вечеринка в пятницу 🎉"),
        StepOutcome::Advanced(DraftStep::TicketUrl)
    );
    assert_eq!(
        draft.accept_text("https://tickets.example.com/party"),
        StepOutcome::Advanced(DraftStep::Confirm)
    );

    let new_poster = draft.confirm().unwrap();
    posters::add_poster(&conn, &new_poster.file_id, &new_poster.caption, new_poster.ticket_url.as_deref()).unwrap();

    let current = posters::current_poster(&conn).unwrap().unwrap();
    assert_eq!(current.file_id, "file-abc");
    assert_eq!(current.caption, "Вечеринка в пятницу 🎉");
    assert_eq!(current.ticket_url.as_deref(), Some("https://tickets.example.com/party"));
}

#[test]
fn failed_confirm_keeps_the_draft_and_the_list() {
    let (pool, _file) = test_pool();
    let conn = get_connection(&pool).unwrap();

    let mut draft = PosterDraft::new();
    draft.accept_photo("file-abc");
    draft.accept_text(&"я".repeat(2000));
    draft.accept_text("-");

    assert!(draft.confirm().is_err());
    // Nothing was persisted and the draft is still intact
    assert!(posters::current_poster(&conn).unwrap().is_none());
    assert_eq!(draft.step, DraftStep::Confirm);
    assert_eq!(draft.file_id.as_deref(), Some("file-abc"));
}

#[test]
fn leaving_the_wizard_discards_the_draft() {
    let mut session = Session::default();
    let mut draft = PosterDraft::new();
    draft.accept_photo("file-abc");
    session.set_mode(ConversationMode::AuthoringPoster(draft));

    // The admin starts a lookup instead of finishing the poster
    session.set_mode(ConversationMode::AwaitingLookup { continuous: true });
    // Coming back starts from scratch
    session.set_mode(ConversationMode::AuthoringPoster(PosterDraft::new()));
    match &session.mode {
        ConversationMode::AuthoringPoster(draft) => {
            assert_eq!(draft.step, DraftStep::Photo);
            assert_eq!(draft.file_id, None);
        }
        other => panic!("unexpected mode {:?}", other),
    }
}

#[test]
fn wizard_photo_routing_follows_the_step() {
    let fresh = ConversationMode::AuthoringPoster(PosterDraft::new());
    assert_eq!(route(&fresh, InputKind::Photo), Route::Wizard);
    assert_eq!(route(&fresh, InputKind::Text), Route::Wizard);

    let mut advanced = PosterDraft::new();
    advanced.accept_photo("file-abc");
    let mode = ConversationMode::AuthoringPoster(advanced);
    // A second photo mid-wizard is not claimed
    assert_eq!(route(&mode, InputKind::Photo), Route::Ignore);
}

#[test]
fn deleting_the_current_poster_promotes_the_previous_one() {
    let (pool, _file) = test_pool();
    let conn = get_connection(&pool).unwrap();

    posters::add_poster(&conn, "a", "Первая", None).unwrap();
    posters::add_poster(&conn, "b", "Вторая", Some("https://x.com/t")).unwrap();
    posters::add_poster(&conn, "c", "Третья", None).unwrap();

    assert!(posters::delete_current_poster(&conn).unwrap());
    let current = posters::current_poster(&conn).unwrap().unwrap();
    assert_eq!(current.file_id, "b");

    // Ordered listing is preserved for menu navigation
    let list = posters::list_posters(&conn).unwrap();
    let ids: Vec<&str> = list.iter().map(|p| p.file_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn ticket_url_edit_applies_to_the_current_poster_only() {
    let (pool, _file) = test_pool();
    let conn = get_connection(&pool).unwrap();

    posters::add_poster(&conn, "a", "Первая", None).unwrap();
    posters::add_poster(&conn, "b", "Вторая", None).unwrap();

    assert!(posters::set_current_ticket_url(&conn, Some("https://x.com/t")).unwrap());
    let list = posters::list_posters(&conn).unwrap();
    assert_eq!(list[0].ticket_url, None);
    assert_eq!(list[1].ticket_url.as_deref(), Some("https://x.com/t"));

    assert!(posters::set_current_ticket_url(&conn, None).unwrap());
    let current = posters::current_poster(&conn).unwrap().unwrap();
    assert_eq!(current.ticket_url, None);
}
