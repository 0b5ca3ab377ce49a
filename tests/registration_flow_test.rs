//! Integration tests for the registration flow and user storage
//!
//! Run with: cargo test --test registration_flow_test

use tempfile::NamedTempFile;

use tusabot::core::week::WeekKey;
use tusabot::session::registration::{resume_step, RegistrationStep};
use tusabot::storage::cache::StoreCache;
use tusabot::storage::db::{self, Gender, UserPatch};
use tusabot::storage::{create_pool, get_connection, DbPool};

fn test_pool() -> (DbPool, NamedTempFile) {
    let file = NamedTempFile::new().expect("temp db file");
    let pool = create_pool(file.path().to_str().expect("utf8 path")).expect("pool");
    (pool, file)
}

#[test]
fn registration_fills_profile_step_by_step() {
    let (pool, _file) = test_pool();
    let conn = get_connection(&pool).unwrap();

    // First contact: nothing stored yet, registration starts at the name
    assert_eq!(resume_step(None), Some(RegistrationStep::Name));

    db::upsert_user(
        &conn,
        100,
        &UserPatch {
            name: Some("Аня".to_string()),
            ..UserPatch::default()
        },
    )
    .unwrap();
    let user = db::get_user(&conn, 100).unwrap().unwrap();
    assert_eq!(resume_step(Some(&user)), Some(RegistrationStep::Gender));
    assert!(!user.registration_complete());

    db::upsert_user(
        &conn,
        100,
        &UserPatch {
            gender: Some(Gender::Female),
            ..UserPatch::default()
        },
    )
    .unwrap();
    let user = db::get_user(&conn, 100).unwrap().unwrap();
    assert_eq!(resume_step(Some(&user)), Some(RegistrationStep::Age));

    db::upsert_user(
        &conn,
        100,
        &UserPatch {
            age: Some(21),
            ..UserPatch::default()
        },
    )
    .unwrap();
    let user = db::get_user(&conn, 100).unwrap().unwrap();
    assert_eq!(resume_step(Some(&user)), None);
    assert!(user.registration_complete());
}

#[test]
fn interrupted_registration_resumes_where_it_stopped() {
    let (pool, _file) = test_pool();
    let conn = get_connection(&pool).unwrap();

    // The user answered the name question and disappeared
    db::upsert_user(
        &conn,
        200,
        &UserPatch {
            name: Some("Игорь".to_string()),
            username: Some("igor".to_string()),
            ..UserPatch::default()
        },
    )
    .unwrap();

    // A fresh /start later derives the step from persisted data
    let user = db::get_user(&conn, 200).unwrap().unwrap();
    assert_eq!(resume_step(Some(&user)), Some(RegistrationStep::Gender));
    // The already-given answer survived
    assert_eq!(user.name.as_deref(), Some("Игорь"));
}

#[test]
fn username_refresh_never_clears_profile_fields() {
    let (pool, _file) = test_pool();
    let conn = get_connection(&pool).unwrap();

    db::upsert_user(
        &conn,
        300,
        &UserPatch {
            name: Some("Аня".to_string()),
            gender: Some(Gender::Female),
            age: Some(21),
            username: Some("anya".to_string()),
            ..UserPatch::default()
        },
    )
    .unwrap();

    // The touch on every message carries only the username
    db::upsert_user(
        &conn,
        300,
        &UserPatch {
            username: Some("anya_new".to_string()),
            ..UserPatch::default()
        },
    )
    .unwrap();

    let user = db::get_user(&conn, 300).unwrap().unwrap();
    assert_eq!(user.username.as_deref(), Some("anya_new"));
    assert_eq!(user.name.as_deref(), Some("Аня"));
    assert_eq!(user.gender, Gender::Female);
    assert_eq!(user.age, Some(21));
}

#[test]
fn attendance_marks_current_week_once() {
    let (pool, _file) = test_pool();
    let conn = get_connection(&pool).unwrap();
    db::upsert_user(&conn, 400, &UserPatch::default()).unwrap();

    let week = WeekKey::current();
    db::mark_attended(&conn, 400, week).unwrap();
    db::mark_attended(&conn, 400, week).unwrap();

    assert!(db::attended(&conn, 400, week).unwrap());
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM attendance WHERE tg_id = 400", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn cache_tracks_new_users_and_vk_links() {
    let (pool, _file) = test_pool();
    let conn = get_connection(&pool).unwrap();

    db::upsert_user(&conn, 500, &UserPatch::default()).unwrap();
    db::set_vk_id(&conn, 500, "id777").unwrap();

    let cache = StoreCache::load(&conn).unwrap();
    assert!(cache.is_known(500));
    assert_eq!(cache.vk_id(&conn, 500).unwrap().as_deref(), Some("id777"));

    // A user written after load is noted explicitly
    db::upsert_user(&conn, 501, &UserPatch::default()).unwrap();
    cache.note_user(501);
    assert!(cache.is_known(501));
    assert_eq!(cache.known_count(), 2);
}
