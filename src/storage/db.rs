use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::core::validation::{MAX_AGE, MIN_AGE};
use crate::core::week::WeekKey;

/// Пол пользователя.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Unset,
}

impl Gender {
    /// Значение, записываемое в колонку `gender`.
    pub fn as_db(self) -> Option<&'static str> {
        match self {
            Gender::Male => Some("male"),
            Gender::Female => Some("female"),
            Gender::Unset => None,
        }
    }

    /// Читает значение колонки `gender` (NULL или мусор = Unset).
    pub fn from_db(raw: Option<&str>) -> Self {
        match raw {
            Some("male") => Gender::Male,
            Some("female") => Gender::Female,
            _ => Gender::Unset,
        }
    }

    /// Отображаемое название пола.
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "мужской",
            Gender::Female => "женский",
            Gender::Unset => "не указан",
        }
    }
}

/// Структура, представляющая пользователя в базе данных.
#[derive(Debug, Clone)]
pub struct User {
    /// Telegram ID пользователя
    pub tg_id: i64,
    /// Отображаемое имя, введенное при регистрации
    pub name: Option<String>,
    /// Пол пользователя
    pub gender: Gender,
    /// Возраст (14-100), None до регистрации
    pub age: Option<i64>,
    /// Привязанный VK-профиль ("id12345" или screen name)
    pub vk_id: Option<String>,
    /// Имя пользователя (username) в Telegram, если доступно
    pub username: Option<String>,
    /// Число пропущенных подряд недель
    pub missed_in_row: i64,
}

impl User {
    /// True iff all three registration fields are present and valid.
    ///
    /// Derived from data on every read; never stored, so it cannot go stale.
    pub fn registration_complete(&self) -> bool {
        let name_ok = self.name.as_deref().map(|n| !n.trim().is_empty()).unwrap_or(false);
        let gender_ok = self.gender != Gender::Unset;
        let age_ok = matches!(self.age, Some(a) if (MIN_AGE..=MAX_AGE).contains(&a));
        name_ok && gender_ok && age_ok
    }
}

/// Partial update for a user row; None fields never overwrite stored values.
#[derive(Debug, Default, Clone)]
pub struct UserPatch {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<i64>,
    pub vk_id: Option<String>,
    pub username: Option<String>,
}

/// Aggregate user statistics for the admin panel.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UserStats {
    pub total: i64,
    pub with_vk: i64,
    pub male: i64,
    pub female: i64,
    pub registered_today: i64,
}

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections and runs schema migrations.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
///
/// # Returns
///
/// Returns a `DbPool` on success or an `r2d2::Error` if pool creation fails.
pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder()
        .max_size(10) // Maximum 10 connections in the pool
        .build(manager)?;

    // Ensure schema is up to date on first connection
    let conn = pool.get()?;
    if let Err(e) = init_schema(&conn) {
        log::error!("Failed to initialize schema: {}", e);
    }
    if let Err(e) = migrate_schema(&conn) {
        log::warn!("Failed to migrate schema: {}", e);
        // Don't fail on migration errors, as they might be expected
    }

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is automatically returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Creates the tables if they do not exist yet.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            tg_id INTEGER PRIMARY KEY,
            name TEXT,
            gender TEXT,
            age INTEGER,
            vk_id TEXT,
            username TEXT,
            missed_in_row INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE TABLE IF NOT EXISTS attendance (
            tg_id INTEGER NOT NULL,
            week_key TEXT NOT NULL,
            PRIMARY KEY (tg_id, week_key)
        );
        CREATE TABLE IF NOT EXISTS posters (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id TEXT NOT NULL,
            caption TEXT NOT NULL DEFAULT '',
            ticket_url TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
}

/// Migrate database schema to ensure all required columns exist
/// This function safely adds missing columns to existing tables
fn migrate_schema(conn: &Connection) -> Result<()> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='users'",
        [],
        |row| Ok(row.get::<_, i32>(0)? > 0),
    )?;

    if !table_exists {
        return Ok(());
    }

    let mut stmt = conn.prepare("PRAGMA table_info(users)")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }

    // Add missed_in_row if it doesn't exist (older databases)
    if !columns.contains(&"missed_in_row".to_string()) {
        log::info!("Adding missing column: missed_in_row to users table");
        if let Err(e) = conn.execute("ALTER TABLE users ADD COLUMN missed_in_row INTEGER NOT NULL DEFAULT 0", []) {
            log::warn!("Failed to add missed_in_row column: {}", e);
        }
    }

    // Add created_at if it doesn't exist
    if !columns.contains(&"created_at".to_string()) {
        log::info!("Adding missing column: created_at to users table");
        if let Err(e) = conn.execute("ALTER TABLE users ADD COLUMN created_at TEXT", []) {
            log::warn!("Failed to add created_at column: {}", e);
        }
    }

    Ok(())
}

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<User> {
    let gender: Option<String> = row.get(2)?;
    Ok(User {
        tg_id: row.get(0)?,
        name: row.get(1)?,
        gender: Gender::from_db(gender.as_deref()),
        age: row.get(3)?,
        vk_id: row.get(4)?,
        username: row.get(5)?,
        missed_in_row: row.get(6)?,
    })
}

/// Fetches a user row by Telegram id.
pub fn get_user(conn: &Connection, tg_id: i64) -> Result<Option<User>> {
    conn.query_row(
        "SELECT tg_id, name, gender, age, vk_id, username, missed_in_row FROM users WHERE tg_id = ?1",
        params![tg_id],
        row_to_user,
    )
    .optional()
}

/// Inserts or merge-updates a user row.
///
/// Field-level merge: a non-null incoming value wins, a null incoming value
/// never overwrites what is already stored (COALESCE on the excluded row).
pub fn upsert_user(conn: &Connection, tg_id: i64, patch: &UserPatch) -> Result<()> {
    conn.execute(
        "INSERT INTO users (tg_id, name, gender, age, vk_id, username)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(tg_id) DO UPDATE
         SET name = COALESCE(excluded.name, users.name),
             gender = COALESCE(excluded.gender, users.gender),
             age = COALESCE(excluded.age, users.age),
             vk_id = COALESCE(excluded.vk_id, users.vk_id),
             username = COALESCE(excluded.username, users.username)",
        params![
            tg_id,
            patch.name,
            patch.gender.and_then(Gender::as_db),
            patch.age,
            patch.vk_id,
            patch.username,
        ],
    )?;
    Ok(())
}

/// Links a VK profile to a user, overwriting any previous link.
pub fn set_vk_id(conn: &Connection, tg_id: i64, vk_id: &str) -> Result<()> {
    upsert_user(
        conn,
        tg_id,
        &UserPatch {
            vk_id: Some(vk_id.to_string()),
            ..UserPatch::default()
        },
    )
}

/// Lists all known user ids in insertion order.
pub fn list_known_user_ids(conn: &Connection) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT tg_id FROM users ORDER BY tg_id")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

/// Finds a user by Telegram username (stored without '@').
pub fn find_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    conn.query_row(
        "SELECT tg_id, name, gender, age, vk_id, username, missed_in_row
         FROM users WHERE username = ?1 COLLATE NOCASE",
        params![username],
        row_to_user,
    )
    .optional()
}

/// Persists a user's consecutive-miss counter.
pub fn set_missed_in_row(conn: &Connection, tg_id: i64, missed: i64) -> Result<()> {
    conn.execute(
        "UPDATE users SET missed_in_row = ?2 WHERE tg_id = ?1",
        params![tg_id, missed],
    )?;
    Ok(())
}

/// Records attendance for the given week; idempotent.
pub fn mark_attended(conn: &Connection, tg_id: i64, week: WeekKey) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO attendance (tg_id, week_key) VALUES (?1, ?2)",
        params![tg_id, week.to_string()],
    )?;
    Ok(())
}

/// Whether the user attended the given week.
pub fn attended(conn: &Connection, tg_id: i64, week: WeekKey) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM attendance WHERE tg_id = ?1 AND week_key = ?2",
        params![tg_id, week.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Aggregate statistics for the admin panel.
pub fn user_stats(conn: &Connection) -> Result<UserStats> {
    conn.query_row(
        "SELECT COUNT(*),
                COUNT(vk_id),
                SUM(CASE WHEN gender = 'male' THEN 1 ELSE 0 END),
                SUM(CASE WHEN gender = 'female' THEN 1 ELSE 0 END),
                SUM(CASE WHEN date(created_at) = date('now') THEN 1 ELSE 0 END)
         FROM users",
        [],
        |row| {
            Ok(UserStats {
                total: row.get(0)?,
                with_vk: row.get(1)?,
                male: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                female: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                registered_today: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            })
        },
    )
}
