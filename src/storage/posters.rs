//! Ordered poster list
//!
//! Posters are appended in authoring order; the last element is the "current"
//! poster shown in the menu and used for scheduled broadcasts.

use rusqlite::{params, Connection, OptionalExtension, Result};

/// A confirmed promotional poster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poster {
    pub id: i64,
    /// Telegram file id of the previously uploaded photo
    pub file_id: String,
    pub caption: String,
    pub ticket_url: Option<String>,
}

fn row_to_poster(row: &rusqlite::Row<'_>) -> Result<Poster> {
    Ok(Poster {
        id: row.get(0)?,
        file_id: row.get(1)?,
        caption: row.get(2)?,
        ticket_url: row.get(3)?,
    })
}

/// Appends a poster to the list; returns its row id.
pub fn add_poster(conn: &Connection, file_id: &str, caption: &str, ticket_url: Option<&str>) -> Result<i64> {
    conn.execute(
        "INSERT INTO posters (file_id, caption, ticket_url) VALUES (?1, ?2, ?3)",
        params![file_id, caption, ticket_url],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All posters in insertion order (oldest first).
pub fn list_posters(conn: &Connection) -> Result<Vec<Poster>> {
    let mut stmt = conn.prepare("SELECT id, file_id, caption, ticket_url FROM posters ORDER BY id")?;
    let rows = stmt.query_map([], row_to_poster)?;
    rows.collect()
}

/// The newest poster, if any.
pub fn current_poster(conn: &Connection) -> Result<Option<Poster>> {
    conn.query_row(
        "SELECT id, file_id, caption, ticket_url FROM posters ORDER BY id DESC LIMIT 1",
        [],
        row_to_poster,
    )
    .optional()
}

/// Deletes the poster at the given zero-based position in insertion order.
///
/// Returns true if a poster was removed. If the removed poster was current,
/// the new last element becomes current implicitly.
pub fn delete_poster_at(conn: &Connection, index: usize) -> Result<bool> {
    let posters = list_posters(conn)?;
    let Some(poster) = posters.get(index) else {
        return Ok(false);
    };
    let removed = conn.execute("DELETE FROM posters WHERE id = ?1", params![poster.id])?;
    Ok(removed > 0)
}

/// Deletes the current (newest) poster. Returns true if one existed.
pub fn delete_current_poster(conn: &Connection) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM posters WHERE id = (SELECT MAX(id) FROM posters)",
        [],
    )?;
    Ok(removed > 0)
}

/// Sets (or clears) the ticket URL on the current poster.
/// Returns false when there is no poster to update.
pub fn set_current_ticket_url(conn: &Connection, ticket_url: Option<&str>) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE posters SET ticket_url = ?1 WHERE id = (SELECT MAX(id) FROM posters)",
        params![ticket_url],
    )?;
    Ok(updated > 0)
}
