use anyhow::Result;
use rusqlite::Connection;

use crate::parser::segment::Section;

const DB_PATH: &str = "data/cboa.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS captures (
            id           INTEGER PRIMARY KEY,
            source       TEXT NOT NULL,
            text         TEXT NOT NULL,
            line_count   INTEGER NOT NULL,
            captured_at  TEXT NOT NULL DEFAULT (datetime('now')),
            processed_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_captures_processed ON captures(processed_at);

        CREATE TABLE IF NOT EXISTS sections (
            id         INTEGER PRIMARY KEY,
            capture_id INTEGER NOT NULL REFERENCES captures(id),
            position   INTEGER NOT NULL,
            title      TEXT NOT NULL,
            body       TEXT NOT NULL,
            body_len   INTEGER NOT NULL,
            UNIQUE(capture_id, title)
        );
        CREATE INDEX IF NOT EXISTS idx_sections_capture ON sections(capture_id);
        ",
    )?;
    Ok(())
}

// ── Captures ──

/// One snapshot of the page's visible text.
pub struct Capture {
    pub id: i64,
    pub source: String,
    pub text: String,
}

pub fn insert_capture(conn: &Connection, source: &str, text: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO captures (source, text, line_count) VALUES (?1, ?2, ?3)",
        rusqlite::params![source, text, text.lines().count() as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<Capture>> {
    let sql = format!(
        "SELECT id, source, text FROM captures
         WHERE processed_at IS NULL
         ORDER BY id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Capture {
                id: row.get(0)?,
                source: row.get(1)?,
                text: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn latest_capture_id(conn: &Connection) -> Result<Option<i64>> {
    let id = conn.query_row("SELECT MAX(id) FROM captures", [], |r| r.get(0))?;
    Ok(id)
}

pub fn capture_source(conn: &Connection, capture_id: i64) -> Result<String> {
    let source = conn.query_row(
        "SELECT source FROM captures WHERE id = ?1",
        rusqlite::params![capture_id],
        |r| r.get(0),
    )?;
    Ok(source)
}

// ── Sections ──

pub struct SectionRow {
    pub position: i64,
    pub title: String,
    pub body: String,
    pub body_len: i64,
}

/// Replace a capture's sections with a fresh segmentation and stamp the
/// capture processed, in one transaction.
pub fn save_sections(conn: &Connection, capture_id: i64, sections: &[Section]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        tx.execute(
            "DELETE FROM sections WHERE capture_id = ?1",
            rusqlite::params![capture_id],
        )?;
        let mut stmt = tx.prepare(
            "INSERT INTO sections (capture_id, position, title, body, body_len)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (position, s) in sections.iter().enumerate() {
            stmt.execute(rusqlite::params![
                capture_id,
                position as i64,
                s.title,
                s.body,
                s.body.chars().count() as i64,
            ])?;
        }
        tx.execute(
            "UPDATE captures SET processed_at = datetime('now') WHERE id = ?1",
            rusqlite::params![capture_id],
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub fn fetch_sections(conn: &Connection, capture_id: i64) -> Result<Vec<SectionRow>> {
    let mut stmt = conn.prepare(
        "SELECT position, title, body, body_len FROM sections
         WHERE capture_id = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![capture_id], |row| {
            Ok(SectionRow {
                position: row.get(0)?,
                title: row.get(1)?,
                body: row.get(2)?,
                body_len: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub captures: usize,
    pub processed: usize,
    pub unprocessed: usize,
    pub sections: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let captures: usize = conn.query_row("SELECT COUNT(*) FROM captures", [], |r| r.get(0))?;
    let processed: usize = conn.query_row(
        "SELECT COUNT(*) FROM captures WHERE processed_at IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let sections: usize = conn.query_row("SELECT COUNT(*) FROM sections", [], |r| r.get(0))?;
    Ok(Stats {
        captures,
        processed,
        unprocessed: captures - processed,
        sections,
    })
}
