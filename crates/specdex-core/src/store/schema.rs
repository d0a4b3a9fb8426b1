//! SQLite schema DDL and version stamp for the spec index.

use rusqlite::Connection;

use crate::errors::{SpecdexError, SpecdexResult};

/// Layout version stamped into `spec_meta`. The index is disposable, so a
/// database written by a newer layout is refused rather than converted.
pub const SCHEMA_VERSION: i32 = 1;

/// Every statement is `IF NOT EXISTS` so it is safe to replay on an
/// already-initialised database.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // ── tables ──────────────────────────────────────────────────────────
    "CREATE TABLE IF NOT EXISTS spec_meta (
        key TEXT PRIMARY KEY,
        value TEXT
    );",
    "CREATE TABLE IF NOT EXISTS sections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        number TEXT,
        alias TEXT UNIQUE,
        heading TEXT NOT NULL,
        content TEXT NOT NULL DEFAULT '',
        parent TEXT,
        word_count INTEGER NOT NULL DEFAULT 0,
        level INTEGER NOT NULL,
        line_start INTEGER NOT NULL,
        readiness TEXT NOT NULL DEFAULT 'draft',
        last_updated TEXT
    );",
    "CREATE TABLE IF NOT EXISTS changelog_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        command TEXT NOT NULL,
        changes_json TEXT NOT NULL DEFAULT '[]'
    );",
    // Survives rebuilds: the stability check compares against these.
    "CREATE TABLE IF NOT EXISTS content_hashes (
        key TEXT PRIMARY KEY COLLATE NOCASE,
        hash TEXT NOT NULL,
        recorded_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    // ── indexes ─────────────────────────────────────────────────────────
    "CREATE INDEX IF NOT EXISTS idx_sections_number ON sections(number);",
    "CREATE INDEX IF NOT EXISTS idx_sections_parent ON sections(parent);",
    "CREATE INDEX IF NOT EXISTS idx_sections_readiness ON sections(readiness);",
];

/// Apply the DDL and stamp [`SCHEMA_VERSION`]. Fails when the database
/// already carries a newer version.
pub fn init_schema(conn: &Connection) -> SpecdexResult<()> {
    for stmt in SCHEMA_STATEMENTS {
        conn.execute_batch(stmt)?;
    }
    match get_schema_version(conn) {
        0 => {
            conn.execute(
                "INSERT INTO spec_meta(key, value) VALUES('schema_version', ?1) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
                rusqlite::params![SCHEMA_VERSION.to_string()],
            )?;
            Ok(())
        }
        SCHEMA_VERSION => Ok(()),
        found => Err(SpecdexError::Database(format!(
            "index schema v{found} is newer than supported v{SCHEMA_VERSION}"
        ))),
    }
}

/// Stored schema version; 0 when absent or unparseable.
pub(crate) fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT value FROM spec_meta WHERE key = 'schema_version';",
        [],
        |row| row.get::<_, String>(0),
    )
    .ok()
    .and_then(|v| v.parse().ok())
    .unwrap_or(0)
}
