//! SQLite cache of the parsed specification.
//!
//! The store is disposable: every column except `readiness` (and the
//! `content_hashes` snapshots) can be rebuilt from the source texts. When the
//! database cannot be opened the store stays usable and every operation
//! degrades to an empty result.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use sha2::{Digest, Sha256};

use crate::errors::SpecdexResult;
use crate::models::{ChangelogEntry, Readiness, RebuildStats, Section};
use crate::parser::{parse_changelog, parse_spec, ParsedSpec};
use crate::query::guards::{clamp_limit, truncate_query, MAX_SEARCH_LIMIT};
use crate::store::schema;

const SECTION_COLUMNS: &str = "id, number, alias, heading, content, parent, word_count, level, \
                               line_start, readiness, last_updated";

#[derive(Clone, Debug)]
enum Location {
    File(PathBuf),
    Memory,
}

enum Handle {
    Unopened,
    Ready(Connection),
    Unavailable,
}

/// Strip a leading `#` and surrounding whitespace from a lookup key.
fn normalize_key(key: &str) -> &str {
    key.trim().trim_start_matches('#').trim()
}

/// Escape `LIKE` wildcards so the query matches literally under `ESCAPE '\'`.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn row_to_section(row: &rusqlite::Row<'_>) -> rusqlite::Result<Section> {
    let readiness: String = row.get(9)?;
    Ok(Section {
        id: Some(row.get(0)?),
        number: row.get(1)?,
        alias: row.get(2)?,
        heading: row.get(3)?,
        content: row.get(4)?,
        parent: row.get(5)?,
        word_count: row.get::<_, i64>(6)?.max(0) as usize,
        level: row.get::<_, i64>(7)?.clamp(0, i64::from(u8::MAX)) as u8,
        line_start: row.get::<_, i64>(8)?.max(0) as usize,
        readiness: readiness.parse().unwrap_or_default(),
        last_updated: row.get(10)?,
    })
}

/// Log a failed read and fall back to an empty value.
fn degrade<T: Default>(result: SpecdexResult<T>, operation: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(operation, error = %e, "index store read failed");
        T::default()
    })
}

// ---------------------------------------------------------------------------
// IndexStore
// ---------------------------------------------------------------------------

pub struct IndexStore {
    location: Location,
    handle: Handle,
}

impl IndexStore {
    /// Describe a store at `db_path`. No I/O happens until [`IndexStore::open`].
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(db_path.into()),
            handle: Handle::Unopened,
        }
    }

    /// A private in-memory store, gone on close.
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            handle: Handle::Unopened,
        }
    }

    pub fn db_path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    /// Acquire the connection, creating the directory and schema if absent.
    ///
    /// Returns whether the store is usable. Repeat calls return the cached
    /// outcome without touching the database again.
    pub fn open(&mut self) -> bool {
        match self.handle {
            Handle::Ready(_) => return true,
            Handle::Unavailable => return false,
            Handle::Unopened => {}
        }
        match Self::connect(&self.location) {
            Ok(conn) => {
                self.handle = Handle::Ready(conn);
                true
            }
            Err(e) => {
                tracing::warn!(
                    location = ?self.location,
                    error = %e,
                    "index store unavailable; continuing without cache"
                );
                self.handle = Handle::Unavailable;
                false
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.handle, Handle::Ready(_))
    }

    /// Release the connection. Safe to call when never opened.
    pub fn close(&mut self) {
        if let Handle::Ready(conn) = std::mem::replace(&mut self.handle, Handle::Unopened) {
            if let Err((_, e)) = conn.close() {
                tracing::warn!(error = %e, "failed to close index store cleanly");
            }
        }
    }

    fn connect(location: &Location) -> SpecdexResult<Connection> {
        let conn = match location {
            Location::File(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                let conn = Connection::open(path)?;
                conn.execute_batch("PRAGMA journal_mode = WAL;")?;
                conn
            }
            Location::Memory => Connection::open_in_memory()?,
        };
        schema::init_schema(&conn)?;
        Ok(conn)
    }

    fn conn(&self) -> Option<&Connection> {
        match &self.handle {
            Handle::Ready(conn) => Some(conn),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Rebuild
    // -----------------------------------------------------------------------

    /// Parse the texts and replace every section and changelog row in one
    /// transaction. Readiness carries over by alias, then by number.
    ///
    /// Returns `Ok(None)` when the store is unavailable. On error the
    /// transaction is rolled back before the error is returned, leaving the
    /// previous contents intact.
    pub fn rebuild(
        &mut self,
        spec_text: &str,
        changelog_text: Option<&str>,
        source_path: Option<&Path>,
    ) -> SpecdexResult<Option<RebuildStats>> {
        let parsed = parse_spec(spec_text);
        let entries = changelog_text.map(parse_changelog).unwrap_or_default();
        self.rebuild_parsed(&parsed, &entries, source_path)
    }

    /// [`IndexStore::rebuild`] for input that is already parsed.
    pub fn rebuild_parsed(
        &mut self,
        parsed: &ParsedSpec,
        entries: &[ChangelogEntry],
        source_path: Option<&Path>,
    ) -> SpecdexResult<Option<RebuildStats>> {
        let Handle::Ready(conn) = &mut self.handle else {
            tracing::debug!("rebuild skipped: index store unavailable");
            return Ok(None);
        };

        let started = Instant::now();
        let spec_version = parsed.frontmatter.version();

        let tx = conn.transaction()?;
        let write = (|| -> SpecdexResult<()> {
            let carried = load_readiness(&tx)?;
            tx.execute("DELETE FROM sections;", [])?;
            tx.execute("DELETE FROM changelog_entries;", [])?;

            let now = Utc::now().to_rfc3339();
            insert_sections(&tx, &parsed.sections, &carried, &now)?;
            insert_changelog(&tx, entries)?;

            match &spec_version {
                Some(version) => set_meta(&tx, "spec_version", version)?,
                None => {
                    tx.execute("DELETE FROM spec_meta WHERE key = 'spec_version';", [])?;
                }
            }
            set_meta(&tx, "last_rebuild", &now)?;
            if let Some(path) = source_path {
                set_meta(&tx, "source_path", &path.to_string_lossy())?;
            }
            Ok(())
        })();

        if let Err(e) = write {
            tracing::warn!(error = %e, "rebuild failed; rolling back");
            tx.rollback()?;
            return Err(e);
        }
        tx.commit()?;

        let stats = RebuildStats {
            sections: parsed.sections.len(),
            changelog_entries: entries.len(),
            spec_version,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            sections = stats.sections,
            changelog_entries = stats.changelog_entries,
            elapsed_ms = stats.elapsed_ms,
            "spec index rebuilt"
        );
        Ok(Some(stats))
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Case-insensitive alias lookup; a leading `#` is ignored.
    pub fn get_by_alias(&self, alias: &str) -> Option<Section> {
        let conn = self.conn()?;
        let alias = normalize_key(alias);
        if alias.is_empty() {
            return None;
        }
        let sql = format!(
            "SELECT {SECTION_COLUMNS} FROM sections WHERE alias = ?1 COLLATE NOCASE LIMIT 1;"
        );
        let result = conn
            .query_row(&sql, params![alias], row_to_section)
            .optional()
            .map_err(Into::into);
        degrade(result, "get_by_alias")
    }

    pub fn get_by_number(&self, number: &str) -> Option<Section> {
        let conn = self.conn()?;
        let sql = format!("SELECT {SECTION_COLUMNS} FROM sections WHERE number = ?1 LIMIT 1;");
        let result = conn
            .query_row(&sql, params![number.trim()], row_to_section)
            .optional()
            .map_err(Into::into);
        degrade(result, "get_by_number")
    }

    /// Alias first, then number.
    pub fn get(&self, alias_or_number: &str) -> Option<Section> {
        self.get_by_alias(alias_or_number)
            .or_else(|| self.get_by_number(alias_or_number))
    }

    pub fn children_of(&self, parent: &str) -> Vec<Section> {
        let sql = format!("SELECT {SECTION_COLUMNS} FROM sections WHERE parent = ?1 ORDER BY id;");
        self.select_sections(&sql, &[&parent.trim()], "children_of")
    }

    /// All sections in document order.
    pub fn list_sections(&self) -> Vec<Section> {
        let sql = format!("SELECT {SECTION_COLUMNS} FROM sections ORDER BY id;");
        self.select_sections(&sql, &[], "list_sections")
    }

    /// Substring search over heading and content; heading hits rank first.
    pub fn search(&self, query: &str, limit: i64) -> Vec<Section> {
        let query = truncate_query(query);
        if query.is_empty() {
            return Vec::new();
        }
        let pattern = format!("%{}%", escape_like(&query));
        let limit = clamp_limit(limit, MAX_SEARCH_LIMIT);
        // LIKE folds ASCII case only; other characters match as written.
        let sql = format!(
            "SELECT {SECTION_COLUMNS} FROM sections \
             WHERE heading LIKE ?1 ESCAPE '\\' OR content LIKE ?1 ESCAPE '\\' \
             ORDER BY (heading LIKE ?1 ESCAPE '\\') DESC, id ASC \
             LIMIT ?2;"
        );
        self.select_sections(&sql, &[&pattern, &limit], "search")
    }

    fn select_sections(
        &self,
        sql: &str,
        args: &[&dyn rusqlite::types::ToSql],
        operation: &str,
    ) -> Vec<Section> {
        let Some(conn) = self.conn() else {
            return Vec::new();
        };
        let result = (|| -> SpecdexResult<Vec<Section>> {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(args, row_to_section)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })();
        degrade(result, operation)
    }

    /// Newest entries first.
    pub fn changelog(&self, limit: i64) -> Vec<ChangelogEntry> {
        let Some(conn) = self.conn() else {
            return Vec::new();
        };
        let limit = clamp_limit(limit, MAX_SEARCH_LIMIT);
        let result = (|| -> SpecdexResult<Vec<ChangelogEntry>> {
            let mut stmt = conn.prepare(
                "SELECT timestamp, command, changes_json FROM changelog_entries \
                 ORDER BY id DESC LIMIT ?1;",
            )?;
            let rows = stmt.query_map(params![limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            let mut entries = Vec::new();
            for row in rows {
                let (timestamp, command, changes_json) = row?;
                entries.push(ChangelogEntry {
                    timestamp,
                    command,
                    changes: serde_json::from_str(&changes_json)?,
                });
            }
            Ok(entries)
        })();
        degrade(result, "changelog")
    }

    pub fn get_meta(&self, key: &str) -> Option<String> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                "SELECT value FROM spec_meta WHERE key = ?1 LIMIT 1;",
                params![key],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map(Option::flatten)
            .map_err(Into::into);
        degrade(result, "get_meta")
    }

    pub fn spec_version(&self) -> Option<String> {
        self.get_meta("spec_version")
    }

    // -----------------------------------------------------------------------
    // Readiness
    // -----------------------------------------------------------------------

    /// Update the readiness column of the section keyed by alias (preferred)
    /// or number. Returns whether a row matched.
    pub fn set_readiness(&self, alias_or_number: &str, readiness: Readiness) -> bool {
        let Some(conn) = self.conn() else {
            return false;
        };
        let key = normalize_key(alias_or_number);
        if key.is_empty() {
            return false;
        }
        let result = (|| -> SpecdexResult<bool> {
            let by_alias = conn.execute(
                "UPDATE sections SET readiness = ?2 WHERE alias = ?1 COLLATE NOCASE;",
                params![key, readiness.as_str()],
            )?;
            if by_alias > 0 {
                return Ok(true);
            }
            let by_number = conn.execute(
                "UPDATE sections SET readiness = ?2 WHERE number = ?1;",
                params![key, readiness.as_str()],
            )?;
            Ok(by_number > 0)
        })();
        degrade(result, "set_readiness")
    }

    pub fn set_readiness_by_id(&self, id: i64, readiness: Readiness) -> bool {
        let Some(conn) = self.conn() else {
            return false;
        };
        let result = conn
            .execute(
                "UPDATE sections SET readiness = ?2 WHERE id = ?1;",
                params![id, readiness.as_str()],
            )
            .map(|changed| changed > 0)
            .map_err(Into::into);
        degrade(result, "set_readiness_by_id")
    }

    /// Section count per stored readiness value.
    pub fn readiness_summary(&self) -> BTreeMap<String, usize> {
        let Some(conn) = self.conn() else {
            return BTreeMap::new();
        };
        let result = (|| -> SpecdexResult<BTreeMap<String, usize>> {
            let mut stmt = conn.prepare(
                "SELECT readiness, COUNT(*) FROM sections GROUP BY readiness ORDER BY readiness;",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut summary = BTreeMap::new();
            for row in rows {
                let (readiness, count) = row?;
                summary.insert(readiness, count.max(0) as usize);
            }
            Ok(summary)
        })();
        degrade(result, "readiness_summary")
    }

    // -----------------------------------------------------------------------
    // Content hashes
    // -----------------------------------------------------------------------

    /// SHA-256 hex digest of section content. Pure; needs no store.
    pub fn content_hash(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Hash recorded by the previous assessment for `key`.
    pub fn get_content_hash(&self, key: &str) -> Option<String> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                "SELECT hash FROM content_hashes WHERE key = ?1 LIMIT 1;",
                params![normalize_key(key)],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into);
        degrade(result, "get_content_hash")
    }

    pub fn set_content_hash(&self, key: &str, hash: &str) -> bool {
        let Some(conn) = self.conn() else {
            return false;
        };
        let key = normalize_key(key);
        if key.is_empty() {
            return false;
        }
        let result = conn
            .execute(
                "INSERT INTO content_hashes(key, hash, recorded_at) \
                 VALUES (?1, ?2, CURRENT_TIMESTAMP) \
                 ON CONFLICT(key) DO UPDATE SET \
                     hash = excluded.hash, \
                     recorded_at = excluded.recorded_at;",
                params![key, hash],
            )
            .map(|changed| changed > 0)
            .map_err(Into::into);
        degrade(result, "set_content_hash")
    }
}

impl Drop for IndexStore {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Rebuild helpers
// ---------------------------------------------------------------------------

fn alias_slot(alias: &str) -> String {
    format!("alias:{}", alias.to_lowercase())
}

fn number_slot(number: &str) -> String {
    format!("number:{number}")
}

/// Snapshot the readiness column before rows are replaced.
fn load_readiness(tx: &Transaction<'_>) -> SpecdexResult<HashMap<String, Readiness>> {
    let mut stmt = tx.prepare("SELECT alias, number, readiness FROM sections;")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, Option<String>>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    let mut carried = HashMap::new();
    for row in rows {
        let (alias, number, readiness) = row?;
        let Ok(readiness) = readiness.parse::<Readiness>() else {
            continue;
        };
        if let Some(alias) = alias {
            carried.insert(alias_slot(&alias), readiness);
        }
        if let Some(number) = number {
            carried.insert(number_slot(&number), readiness);
        }
    }
    Ok(carried)
}

fn insert_sections(
    tx: &Transaction<'_>,
    sections: &[Section],
    carried: &HashMap<String, Readiness>,
    now: &str,
) -> SpecdexResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO sections ( \
             number, alias, heading, content, parent, word_count, level, \
             line_start, readiness, last_updated \
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
    )?;
    for section in sections {
        let readiness = section
            .alias
            .as_deref()
            .and_then(|alias| carried.get(&alias_slot(alias)))
            .or_else(|| {
                section
                    .number
                    .as_deref()
                    .and_then(|number| carried.get(&number_slot(number)))
            })
            .copied()
            .unwrap_or(section.readiness);
        stmt.execute(params![
            section.number,
            section.alias,
            section.heading,
            section.content,
            section.parent,
            section.word_count as i64,
            i64::from(section.level),
            section.line_start as i64,
            readiness.as_str(),
            now,
        ])?;
    }
    Ok(())
}

fn insert_changelog(tx: &Transaction<'_>, entries: &[ChangelogEntry]) -> SpecdexResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO changelog_entries (timestamp, command, changes_json) VALUES (?1, ?2, ?3);",
    )?;
    for entry in entries {
        stmt.execute(params![
            entry.timestamp,
            entry.command,
            serde_json::to_string(&entry.changes)?,
        ])?;
    }
    Ok(())
}

fn set_meta(tx: &Transaction<'_>, key: &str, value: &str) -> SpecdexResult<()> {
    tx.execute(
        "INSERT INTO spec_meta(key, value) VALUES(?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = "\
---
version: 1.2.0
---
# Widget Spec

## 1. Vision
A long enough vision statement that talks about why the widget matters to everyone.

## 2. Behavior {#behavior}
Container text.

### 2.1 Widget Core {#widget-core}
The widget core handles sizing and layout of every widget in the system.

### 2.2 Widget Paint `#widget-paint`
Painting rules.
";

    const CHANGELOG: &str = "\
## 2025-01-02T00:00:00Z — /spec:update
- Added `#widget-core` (2.1)
## 2025-01-05T00:00:00Z — /spec:refine
- Tweaked `#widget-paint` (2.2)
";

    fn rebuilt() -> IndexStore {
        let mut store = IndexStore::in_memory();
        assert!(store.open());
        store
            .rebuild(SPEC, Some(CHANGELOG), Some(Path::new("spec/SPEC.md")))
            .unwrap()
            .unwrap();
        store
    }

    fn section_rows(store: &IndexStore) -> Vec<Section> {
        store
            .list_sections()
            .into_iter()
            .map(|mut s| {
                s.last_updated = None;
                s.id = None;
                s
            })
            .collect()
    }

    #[test]
    fn open_is_idempotent() {
        let mut store = IndexStore::in_memory();
        assert!(store.open());
        assert!(store.open());
        assert!(store.is_available());
    }

    #[test]
    fn open_creates_directory_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.db");
        let mut store = IndexStore::new(&path);
        assert!(store.open());
        assert!(path.exists());
        assert_eq!(store.db_path(), Some(path.as_path()));
    }

    #[test]
    fn unavailable_store_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let mut store = IndexStore::new(blocker.join("index.db"));

        assert!(!store.open());
        assert!(!store.open());
        assert!(store.rebuild(SPEC, None, None).unwrap().is_none());
        assert!(store.get_by_alias("widget-core").is_none());
        assert!(store.list_sections().is_empty());
        assert!(!store.set_readiness("widget-core", Readiness::Aligned));
        assert!(store.readiness_summary().is_empty());
        assert!(store.get_content_hash("widget-core").is_none());
    }

    #[test]
    fn never_opened_close_is_safe() {
        let mut store = IndexStore::in_memory();
        store.close();
        assert!(!store.is_available());
        assert!(store.list_sections().is_empty());
    }

    #[test]
    fn rebuild_loads_sections_changelog_and_meta() {
        let store = rebuilt();
        assert_eq!(store.list_sections().len(), 4);
        assert_eq!(store.spec_version().as_deref(), Some("1.2.0"));
        assert_eq!(store.get_meta("source_path").as_deref(), Some("spec/SPEC.md"));
        assert!(store.get_meta("last_rebuild").is_some());

        let changelog = store.changelog(10);
        assert_eq!(changelog.len(), 2);
        assert_eq!(changelog[0].command, "spec:refine");
        assert_eq!(changelog[1].changes, vec!["Added `#widget-core` (2.1)".to_string()]);
    }

    #[test]
    fn point_lookups() {
        let store = rebuilt();
        let core = store.get_by_alias("#Widget-Core").unwrap();
        assert_eq!(core.number.as_deref(), Some("2.1"));
        assert_eq!(store.get_by_number("2.2").unwrap().alias.as_deref(), Some("widget-paint"));
        assert_eq!(store.get("1").unwrap().heading, "Vision");
        assert!(store.get("missing").is_none());

        let children: Vec<_> = store
            .children_of("2")
            .into_iter()
            .filter_map(|s| s.alias)
            .collect();
        assert_eq!(children, vec!["widget-core", "widget-paint"]);
    }

    #[test]
    fn search_ranks_heading_hits_first() {
        let store = rebuilt();
        let hits = store.search("widget", 10);
        assert_eq!(hits[0].heading, "Widget Core");
        assert!(hits.iter().any(|s| s.heading == "Vision"));
        assert!(store.search("   ", 10).is_empty());
        assert_eq!(store.search("widget", 1).len(), 1);
    }

    #[test]
    fn search_treats_wildcards_and_non_ascii_literally() {
        let mut store = IndexStore::in_memory();
        assert!(store.open());
        let spec = "\
## 2.1 Über Widget {#uber}
Runs the core_flow loop at 100% duty.

## 2.2 Engine {#engine}
The corexflow engine idles at 1000 rpm.
";
        store.rebuild(spec, None, None).unwrap().unwrap();

        let keys = |query: &str| -> Vec<String> {
            store
                .search(query, 10)
                .into_iter()
                .filter_map(|s| s.alias)
                .collect()
        };
        assert_eq!(keys("core_flow"), vec!["uber"]);
        assert_eq!(keys("100%"), vec!["uber"]);
        assert_eq!(keys("Über"), vec!["uber"]);
        assert_eq!(keys("CORExFLOW"), vec!["engine"]);
        assert!(keys("a\\b").is_empty());
    }

    #[test]
    fn set_readiness_targets_one_row() {
        let store = rebuilt();
        assert!(store.set_readiness("widget-core", Readiness::Aligned));
        assert!(store.set_readiness("1", Readiness::Aligned));
        assert!(!store.set_readiness("nope", Readiness::Aligned));

        let paint = store.get_by_alias("widget-paint").unwrap();
        assert!(store.set_readiness_by_id(paint.id.unwrap(), Readiness::ReadyToBuild));
        assert!(!store.set_readiness_by_id(9_999, Readiness::ReadyToBuild));

        let summary = store.readiness_summary();
        assert_eq!(summary.get("aligned"), Some(&2));
        assert_eq!(summary.get("ready-to-build"), Some(&1));
        assert_eq!(summary.get("draft"), Some(&1));
    }

    #[test]
    fn rebuild_is_idempotent_and_keeps_readiness() {
        let mut store = rebuilt();
        store.set_readiness("widget-core", Readiness::Satisfied);
        store.set_readiness("1", Readiness::Aligned);
        let before = section_rows(&store);

        store
            .rebuild(SPEC, Some(CHANGELOG), Some(Path::new("spec/SPEC.md")))
            .unwrap();
        assert_eq!(section_rows(&store), before);
        assert_eq!(
            store.get_by_alias("widget-core").unwrap().readiness,
            Readiness::Satisfied
        );
        assert_eq!(store.get("1").unwrap().readiness, Readiness::Aligned);
    }

    #[test]
    fn failed_rebuild_rolls_back() {
        let mut store = rebuilt();
        let before = section_rows(&store);

        // Force an insert failure mid-transaction.
        store
            .conn()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_vision BEFORE INSERT ON sections \
                 WHEN NEW.heading = 'Vision' \
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let err = store.rebuild(SPEC, Some(CHANGELOG), None);
        assert!(err.is_err());
        assert_eq!(section_rows(&store), before);
        assert_eq!(store.changelog(10).len(), 2);
    }

    #[test]
    fn content_hash_is_stable_and_persisted() {
        let store = rebuilt();
        let first = IndexStore::content_hash("same text");
        assert_eq!(first, IndexStore::content_hash("same text"));
        assert_ne!(first, IndexStore::content_hash("other text"));
        assert_eq!(first.len(), 64);

        assert!(store.get_content_hash("widget-core").is_none());
        assert!(store.set_content_hash("#widget-core", &first));
        assert_eq!(store.get_content_hash("WIDGET-CORE"), Some(first.clone()));

        // Snapshots survive a rebuild.
        let mut store = store;
        store.rebuild(SPEC, None, None).unwrap();
        assert_eq!(store.get_content_hash("widget-core"), Some(first));
        assert!(store.changelog(10).is_empty());
    }
}
