//! Changelog reader and section-reference lookup.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::models::ChangelogEntry;

/// `## <timestamp> — /<namespace>:<command>` (em dash, en dash or hyphens).
static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^##\s+(.+?)\s+(?:—|–|--|-)\s+/([A-Za-z0-9_-]+):([A-Za-z0-9_.-]+)(?:\s.*)?$")
        .unwrap()
});

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse changelog text into entries in file order. Unrecognised text
/// yields an empty list.
pub fn parse_changelog(text: &str) -> Vec<ChangelogEntry> {
    let mut entries: Vec<ChangelogEntry> = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = ENTRY_RE.captures(line.trim_end()) {
            entries.push(ChangelogEntry {
                timestamp: caps[1].trim().to_string(),
                command: format!("{}:{}", &caps[2], &caps[3]),
                changes: Vec::new(),
            });
            continue;
        }
        if let Some(change) = line.trim_start().strip_prefix("- ") {
            if let Some(entry) = entries.last_mut() {
                let change = change.trim();
                if !change.is_empty() {
                    entry.changes.push(change.to_string());
                }
            }
        }
    }

    entries
}

/// Parse an ISO-ish timestamp. Naive forms are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl ChangelogEntry {
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Matches an alias written bare, as `#alias`, or as `` `#alias` ``.
pub struct AliasReference {
    pattern: Regex,
}

impl AliasReference {
    pub fn new(alias: &str) -> Option<Self> {
        let alias = alias.trim().trim_start_matches('#');
        if alias.is_empty() {
            return None;
        }
        let pattern = format!(
            r"(?i)(?:^|[^A-Za-z0-9_-])#?{}(?:$|[^A-Za-z0-9_-])",
            regex::escape(alias)
        );
        Regex::new(&pattern).ok().map(|pattern| Self { pattern })
    }

    pub fn is_referenced_by(&self, change: &str) -> bool {
        self.pattern.is_match(change)
    }
}

/// Most recent parseable timestamp among entries whose changes mention `alias`.
pub fn latest_reference(entries: &[ChangelogEntry], alias: &str) -> Option<DateTime<Utc>> {
    let reference = AliasReference::new(alias)?;
    entries
        .iter()
        .filter(|entry| {
            entry
                .changes
                .iter()
                .any(|change| reference.is_referenced_by(change))
        })
        .filter_map(ChangelogEntry::parsed_timestamp)
        .max()
}
