//! Shared typed models used across parsing, storage, and assessment layers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SpecdexError;

// ---------------------------------------------------------------------------
// Readiness
// ---------------------------------------------------------------------------

/// Sync state between a section's text and its implementation.
///
/// Ordered by increasing confidence. `Aligned` and `ReadyToBuild` are
/// siblings: the derived `Ord` exists for stable map ordering only.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Readiness {
    #[default]
    Draft,
    Undocumented,
    ReadyToBuild,
    Aligned,
    ReadyToExecute,
    Satisfied,
}

impl Readiness {
    pub const ALL: [Readiness; 6] = [
        Readiness::Draft,
        Readiness::Undocumented,
        Readiness::ReadyToBuild,
        Readiness::Aligned,
        Readiness::ReadyToExecute,
        Readiness::Satisfied,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Readiness::Draft => "draft",
            Readiness::Undocumented => "undocumented",
            Readiness::ReadyToBuild => "ready-to-build",
            Readiness::Aligned => "aligned",
            Readiness::ReadyToExecute => "ready-to-execute",
            Readiness::Satisfied => "satisfied",
        }
    }

    /// States only the external overlay may assign.
    pub fn is_overlay_only(self) -> bool {
        matches!(
            self,
            Readiness::Undocumented | Readiness::ReadyToExecute | Readiness::Satisfied
        )
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Readiness {
    type Err = SpecdexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Readiness::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| SpecdexError::Parse(format!("unknown readiness value: {s:?}")))
    }
}

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// An addressable unit of the specification.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Row id once persisted; `None` straight out of the parser.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub number: Option<String>,
    pub alias: Option<String>,
    pub heading: String,
    pub content: String,
    pub parent: Option<String>,
    pub word_count: usize,
    pub level: u8,
    pub line_start: usize,
    pub readiness: Readiness,
    pub last_updated: Option<String>,
}

impl Section {
    /// Lookup key: alias when present, otherwise number.
    pub fn key(&self) -> Option<&str> {
        self.alias.as_deref().or(self.number.as_deref())
    }

    pub fn is_addressable(&self) -> bool {
        self.key().is_some()
    }

    /// First segment of the dotted number (`"2.3.1"` → `2`).
    pub fn top_level_number(&self) -> Option<u32> {
        self.number
            .as_deref()
            .and_then(|n| n.split('.').next())
            .and_then(|head| head.parse().ok())
    }
}

// ---------------------------------------------------------------------------
// Changelog
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    /// Timestamp exactly as written in the heading.
    pub timestamp: String,
    /// `namespace:command` that produced the entry.
    pub command: String,
    pub changes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Frontmatter
// ---------------------------------------------------------------------------

/// Document-level metadata, in source order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frontmatter(pub IndexMap<String, Value>);

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Specification version: `version`, then `spec_version`, then `spec.version`.
    pub fn version(&self) -> Option<String> {
        let direct = self
            .get("version")
            .or_else(|| self.get("spec_version"))
            .or_else(|| self.get("spec").and_then(|spec| spec.get("version")));
        match direct? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Assessment outputs
// ---------------------------------------------------------------------------

/// Which step of the cascade settled a section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    Overlay,
    Draft,
    Freshness,
    Stability,
    Scan,
}

impl Resolution {
    /// Freshness and stability count as skips in the scan progress.
    pub fn is_skip(self) -> bool {
        matches!(self, Resolution::Freshness | Resolution::Stability)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub total: usize,
    pub scanned: usize,
    pub skipped: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResult {
    pub alias: Option<String>,
    pub number: Option<String>,
    pub heading: String,
    pub readiness: Readiness,
    pub resolved_by: Resolution,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildStats {
    pub sections: usize,
    pub changelog_entries: usize,
    pub spec_version: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentReport {
    pub spec_path: Option<String>,
    pub spec_version: Option<String>,
    pub store_available: bool,
    pub summary: BTreeMap<String, usize>,
    pub sections: Vec<SectionResult>,
    pub scan_progress: ScanProgress,
}

/// Count results per readiness value; absent values are omitted.
pub fn summarize(results: &[SectionResult]) -> BTreeMap<String, usize> {
    let mut summary = BTreeMap::new();
    for result in results {
        *summary
            .entry(result.readiness.as_str().to_string())
            .or_insert(0) += 1;
    }
    summary
}
