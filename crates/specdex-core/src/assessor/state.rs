//! JSON state file shared with external tools.
//!
//! Read: `sectionReadiness`, an authoritative readiness overlay written by a
//! deeper analysis pass. Written: `scanProgress`. All other keys are
//! preserved on every write.

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::errors::{SpecdexError, SpecdexResult};
use crate::models::{Readiness, ScanProgress, Section};

const OVERLAY_KEY: &str = "sectionReadiness";
const PROGRESS_KEY: &str = "scanProgress";

/// Externally supplied readiness, keyed by alias or number.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlay(HashMap<String, Readiness>);

impl Overlay {
    pub fn new(entries: impl IntoIterator<Item = (String, Readiness)>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(key, readiness)| (normalize(&key), readiness))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Alias first, then number.
    pub fn lookup(&self, section: &Section) -> Option<Readiness> {
        let by_alias = section
            .alias
            .as_deref()
            .and_then(|alias| self.0.get(&normalize(alias)));
        let by_number = || {
            section
                .number
                .as_deref()
                .and_then(|number| self.0.get(&normalize(number)))
        };
        by_alias.or_else(by_number).copied()
    }
}

fn normalize(key: &str) -> String {
    key.trim().trim_start_matches('#').to_lowercase()
}

pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The overlay, or empty when the file or key is missing or unreadable.
    /// Entries with unknown readiness values are skipped.
    pub fn read_overlay(&self) -> Overlay {
        let document = match self.read_document() {
            Ok(Some(document)) => document,
            Ok(None) => return Overlay::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "state file unreadable");
                return Overlay::default();
            }
        };
        let Some(Value::Object(raw)) = document.get(OVERLAY_KEY) else {
            return Overlay::default();
        };

        let mut entries = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            match value.as_str().map(str::parse::<Readiness>) {
                Some(Ok(readiness)) => entries.push((key.clone(), readiness)),
                _ => tracing::warn!(key = %key, value = %value, "ignoring invalid overlay entry"),
            }
        }
        Overlay::new(entries)
    }

    /// Read-modify-write the `scanProgress` record. Failures are logged and
    /// reported as `false`, never raised.
    pub fn write_progress(&self, progress: &ScanProgress) -> bool {
        match self.try_write_progress(progress) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "could not record scan progress");
                false
            }
        }
    }

    fn try_write_progress(&self, progress: &ScanProgress) -> SpecdexResult<()> {
        let mut document = self.read_document()?.unwrap_or_default();
        document.insert(PROGRESS_KEY.to_string(), serde_json::to_value(progress)?);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let serialized = serde_json::to_string_pretty(&Value::Object(document))?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, serialized)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }

    /// Last written progress record, if any.
    pub fn read_progress(&self) -> Option<ScanProgress> {
        let document = self.read_document().ok()??;
        serde_json::from_value(document.get(PROGRESS_KEY)?.clone()).ok()
    }

    fn read_document(&self) -> SpecdexResult<Option<Map<String, Value>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Some(Map::new()));
        }
        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(Some(map)),
            _ => Err(SpecdexError::Parse(format!(
                "{} is not a JSON object",
                self.path.display()
            ))),
        }
    }
}
