//! Project configuration: defaults, then `.specdex/config.json`, then
//! `SPECDEX_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{SpecdexError, SpecdexResult};

pub const CONFIG_FILE: &str = ".specdex/config.json";

const DEFAULT_SOURCE_ROOTS: &[&str] = &[
    "src", "lib", "app", "crates", "packages", "cmd", "internal", "pkg", "scripts", "hooks", "bin",
];

/// Inclusive range of top-level section numbers that describe behavior.
/// Sections outside it are meta sections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorRange {
    pub min: u32,
    pub max: u32,
}

impl BehaviorRange {
    pub fn contains(&self, top_level: u32) -> bool {
        (self.min..=self.max).contains(&top_level)
    }
}

impl Default for BehaviorRange {
    fn default() -> Self {
        Self { min: 2, max: 9 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecdexConfig {
    /// Conventional specification location, relative to the project root.
    pub spec_path: PathBuf,
    /// Fallback pattern matched against file names in the project root.
    pub legacy_spec_glob: String,
    /// Changelog file name, looked up next to the specification.
    pub changelog_name: String,
    pub db_path: PathBuf,
    pub state_path: PathBuf,
    /// Sections with fewer words are drafts.
    pub draft_min_words: usize,
    pub behavior_sections: BehaviorRange,
    pub source_roots: Vec<String>,
    /// Directory levels walked below each source root when the direct
    /// listing has no match.
    pub scan_depth: usize,
    pub git_timeout_ms: u64,
}

impl Default for SpecdexConfig {
    fn default() -> Self {
        Self {
            spec_path: PathBuf::from("spec/SPEC.md"),
            legacy_spec_glob: "SPEC*.md".to_string(),
            changelog_name: "CHANGELOG.md".to_string(),
            db_path: PathBuf::from(".specdex/index.db"),
            state_path: PathBuf::from(".specdex/state.json"),
            draft_min_words: 20,
            behavior_sections: BehaviorRange::default(),
            source_roots: DEFAULT_SOURCE_ROOTS.iter().map(|s| s.to_string()).collect(),
            scan_depth: 3,
            git_timeout_ms: 3_000,
        }
    }
}

impl SpecdexConfig {
    /// Load configuration for the project at `root`. Never fails: a broken
    /// config file is logged and ignored.
    pub fn load(root: &Path) -> Self {
        Self::load_with_env(root, |key| std::env::var(key).ok())
    }

    pub fn load_with_env(root: &Path, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = match Self::from_file(&root.join(CONFIG_FILE)) {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable {CONFIG_FILE}");
                Self::default()
            }
        };
        config.apply_env(env);
        config
    }

    fn from_file(path: &Path) -> SpecdexResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)
            .map_err(|e| SpecdexError::Config(format!("{}: {e}", path.display())))?;
        Ok(Some(config))
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let read = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(path) = read("SPECDEX_SPEC_PATH") {
            self.spec_path = PathBuf::from(path);
        }
        if let Some(path) = read("SPECDEX_DB_PATH") {
            self.db_path = PathBuf::from(path);
        }
        if let Some(path) = read("SPECDEX_STATE_PATH") {
            self.state_path = PathBuf::from(path);
        }
        if let Some(raw) = read("SPECDEX_DRAFT_MIN_WORDS") {
            match raw.parse() {
                Ok(words) => self.draft_min_words = words,
                Err(_) => tracing::warn!(value = %raw, "SPECDEX_DRAFT_MIN_WORDS is not a number"),
            }
        }
        if let Some(raw) = read("SPECDEX_GIT_TIMEOUT_MS") {
            match raw.parse() {
                Ok(ms) => self.git_timeout_ms = ms,
                Err(_) => tracing::warn!(value = %raw, "SPECDEX_GIT_TIMEOUT_MS is not a number"),
            }
        }
        if let Some(raw) = read("SPECDEX_SOURCE_ROOTS") {
            let roots: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|root| !root.is_empty())
                .map(str::to_string)
                .collect();
            if !roots.is_empty() {
                self.source_roots = roots;
            }
        }
    }

    /// Resolve a configured path against the project root.
    pub fn resolve(&self, root: &Path, path: &Path) -> PathBuf {
        let expanded = expand_tilde(&path.to_string_lossy());
        if expanded.is_absolute() {
            expanded
        } else {
            root.join(expanded)
        }
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            let mut expanded = PathBuf::from(home);
            if path.len() > 2 {
                expanded.push(&path[2..]);
            }
            return expanded;
        }
    }
    PathBuf::from(path)
}
