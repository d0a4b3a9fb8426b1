//! Alias-to-path matching under the conventional source roots.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::config::SpecdexConfig;

/// Directory names never descended into during the deep walk.
const IGNORED_DIRS: &[&str] = &[".git", ".specdex", "node_modules", "target"];

fn is_ignored(name: &OsStr) -> bool {
    IGNORED_DIRS.iter().any(|ignored| name == *ignored)
}

/// Decides whether a filesystem entry name belongs to a section alias.
pub trait AliasMatcher {
    fn matches(&self, entry_name: &str, alias: &str) -> bool;
}

/// Case-insensitive containment after normalizing `-` and `_`.
///
/// Approximate by nature: `log` matches `catalog.rs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubstringMatcher;

impl AliasMatcher for SubstringMatcher {
    fn matches(&self, entry_name: &str, alias: &str) -> bool {
        let alias = alias.trim().trim_start_matches('#').to_lowercase();
        if alias.is_empty() {
            return false;
        }
        let name = entry_name.to_lowercase();
        if name.contains(&alias) || name.contains(&alias.replace('-', "_")) {
            return true;
        }
        let collapsed_name: String = name.chars().filter(|c| *c != '-' && *c != '_').collect();
        let collapsed_alias = alias.replace('-', "");
        !collapsed_alias.is_empty() && collapsed_name.contains(&collapsed_alias)
    }
}

/// Locates the code neighborhood of an alias.
pub struct CodeFinder {
    roots: Vec<PathBuf>,
    depth: usize,
    matcher: Arc<dyn AliasMatcher>,
}

impl CodeFinder {
    pub fn new(root: &Path, config: &SpecdexConfig) -> Self {
        let roots = config
            .source_roots
            .iter()
            .map(|name| root.join(name))
            .filter(|path| path.is_dir())
            .collect();
        Self {
            roots,
            depth: config.scan_depth.max(1),
            matcher: Arc::new(SubstringMatcher),
        }
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn AliasMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Whether any conventional source root exists at all.
    pub fn has_source_roots(&self) -> bool {
        !self.roots.is_empty()
    }

    /// Matching paths, sorted. Direct children of each source root are
    /// checked first; the deeper walk runs only when that finds nothing.
    pub fn neighborhood(&self, alias: &str) -> Vec<PathBuf> {
        let mut found = self.direct_matches(alias);
        if found.is_empty() {
            found = self.deep_matches(alias);
        }
        found.sort();
        found.dedup();
        found
    }

    fn direct_matches(&self, alias: &str) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for root in &self.roots {
            let Ok(entries) = std::fs::read_dir(root) else {
                continue;
            };
            for entry in entries.flatten() {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                if is_dir && is_ignored(&entry.file_name()) {
                    continue;
                }
                if self
                    .matcher
                    .matches(&entry.file_name().to_string_lossy(), alias)
                {
                    found.push(entry.path());
                }
            }
        }
        found
    }

    fn deep_matches(&self, alias: &str) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for root in &self.roots {
            let walker = WalkDir::new(root)
                .min_depth(1)
                .max_depth(self.depth)
                .into_iter()
                .filter_entry(|entry| {
                    !(entry.file_type().is_dir() && is_ignored(entry.file_name()))
                });
            for entry in walker.filter_map(Result::ok) {
                if self
                    .matcher
                    .matches(&entry.file_name().to_string_lossy(), alias)
                {
                    found.push(entry.into_path());
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn substring_matcher_normalizes_separators() {
        let m = SubstringMatcher;
        assert!(m.matches("core-flow", "core-flow"));
        assert!(m.matches("core_flow.rs", "core-flow"));
        assert!(m.matches("CoreFlow.ts", "core-flow"));
        assert!(m.matches("my-core-flow-test.py", "#core-flow"));
        assert!(!m.matches("core.rs", "core-flow"));
        assert!(!m.matches("anything", ""));
    }

    #[test]
    fn direct_entries_are_found_first() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/widget.rs");
        touch(dir.path(), "src/nested/deep/widget_extra.rs");

        let finder = CodeFinder::new(dir.path(), &SpecdexConfig::default());
        assert!(finder.has_source_roots());
        assert_eq!(
            finder.neighborhood("widget"),
            vec![dir.path().join("src/widget.rs")]
        );
    }

    #[test]
    fn deep_walk_respects_depth_and_ignored_dirs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/a/b/gadget.rs");
        touch(dir.path(), "src/a/b/c/d/gizmo.rs");
        touch(dir.path(), "src/node_modules/gadget-lib/index.js");

        let finder = CodeFinder::new(dir.path(), &SpecdexConfig::default());
        assert_eq!(
            finder.neighborhood("gadget"),
            vec![dir.path().join("src/a/b/gadget.rs")]
        );
        assert!(finder.neighborhood("gizmo").is_empty());
    }

    #[test]
    fn ignored_dirs_are_skipped_in_both_passes() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/node_modules/left-pad/index.js");
        touch(dir.path(), "src/target/debug/build.log");

        let finder = CodeFinder::new(dir.path(), &SpecdexConfig::default());
        assert!(finder.neighborhood("node").is_empty());
        assert!(finder.neighborhood("target").is_empty());

        touch(dir.path(), "src/node_graph.rs");
        assert_eq!(
            finder.neighborhood("node"),
            vec![dir.path().join("src/node_graph.rs")]
        );
    }

    #[test]
    fn no_source_roots() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "docs/widget.md");
        let finder = CodeFinder::new(dir.path(), &SpecdexConfig::default());
        assert!(!finder.has_source_roots());
        assert!(finder.neighborhood("widget").is_empty());
    }

    #[test]
    fn custom_matcher_is_used() {
        struct Exact;
        impl AliasMatcher for Exact {
            fn matches(&self, entry_name: &str, alias: &str) -> bool {
                entry_name == alias
            }
        }

        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "lib/widget");
        touch(dir.path(), "lib/widget.rs");
        let finder =
            CodeFinder::new(dir.path(), &SpecdexConfig::default()).with_matcher(Arc::new(Exact));
        assert_eq!(finder.neighborhood("widget"), vec![dir.path().join("lib/widget")]);
    }
}
