//! Readiness assessment: rebuild the index from the specification, then run
//! every addressable section through the strategy cascade.

pub mod locate;
pub mod neighborhood;
pub mod state;
pub mod strategies;
pub mod vcs;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SpecdexConfig;
use crate::errors::SpecdexResult;
use crate::models::{
    summarize, AssessmentReport, Resolution, ScanProgress, Section, SectionResult,
};
use crate::parser::{parse_changelog, parse_spec};
use crate::store::IndexStore;

use locate::{locate_spec, read_source};
use neighborhood::{AliasMatcher, CodeFinder, SubstringMatcher};
use state::StateFile;
use strategies::{AssessContext, Cascade, SectionState};
use vcs::{CommitClock, GitClock};

pub struct Assessor {
    root: PathBuf,
    config: SpecdexConfig,
    clock: Box<dyn CommitClock>,
    matcher: Arc<dyn AliasMatcher>,
    cascade: Cascade,
}

impl Assessor {
    /// Assessor for `root` with configuration loaded from the project.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let config = SpecdexConfig::load(&root);
        Self::with_config(root, config)
    }

    pub fn with_config(root: impl Into<PathBuf>, config: SpecdexConfig) -> Self {
        let clock = GitClock::from_millis(config.git_timeout_ms);
        Self {
            root: root.into(),
            config,
            clock: Box::new(clock),
            matcher: Arc::new(SubstringMatcher),
            cascade: Cascade::standard(),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn CommitClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn AliasMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_cascade(mut self, cascade: Cascade) -> Self {
        self.cascade = cascade;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SpecdexConfig {
        &self.config
    }

    /// Store at the configured database path. Not yet opened.
    pub fn store(&self) -> IndexStore {
        IndexStore::new(self.config.resolve(&self.root, &self.config.db_path))
    }

    pub fn state_file(&self) -> StateFile {
        StateFile::new(self.config.resolve(&self.root, &self.config.state_path))
    }

    /// Full rebuild-and-assess cycle for the project.
    ///
    /// A project without a specification yields an empty report. The only
    /// error surfaced is a failed rebuild transaction (or an unreadable
    /// specification file).
    pub fn run(&self) -> SpecdexResult<AssessmentReport> {
        let Some(source) = locate_spec(&self.root, &self.config) else {
            tracing::warn!(root = %self.root.display(), "no specification found");
            return Ok(AssessmentReport::default());
        };
        let spec_text = read_source(&source.spec_path)?;
        let changelog_text = source.changelog_path.as_deref().and_then(|path| {
            read_source(path)
                .map_err(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "changelog unreadable");
                })
                .ok()
        });

        let mut store = self.store();
        store.open();
        self.assess_text(
            &mut store,
            &self.state_file(),
            &spec_text,
            changelog_text.as_deref(),
            Some(source.spec_path.as_path()),
        )
    }

    /// Assess already-loaded texts against `store` and `state`.
    pub fn assess_text(
        &self,
        store: &mut IndexStore,
        state: &StateFile,
        spec_text: &str,
        changelog_text: Option<&str>,
        spec_path: Option<&Path>,
    ) -> SpecdexResult<AssessmentReport> {
        let parsed = parse_spec(spec_text);
        let changelog = changelog_text.map(parse_changelog).unwrap_or_default();
        store.rebuild_parsed(&parsed, &changelog, spec_path)?;

        let overlay = state.read_overlay();
        let finder = CodeFinder::new(&self.root, &self.config).with_matcher(self.matcher.clone());
        let ctx = AssessContext {
            root: &self.root,
            config: &self.config,
            overlay: &overlay,
            changelog: &changelog,
            clock: &*self.clock,
            finder: &finder,
        };

        let targets = assessable_sections(&parsed.sections);
        let mut progress = ScanProgress {
            total: targets.len(),
            ..ScanProgress::default()
        };
        state.write_progress(&progress);

        let mut results = Vec::with_capacity(targets.len());
        for section in targets {
            let Some(key) = section.key() else {
                continue;
            };
            let section_state = SectionState::new(
                store.get(key).map(|stored| stored.readiness),
                store.get_content_hash(key),
                IndexStore::content_hash(&section.content),
            );
            let verdict = self.cascade.resolve(section, &ctx, &section_state);
            tracing::debug!(
                key,
                readiness = %verdict.readiness,
                resolved_by = ?verdict.resolved_by,
                "section assessed"
            );

            store.set_readiness(key, verdict.readiness);
            store.set_content_hash(key, &section_state.current_hash);

            if verdict.resolved_by.is_skip() {
                progress.skipped += 1;
            } else if verdict.resolved_by == Resolution::Scan {
                progress.scanned += 1;
            }
            state.write_progress(&progress);

            results.push(SectionResult {
                alias: section.alias.clone(),
                number: section.number.clone(),
                heading: section.heading.clone(),
                readiness: verdict.readiness,
                resolved_by: verdict.resolved_by,
            });
        }
        state.write_progress(&progress);

        tracing::info!(
            total = progress.total,
            scanned = progress.scanned,
            skipped = progress.skipped,
            "assessment complete"
        );

        Ok(AssessmentReport {
            spec_path: spec_path.map(|path| path.display().to_string()),
            spec_version: parsed.frontmatter.version(),
            store_available: store.is_available(),
            summary: summarize(&results),
            sections: results,
            scan_progress: progress,
        })
    }
}

/// Addressable sections that do not contain other sections.
pub fn assessable_sections(sections: &[Section]) -> Vec<&Section> {
    let containers: HashSet<&str> = sections
        .iter()
        .filter_map(|section| section.parent.as_deref())
        .collect();
    sections
        .iter()
        .filter(|section| section.is_addressable())
        .filter(|section| {
            !section
                .number
                .as_deref()
                .is_some_and(|number| containers.contains(number))
        })
        .collect()
}

/// Run a full assessment of the project at `root` with its own configuration.
pub fn assess_project(root: &Path) -> SpecdexResult<AssessmentReport> {
    Assessor::new(root).run()
}
