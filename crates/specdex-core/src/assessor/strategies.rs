//! The readiness cascade. Each strategy either concludes or passes; the
//! first conclusion wins.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use crate::assessor::neighborhood::CodeFinder;
use crate::assessor::state::Overlay;
use crate::assessor::vcs::CommitClock;
use crate::config::SpecdexConfig;
use crate::models::{ChangelogEntry, Readiness, Resolution, Section};
use crate::parser::changelog::latest_reference;

/// Everything shared by all sections of one assessment run.
pub struct AssessContext<'a> {
    pub root: &'a Path,
    pub config: &'a SpecdexConfig,
    pub overlay: &'a Overlay,
    pub changelog: &'a [ChangelogEntry],
    pub clock: &'a dyn CommitClock,
    pub finder: &'a CodeFinder,
}

impl AssessContext<'_> {
    /// Meta sections are not expected to have code: numbered outside the
    /// behavior range, or carrying neither number nor alias.
    pub fn is_meta(&self, section: &Section) -> bool {
        match section.top_level_number() {
            Some(top) => !self.config.behavior_sections.contains(top),
            None => section.alias.is_none(),
        }
    }
}

/// Per-section inputs carried over from the previous run.
pub struct SectionState {
    pub stored_readiness: Option<Readiness>,
    pub stored_hash: Option<String>,
    pub current_hash: String,
    neighborhood: OnceCell<Vec<PathBuf>>,
}

impl SectionState {
    pub fn new(
        stored_readiness: Option<Readiness>,
        stored_hash: Option<String>,
        current_hash: String,
    ) -> Self {
        Self {
            stored_readiness,
            stored_hash,
            current_hash,
            neighborhood: OnceCell::new(),
        }
    }

    /// Code neighborhood of the section's alias, computed at most once.
    pub fn neighborhood(&self, section: &Section, finder: &CodeFinder) -> &[PathBuf] {
        self.neighborhood.get_or_init(|| match section.alias.as_deref() {
            Some(alias) => finder.neighborhood(alias),
            None => Vec::new(),
        })
    }
}

pub trait ReadinessStrategy {
    fn resolution(&self) -> Resolution;

    fn evaluate(
        &self,
        section: &Section,
        ctx: &AssessContext<'_>,
        state: &SectionState,
    ) -> Option<Readiness>;
}

/// Externally supplied readiness, taken verbatim.
pub struct OverlayStrategy;

impl ReadinessStrategy for OverlayStrategy {
    fn resolution(&self) -> Resolution {
        Resolution::Overlay
    }

    fn evaluate(
        &self,
        section: &Section,
        ctx: &AssessContext<'_>,
        _: &SectionState,
    ) -> Option<Readiness> {
        ctx.overlay.lookup(section)
    }
}

/// Stub sections are drafts whatever exists on disk.
pub struct DraftStrategy;

impl ReadinessStrategy for DraftStrategy {
    fn resolution(&self) -> Resolution {
        Resolution::Draft
    }

    fn evaluate(
        &self,
        section: &Section,
        ctx: &AssessContext<'_>,
        _: &SectionState,
    ) -> Option<Readiness> {
        (section.word_count < ctx.config.draft_min_words).then_some(Readiness::Draft)
    }
}

/// Spec text newer than every related commit means there is nothing to
/// align yet.
pub struct FreshnessStrategy;

impl ReadinessStrategy for FreshnessStrategy {
    fn resolution(&self) -> Resolution {
        Resolution::Freshness
    }

    fn evaluate(
        &self,
        section: &Section,
        ctx: &AssessContext<'_>,
        state: &SectionState,
    ) -> Option<Readiness> {
        let alias = section.alias.as_deref()?;
        let spec_time = latest_reference(ctx.changelog, alias)?;
        let paths = state.neighborhood(section, ctx.finder);
        if paths.is_empty() {
            return None;
        }
        let code_time = ctx.clock.last_commit(ctx.root, paths)?;
        tracing::debug!(alias, %spec_time, %code_time, "freshness timestamps");
        (spec_time > code_time).then_some(Readiness::ReadyToBuild)
    }
}

/// Unchanged content keeps its previous non-draft verdict.
pub struct StabilityStrategy;

impl ReadinessStrategy for StabilityStrategy {
    fn resolution(&self) -> Resolution {
        Resolution::Stability
    }

    fn evaluate(
        &self,
        _: &Section,
        _: &AssessContext<'_>,
        state: &SectionState,
    ) -> Option<Readiness> {
        let previous = state.stored_hash.as_deref()?;
        if previous != state.current_hash {
            return None;
        }
        state
            .stored_readiness
            .filter(|readiness| *readiness != Readiness::Draft)
    }
}

/// Structural scan for matching code. Always concludes.
pub struct ScanStrategy;

impl ReadinessStrategy for ScanStrategy {
    fn resolution(&self) -> Resolution {
        Resolution::Scan
    }

    fn evaluate(
        &self,
        section: &Section,
        ctx: &AssessContext<'_>,
        state: &SectionState,
    ) -> Option<Readiness> {
        if ctx.is_meta(section) {
            return Some(if section.word_count > 0 {
                Readiness::Aligned
            } else {
                Readiness::Draft
            });
        }
        if section.alias.is_none() || !ctx.finder.has_source_roots() {
            return Some(Readiness::ReadyToBuild);
        }
        if state.neighborhood(section, ctx.finder).is_empty() {
            Some(Readiness::ReadyToBuild)
        } else {
            Some(Readiness::Aligned)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub readiness: Readiness,
    pub resolved_by: Resolution,
}

/// Ordered strategies; the first to conclude wins.
pub struct Cascade {
    strategies: Vec<Box<dyn ReadinessStrategy>>,
}

impl Cascade {
    pub fn new(strategies: Vec<Box<dyn ReadinessStrategy>>) -> Self {
        Self { strategies }
    }

    /// Overlay, draft, freshness, stability, scan.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(OverlayStrategy),
            Box::new(DraftStrategy),
            Box::new(FreshnessStrategy),
            Box::new(StabilityStrategy),
            Box::new(ScanStrategy),
        ])
    }

    pub fn resolve(
        &self,
        section: &Section,
        ctx: &AssessContext<'_>,
        state: &SectionState,
    ) -> Verdict {
        self.strategies
            .iter()
            .find_map(|strategy| {
                strategy
                    .evaluate(section, ctx, state)
                    .map(|readiness| Verdict {
                        readiness,
                        resolved_by: strategy.resolution(),
                    })
            })
            .unwrap_or(Verdict {
                readiness: Readiness::ReadyToBuild,
                resolved_by: Resolution::Scan,
            })
    }
}

impl Default for Cascade {
    fn default() -> Self {
        Self::standard()
    }
}
