//! Line scanner that turns specification text into sections.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Readiness, Section};
use crate::parser::markup::count_words;

/// Depth-1 headings close a section but never open one; depth 5+ is body text.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,4})(?:\s+(.*?))?\s*$").unwrap());

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)*)\.?(?:\s+|$)").unwrap());

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\{#([^}\s]+)\}\s*$").unwrap());

static HASH_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*`#([^`\s]+)`\s*$").unwrap());

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Fields pulled from one heading line.
#[derive(Debug, PartialEq)]
pub(crate) struct HeadingParts {
    pub number: Option<String>,
    pub alias: Option<String>,
    pub heading: String,
}

/// Split heading text (depth marker already removed) into number, alias and
/// display title.
pub(crate) fn parse_heading_text(text: &str) -> HeadingParts {
    let mut rest = text.trim().to_string();

    let mut alias = None;
    for re in [&*ANCHOR_RE, &*HASH_REF_RE] {
        if let Some(caps) = re.captures(&rest) {
            alias = Some(caps[1].to_string());
            let start = caps.get(0).map_or(rest.len(), |m| m.start());
            rest.truncate(start);
            break;
        }
    }

    let mut number = None;
    if let Some(caps) = NUMBER_RE.captures(&rest) {
        number = Some(caps[1].to_string());
        let end = caps.get(0).map_or(0, |m| m.end());
        rest = rest[end..].to_string();
    }

    let heading = LINK_RE.replace_all(&rest, "$1").trim().to_string();
    HeadingParts {
        number,
        alias,
        heading,
    }
}

/// Parent path of a dotted number; single-segment numbers have none.
pub fn parent_number(number: &str) -> Option<String> {
    number.rsplit_once('.').map(|(parent, _)| parent.to_string())
}

struct OpenSection<'a> {
    section: Section,
    body: Vec<&'a str>,
}

impl OpenSection<'_> {
    fn close(self) -> Section {
        let mut section = self.section;
        section.content = self.body.join("\n").trim().to_string();
        section.word_count = count_words(&section.content);
        section
    }
}

/// Extract every level 2–4 heading outside fenced code as a section, in
/// document order.
pub fn extract_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<OpenSection<'_>> = None;
    let mut in_fence = false;

    for (idx, line) in text.lines().enumerate() {
        if is_fence(line) {
            in_fence = !in_fence;
        } else if !in_fence {
            if let Some(caps) = HEADING_RE.captures(line) {
                if let Some(open) = current.take() {
                    sections.push(open.close());
                }
                let level = caps[1].len();
                if level == 1 {
                    continue;
                }
                let parts = parse_heading_text(caps.get(2).map_or("", |m| m.as_str()));
                current = Some(OpenSection {
                    section: Section {
                        parent: parts.number.as_deref().and_then(parent_number),
                        number: parts.number,
                        alias: parts.alias,
                        heading: parts.heading,
                        level: level as u8,
                        line_start: idx + 1,
                        readiness: Readiness::Draft,
                        ..Section::default()
                    },
                    body: Vec::new(),
                });
                continue;
            }
        }

        if let Some(open) = current.as_mut() {
            open.body.push(line);
        }
    }

    if let Some(open) = current.take() {
        sections.push(open.close());
    }

    enforce_unique_keys(&mut sections);
    sections
}

/// Keep the first holder of each alias and number; later duplicates lose it.
fn enforce_unique_keys(sections: &mut [Section]) {
    let mut aliases: HashSet<String> = HashSet::new();
    let mut numbers: HashSet<String> = HashSet::new();
    for section in sections.iter_mut() {
        if let Some(alias) = section.alias.as_deref() {
            if !aliases.insert(alias.to_lowercase()) {
                tracing::warn!(
                    alias,
                    line = section.line_start,
                    "duplicate section alias dropped"
                );
                section.alias = None;
            }
        }
        if let Some(number) = section.number.as_deref() {
            if !numbers.insert(number.to_string()) {
                tracing::warn!(
                    number,
                    line = section.line_start,
                    "duplicate section number dropped"
                );
                section.number = None;
                section.parent = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_round_trip() {
        let sections = extract_sections("### 2.2 Core Flow {#core-flow}\nBody text here.\n");
        assert_eq!(sections.len(), 1);
        let s = &sections[0];
        assert_eq!(s.number.as_deref(), Some("2.2"));
        assert_eq!(s.alias.as_deref(), Some("core-flow"));
        assert_eq!(s.heading, "Core Flow");
        assert_eq!(s.parent.as_deref(), Some("2"));
        assert_eq!(s.level, 3);
        assert_eq!(s.line_start, 1);
        assert_eq!(s.readiness, Readiness::Draft);
    }

    #[test]
    fn backtick_hash_reference_alias() {
        let parts = parse_heading_text("4.1 Document Parser `#doc-parser`");
        assert_eq!(parts.number.as_deref(), Some("4.1"));
        assert_eq!(parts.alias.as_deref(), Some("doc-parser"));
        assert_eq!(parts.heading, "Document Parser");
    }

    #[test]
    fn trailing_dot_number_and_link_markup() {
        let parts = parse_heading_text("1. [Vision](#vision) and scope");
        assert_eq!(parts.number.as_deref(), Some("1"));
        assert_eq!(parts.alias, None);
        assert_eq!(parts.heading, "Vision and scope");
    }

    #[test]
    fn unnumbered_heading_has_no_parent() {
        let sections = extract_sections("## Glossary\nTerms.\n");
        assert_eq!(sections[0].number, None);
        assert_eq!(sections[0].parent, None);
        assert!(!sections[0].is_addressable());
    }

    #[test]
    fn code_fence_immunity() {
        let text = "## 1. Intro\nSee below.\n```markdown\n## 9. Not A Section {#fake}\n```\nAfter fence.\n";
        let sections = extract_sections(text);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].content.contains("## 9. Not A Section"));
        assert!(sections[0].content.ends_with("After fence."));
    }

    #[test]
    fn title_and_deep_headings() {
        let text = "# Spec Title\nPreamble.\n## 1. Vision\nText.\n##### minor\nStill vision.\n# Appendix\nOrphan text.\n";
        let sections = extract_sections(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "Vision");
        assert_eq!(sections[0].line_start, 3);
        assert!(sections[0].content.contains("##### minor"));
        assert!(!sections[0].content.contains("Orphan"));
    }

    #[test]
    fn content_is_trimmed_and_counted() {
        let text = "## 2. Core\n\n  Two words.  \n\n## 3. Next\n";
        let sections = extract_sections(text);
        assert_eq!(sections[0].content, "Two words.");
        assert_eq!(sections[0].word_count, 2);
        assert_eq!(sections[1].content, "");
        assert_eq!(sections[1].word_count, 0);
    }

    #[test]
    fn duplicate_alias_keeps_first() {
        let text = "## 1. A {#dup}\nx\n## 2. B {#DUP}\ny\n## 2. C\nz\n";
        let sections = extract_sections(text);
        assert_eq!(sections[0].alias.as_deref(), Some("dup"));
        assert_eq!(sections[1].alias, None);
        assert_eq!(sections[1].number.as_deref(), Some("2"));
        assert_eq!(sections[2].number, None);
    }

    #[test]
    fn empty_text_has_no_sections() {
        assert!(extract_sections("").is_empty());
        assert!(extract_sections("just prose\nno headings").is_empty());
    }
}
