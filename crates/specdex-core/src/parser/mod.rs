//! Document parser: specification text into frontmatter and sections,
//! changelog text into entries. Pure functions; malformed input yields
//! empty results.

pub mod changelog;
pub mod frontmatter;
pub mod markup;
pub mod sections;

use crate::models::{Frontmatter, Section};

pub use changelog::parse_changelog;

/// Result of parsing one specification document.
#[derive(Clone, Debug, Default)]
pub struct ParsedSpec {
    pub frontmatter: Frontmatter,
    pub sections: Vec<Section>,
}

pub fn parse_spec(text: &str) -> ParsedSpec {
    ParsedSpec {
        frontmatter: frontmatter::extract_frontmatter(text),
        sections: sections::extract_sections(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn frontmatter_block_produces_no_sections() {
        let text = "```yaml\n---\nversion: 1.0\n---\n```\n# Spec\n## 1. Vision {#vision}\nWhy.\n";
        let parsed = parse_spec(text);
        assert_eq!(parsed.frontmatter.version().as_deref(), Some("1.0"));
        assert_eq!(parsed.sections.len(), 1);
        assert_eq!(parsed.sections[0].alias.as_deref(), Some("vision"));
    }

    proptest! {
        #[test]
        fn parser_never_emits_duplicate_aliases(
            headings in prop::collection::vec(
                (1u8..4, 1u32..6, "[a-c]{1,2}"),
                0..24,
            )
        ) {
            let mut text = String::from("# Title\n");
            for (depth, number, alias) in &headings {
                let marks = "#".repeat(usize::from(*depth) + 1);
                text.push_str(&format!("{marks} {number} Heading {{#{alias}}}\nbody words\n"));
            }
            let parsed = parse_spec(&text);
            prop_assert_eq!(parsed.sections.len(), headings.len());

            let mut seen = HashSet::new();
            for section in &parsed.sections {
                if let Some(alias) = &section.alias {
                    prop_assert!(seen.insert(alias.to_lowercase()), "duplicate alias {}", alias);
                }
            }
        }
    }
}
