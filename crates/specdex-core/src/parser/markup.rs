//! Markdown stripping used for word counts.

use std::sync::LazyLock;

use regex::Regex;

static FENCED_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?(?:```|\z)").unwrap());

static INLINE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`\n]*`").unwrap());

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").unwrap());

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:https?|ftp)://\S+|www\.\S+").unwrap());

static MARKDOWN_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#*_>|~\[\](){}]").unwrap());

/// Strip code, links, URLs and markdown punctuation, leaving prose.
pub fn strip_markup(text: &str) -> String {
    let without_fences = FENCED_BLOCK_RE.replace_all(text, " ");
    let without_inline = INLINE_CODE_RE.replace_all(&without_fences, " ");
    let without_links = LINK_RE.replace_all(&without_inline, "$1");
    let without_urls = URL_RE.replace_all(&without_links, " ");
    MARKDOWN_PUNCT_RE
        .replace_all(&without_urls, " ")
        .into_owned()
}

/// Count prose words. Tokens without a single alphanumeric character
/// (`---`, `-`, `|`) are not words.
pub fn count_words(text: &str) -> usize {
    strip_markup(text)
        .split_whitespace()
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_plain_prose() {
        assert_eq!(count_words("The quick brown fox jumps."), 5);
    }

    #[test]
    fn code_fence_and_punctuation_only_is_zero() {
        let text = "```rust\nfn main() { println!(\"hi\"); }\n```\n\n---\n> | - * |";
        assert_eq!(count_words(text), 0);
    }

    #[test]
    fn inline_code_is_ignored() {
        assert_eq!(count_words("Call `open()` then `close()` twice"), 3);
    }

    #[test]
    fn links_keep_their_text_and_urls_vanish() {
        assert_eq!(
            count_words("See [the docs](https://example.com/docs) or https://example.org now"),
            5
        );
    }

    #[test]
    fn unterminated_fence_swallows_the_rest() {
        assert_eq!(count_words("one two\n```\nthree four"), 2);
    }

    #[test]
    fn emphasis_markers_do_not_split_words() {
        assert_eq!(count_words("**bold** and _italic_ text"), 4);
    }
}
