//! Narrow frontmatter reader.
//!
//! Recognises either a bare `---` block at the top of the document or a
//! ```` ```yaml ```` fence wrapping a `---` block. Supports flat `key: value`
//! pairs, one level of nested `key:` → indented `subkey: value`, quoted
//! strings, and single-level inline lists. Anything else stays a literal
//! string. Not a YAML parser.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};

use crate::models::Frontmatter;

static YAML_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```\s*(?:ya?ml)\s*$").unwrap());

static KEY_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_][A-Za-z0-9_.-]*)\s*:(.*)$").unwrap());

/// Extract the frontmatter block; returns an empty map when none is present.
pub fn extract_frontmatter(text: &str) -> Frontmatter {
    match frontmatter_body(text) {
        Some(body) => parse_block(&body),
        None => Frontmatter::default(),
    }
}

/// Locate the raw lines between the `---` delimiters.
fn frontmatter_body(text: &str) -> Option<Vec<&str>> {
    let mut lines = text
        .lines()
        .map(|line| line.trim_start_matches('\u{feff}'))
        .skip_while(|line| line.trim().is_empty());

    let first = lines.next()?.trim_end();
    if YAML_FENCE_RE.is_match(first.trim_start()) {
        if lines.next()?.trim_end() != "---" {
            return None;
        }
    } else if first != "---" {
        return None;
    }

    let mut body = Vec::new();
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return Some(body);
        }
        if trimmed.starts_with("```") {
            // Fence closed before the block did.
            return None;
        }
        body.push(line);
    }
    None
}

/// A `key:` line with no inline value, collecting its indented lines.
struct OpenParent {
    key: String,
    children: Map<String, Value>,
    raw: Vec<String>,
    literal: bool,
}

impl OpenParent {
    fn new(key: String) -> Self {
        Self {
            key,
            children: Map::new(),
            raw: Vec::new(),
            literal: false,
        }
    }

    fn push(&mut self, trimmed: &str) {
        self.raw.push(trimmed.to_string());
        match KEY_VALUE_RE.captures(trimmed) {
            Some(caps) if !self.literal => {
                self.children
                    .insert(caps[1].to_string(), parse_scalar(caps[2].trim()));
            }
            _ => self.literal = true,
        }
    }

    /// Unsupported shapes such as block lists keep their raw lines.
    fn close(self) -> (String, Value) {
        let value = if self.literal {
            Value::String(self.raw.join("\n"))
        } else if self.children.is_empty() {
            Value::String(String::new())
        } else {
            Value::Object(self.children)
        };
        (self.key, value)
    }
}

fn parse_block(lines: &[&str]) -> Frontmatter {
    let mut map: IndexMap<String, Value> = IndexMap::new();
    let mut open_parent: Option<OpenParent> = None;

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indented = line.starts_with(' ') || line.starts_with('\t');

        if indented {
            match open_parent.as_mut() {
                Some(parent) => parent.push(trimmed),
                None => tracing::debug!(line = trimmed, "ignoring stray indented frontmatter line"),
            }
            continue;
        }

        if let Some(parent) = open_parent.take() {
            let (key, value) = parent.close();
            map.insert(key, value);
        }

        let Some(caps) = KEY_VALUE_RE.captures(trimmed) else {
            continue;
        };
        let key = caps[1].to_string();
        let raw = caps[2].trim();
        if raw.is_empty() {
            open_parent = Some(OpenParent::new(key));
        } else {
            map.insert(key, parse_scalar(raw));
        }
    }

    if let Some(parent) = open_parent.take() {
        let (key, value) = parent.close();
        map.insert(key, value);
    }
    Frontmatter(map)
}

fn parse_scalar(raw: &str) -> Value {
    if let Some(inner) = unquote(raw) {
        return Value::String(inner.to_string());
    }
    if let Some(list) = parse_inline_list(raw) {
        return list;
    }
    Value::String(raw.to_string())
}

fn unquote(raw: &str) -> Option<&str> {
    if raw.len() < 2 {
        return None;
    }
    let quoted = (raw.starts_with('"') && raw.ends_with('"'))
        || (raw.starts_with('\'') && raw.ends_with('\''));
    quoted.then(|| &raw[1..raw.len() - 1])
}

fn parse_inline_list(raw: &str) -> Option<Value> {
    let inner = raw.strip_prefix('[')?.strip_suffix(']')?;
    if inner.contains('[') || inner.contains(']') {
        return None;
    }
    let items = inner
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| Value::String(unquote(item).unwrap_or(item).to_string()))
        .collect();
    Some(Value::Array(items))
}
