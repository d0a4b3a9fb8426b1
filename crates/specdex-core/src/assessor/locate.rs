//! Finding the specification and its changelog under a project root.

use std::path::{Path, PathBuf};

use crate::config::SpecdexConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecSource {
    pub spec_path: PathBuf,
    pub changelog_path: Option<PathBuf>,
}

/// The conventional path wins; otherwise the first root-level file (by
/// name) matching the legacy pattern. The changelog is optional and must sit
/// next to the specification.
pub fn locate_spec(root: &Path, config: &SpecdexConfig) -> Option<SpecSource> {
    let conventional = config.resolve(root, &config.spec_path);
    let spec_path = if conventional.is_file() {
        conventional
    } else {
        legacy_spec(root, &config.legacy_spec_glob)?
    };

    let changelog_path = spec_path
        .parent()
        .map(|dir| dir.join(&config.changelog_name))
        .filter(|path| path.is_file() && *path != spec_path);

    Some(SpecSource {
        spec_path,
        changelog_path,
    })
}

/// Read a source text, replacing invalid UTF-8 instead of failing on it.
pub fn read_source(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = %path.display(), "invalid UTF-8 replaced while reading");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}

fn legacy_spec(root: &Path, pattern: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .map(|name| glob_match(&name.to_string_lossy(), pattern))
                .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// Glob match supporting `*` and `?`.
pub(crate) fn glob_match(text: &str, pattern: &str) -> bool {
    let t_chars: Vec<char> = text.chars().collect();
    let p_chars: Vec<char> = pattern.chars().collect();
    let (tl, pl) = (t_chars.len(), p_chars.len());
    let mut dp = vec![vec![false; pl + 1]; tl + 1];
    dp[0][0] = true;
    for j in 1..=pl {
        if p_chars[j - 1] == '*' {
            dp[0][j] = dp[0][j - 1];
        }
    }
    for i in 1..=tl {
        for j in 1..=pl {
            if p_chars[j - 1] == '*' {
                dp[i][j] = dp[i][j - 1] || dp[i - 1][j];
            } else if p_chars[j - 1] == '?' || t_chars[i - 1] == p_chars[j - 1] {
                dp[i][j] = dp[i - 1][j - 1];
            }
        }
    }
    dp[tl][pl]
}
