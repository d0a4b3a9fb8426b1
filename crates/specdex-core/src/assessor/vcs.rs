//! Version-control timestamps for the freshness check.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Latest commit time touching any of `paths`, or `None` when that cannot be
/// determined for any reason.
pub trait CommitClock {
    fn last_commit(&self, root: &Path, paths: &[PathBuf]) -> Option<DateTime<Utc>>;
}

/// Asks the `git` binary, bounded by a timeout.
#[derive(Clone, Debug)]
pub struct GitClock {
    timeout: Duration,
}

impl GitClock {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

impl Default for GitClock {
    fn default() -> Self {
        Self::from_millis(3_000)
    }
}

impl CommitClock for GitClock {
    fn last_commit(&self, root: &Path, paths: &[PathBuf]) -> Option<DateTime<Utc>> {
        if paths.is_empty() {
            return None;
        }
        let relative: Vec<&Path> = paths
            .iter()
            .map(|path| path.strip_prefix(root).unwrap_or(path))
            .collect();

        let mut child = match Command::new("git")
            .arg("log")
            .arg("-1")
            .arg("--format=%cI")
            .arg("--")
            .args(&relative)
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tracing::debug!(error = %e, "git unavailable");
                return None;
            }
        };

        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if started.elapsed() >= self.timeout => {
                    tracing::warn!(
                        timeout_ms = self.timeout.as_millis() as u64,
                        "git log timed out"
                    );
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    tracing::warn!(error = %e, "waiting on git failed");
                    let _ = child.kill();
                    return None;
                }
            }
        }

        let output = child.wait_with_output().ok()?;
        if !output.status.success() {
            tracing::debug!(status = %output.status, "git log failed");
            return None;
        }
        parse_commit_time(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_commit_time(stdout: &str) -> Option<DateTime<Utc>> {
    let line = stdout.lines().next()?.trim();
    if line.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(line)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
}
