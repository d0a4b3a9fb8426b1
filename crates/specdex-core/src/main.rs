//! specdex: index a project's specification and assess section readiness.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use specdex_core::assessor::locate::{locate_spec, read_source};
use specdex_core::models::Readiness;
use specdex_core::query::guards::DEFAULT_SEARCH_LIMIT;
use specdex_core::{Assessor, IndexStore, SpecdexConfig, SpecdexError, SpecdexResult};

#[derive(Parser)]
#[command(name = "specdex")]
#[command(about = "Specification index and readiness assessor", long_about = None)]
struct Cli {
    /// Project root
    #[arg(long, value_name = "DIR", default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the index and assess every section
    Assess,
    /// Rebuild the index from the specification and changelog
    Rebuild,
    /// Show one section by alias or number
    Section { key: String },
    /// List the direct children of a section number
    Children { number: String },
    /// Search headings and content
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: i64,
    },
    /// Readiness counts from the index
    Summary,
    /// Recent changelog entries, newest first
    Changelog {
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: i64,
    },
    /// Record a readiness value for a section
    SetReadiness { key: String, readiness: Readiness },
    /// Stored and current content hash of a section
    Hash { key: String },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SPECDEX_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli.root, cli.command) {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("specdex: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("specdex: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(root: &Path, command: Command) -> SpecdexResult<Value> {
    let config = SpecdexConfig::load(root);

    match command {
        Command::Assess => {
            let report = Assessor::with_config(root, config).run()?;
            Ok(serde_json::to_value(report)?)
        }
        Command::Rebuild => {
            let mut store = open_store(root, &config);
            let source = locate_spec(root, &config).ok_or_else(|| {
                SpecdexError::NotFound(format!("no specification under {}", root.display()))
            })?;
            let spec_text = read_source(&source.spec_path)?;
            let changelog_text = source.changelog_path.as_deref().and_then(|path| {
                read_source(path)
                    .map_err(|e| {
                        tracing::warn!(path = %path.display(), error = %e, "changelog unreadable");
                    })
                    .ok()
            });
            let stats = store.rebuild(
                &spec_text,
                changelog_text.as_deref(),
                Some(source.spec_path.as_path()),
            )?;
            Ok(serde_json::to_value(stats)?)
        }
        Command::Section { key } => {
            let store = open_store(root, &config);
            let section = store
                .get(&key)
                .ok_or_else(|| SpecdexError::NotFound(format!("section {key}")))?;
            Ok(serde_json::to_value(section)?)
        }
        Command::Children { number } => {
            let store = open_store(root, &config);
            Ok(serde_json::to_value(store.children_of(&number))?)
        }
        Command::Search { query, limit } => {
            let store = open_store(root, &config);
            Ok(serde_json::to_value(store.search(&query, limit))?)
        }
        Command::Summary => {
            let store = open_store(root, &config);
            Ok(json!({
                "specVersion": store.spec_version(),
                "summary": store.readiness_summary(),
            }))
        }
        Command::Changelog { limit } => {
            let store = open_store(root, &config);
            Ok(serde_json::to_value(store.changelog(limit))?)
        }
        Command::SetReadiness { key, readiness } => {
            let store = open_store(root, &config);
            if !store.is_available() {
                return Err(SpecdexError::Database("index unavailable".to_string()));
            }
            if !store.set_readiness(&key, readiness) {
                return Err(SpecdexError::NotFound(format!("section {key}")));
            }
            Ok(json!({ "key": key, "readiness": readiness }))
        }
        Command::Hash { key } => {
            let store = open_store(root, &config);
            let section = store
                .get(&key)
                .ok_or_else(|| SpecdexError::NotFound(format!("section {key}")))?;
            let current = IndexStore::content_hash(&section.content);
            let stored = store.get_content_hash(section.key().unwrap_or(&key));
            Ok(json!({
                "key": key,
                "stored": stored,
                "current": current,
                "unchanged": stored.as_deref() == Some(current.as_str()),
            }))
        }
    }
}

/// Store at the configured path. An unopenable database degrades to empty
/// results rather than an error.
fn open_store(root: &Path, config: &SpecdexConfig) -> IndexStore {
    let mut store = IndexStore::new(config.resolve(root, &config.db_path));
    store.open();
    store
}
