//! specdex core library: a queryable index of a project's specification
//! document, and the readiness assessor built on top of it.
//!
//! The parser turns specification and changelog text into sections and
//! entries, the store caches them in SQLite, and the assessor decides for
//! each section how far the implementation has caught up with the text.

pub mod assessor;
pub mod config;
pub mod errors;
pub mod models;
pub mod parser;
pub mod query;
pub mod store;

pub use assessor::{assess_project, Assessor};
pub use config::SpecdexConfig;
pub use errors::{SpecdexError, SpecdexResult};
pub use store::IndexStore;
