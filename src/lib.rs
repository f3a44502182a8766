//! pinboard - markdown documents and a kanban task board
//!
//! This library provides the core functionality for the pinboard CLI: a
//! read-only markdown document store on disk and a task board backed by a
//! remote PostgREST table.
//!
//! # Core Concepts
//!
//! - **Documents**: `<root>/<category>/<name>.md` files, addressed by slug
//! - **Tasks**: rows in the remote store, grouped into status columns
//! - **Optimistic mutations**: local change first, rolled back on failure
//! - **Preferences**: small JSON file with board layout choices
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.pinboard.toml` and the environment
//! - `error`: Error types and result aliases
//! - `document` / `markdown`: Document loading and rendering
//! - `task` / `query`: Task model, filters and pagination
//! - `store`: Task store seam, REST and in-memory implementations
//! - `retry`: Retry policy for remote calls
//! - `board`: Optimistic mutation coordinator
//! - `server`: HTTP API and document pages
//! - `prefs`: Persisted board preferences
//! - `ui`: Terminal board
//! - `lock`: File locking and atomic writes

pub mod board;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod lock;
pub mod markdown;
pub mod output;
pub mod prefs;
pub mod query;
pub mod retry;
pub mod server;
pub mod store;
pub mod task;
pub mod ui;

pub use error::{Error, Result};
