//! tickoff - categorized to-do lists
//!
//! This library provides the core of the tickoff CLI: a per-user task
//! collection with category filtering, progress and completion statistics,
//! persisted as one JSON record per user.
//!
//! # Core Concepts
//!
//! - **Tasks**: text, completion state and one of five fixed categories
//! - **Task Store**: the authoritative in-memory collection for one user;
//!   every mutation is saved in the background, fire-and-forget
//! - **Persistence Gateway**: whole-collection reads and writes under the
//!   key `todos_<user>`
//! - **Sessions**: which user's collection is active (or the guest)
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `config.toml`
//! - `error`: Error types and result aliases
//! - `category`: The closed set of task categories
//! - `task`: Task records and id generation
//! - `store`: Task Store and its save queue
//! - `filter`: Category filtering and per-category progress
//! - `stats`: Statistics aggregation
//! - `storage`: Key-value backends and the persistence gateway
//! - `session`: Sign-in state and user resolution
//! - `lock`: File locking and atomic writes
//! - `output`: JSON envelope and human output

pub mod category;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod lock;
pub mod output;
pub mod session;
pub mod stats;
pub mod storage;
pub mod store;
pub mod task;

pub use category::Category;
pub use error::{Error, Result};
pub use store::TaskStore;
pub use task::Task;
