//! Environment file synchronization library.
//!
//! This library adds to a local `.env` file every variable that a reference
//! file (such as a git-tracked `.env.template`) defines and the local file is
//! missing. Values already present locally are never overwritten.
//!
//! # Features
//!
//! - **Zero-copy parsing**: Uses `Cow<str>` for efficient string handling
//! - **Deterministic output**: Variables are written sorted, optionally grouped
//!   under `# <prefix>` headers
//! - **Rollback**: The target is snapshotted before it is rewritten and restored
//!   if the write fails
//! - **Pluggable I/O**: All file access goes through the [`fs::FileSystem`] trait
//! - **Optional tracing**: Detailed logging when the `tracing` feature is enabled
//!
//! # Example
//!
//! ```rust,no_run
//! use env_sync::sync::{EnvSync, EnvSyncOptions};
//! use std::path::PathBuf;
//!
//! let options = EnvSyncOptions {
//!     source_file: PathBuf::from(".env.template"),
//!     target_file: PathBuf::from(".env"),
//!     ..Default::default()
//! };
//!
//! EnvSync::sync_with_options(options).unwrap();
//! ```

pub mod backup;
pub mod diff;
pub mod fs;
pub mod parse;
pub mod sync;
pub mod write;
