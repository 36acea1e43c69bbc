//! Synchronization between the store and a local script directory.
//!
//! - **Deploy**: local files → store, one transaction per script
//! - **Fetch**: store → local files, writing only what changed
//! - **Diff**: compare both sides without writing
//!
//! # Architecture
//!
//! Every record written by deploy goes through the same upsert protocol
//! ([`upsert`]): look up, compare with the change detector ([`detect`]),
//! then skip, update by natural key, or insert with an id from a per-table
//! allocator ([`allocator`]).
//!
//! # Example
//!
//! ```ignore
//! use autoscript::storage::SqliteStorage;
//! use autoscript::sync::{deploy_all, fetch_all, SyncOptions};
//!
//! let mut storage = SqliteStorage::open(&db_path)?;
//! let stats = deploy_all(&mut storage, &script_dir, SyncOptions::default())?;
//! let fetched = fetch_all(&storage, &script_dir, SyncOptions::default())?;
//! ```

pub mod allocator;
pub mod deploy;
pub mod detect;
pub mod diff;
pub mod fetch;
pub mod file;
pub mod types;
pub mod upsert;

#[cfg(test)]
pub(crate) mod fixtures;

pub use allocator::{IdAllocator, IdAllocators};
pub use deploy::{deploy_all, deploy_script, read_script_from_files, Deployer};
pub use detect::{first_difference, is_changed};
pub use diff::{diff_all, diff_script, LineDelta, ScriptDiff};
pub use fetch::{fetch_all, fetch_script, load_script, require_script};
pub use types::{
    DeployStats, EntityStats, FetchOutcome, FetchStats, Outcome, SyncOptions, Verbosity,
};
pub use upsert::{upsert, Applied, Candidate};
