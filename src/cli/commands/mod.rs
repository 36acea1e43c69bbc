//! Command implementations.

pub mod completions;
pub mod deploy;
pub mod diff;
pub mod fetch;
pub mod list;
pub mod version;

use crate::config::{load_settings, Overrides, Settings};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use crate::sync::Verbosity;

/// How a command reports its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Output {
    pub json: bool,
    pub verbosity: Verbosity,
}

impl Output {
    /// Human-readable summary lines are printed.
    #[must_use]
    pub fn human(&self) -> bool {
        !self.json && self.verbosity > Verbosity::Silent
    }

    /// Per-item detail is printed.
    #[must_use]
    pub fn detailed(&self) -> bool {
        !self.json && self.verbosity == Verbosity::Detailed
    }
}

/// Load settings and open the store.
///
/// Only `deploy` may create a new database; every other command needs an
/// existing one.
fn open_store(overrides: Overrides<'_>, create: bool) -> Result<(Settings, SqliteStorage)> {
    let settings = load_settings(overrides)?;
    if !create && !settings.database.exists() {
        return Err(Error::Config(format!(
            "database not found: {}",
            settings.database.display()
        )));
    }
    let storage = SqliteStorage::open(&settings.database)?;
    Ok((settings, storage))
}
