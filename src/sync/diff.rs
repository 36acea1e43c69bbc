//! Diff: compare local files against the store without writing either.

use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::model::{ScriptConfig, ScriptDefinition};
use crate::storage::SqliteStorage;
use crate::sync::fetch::require_script;
use crate::sync::file::{config_path, read_if_exists, script_path};

/// One differing source line. Lines are compared by index, not aligned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineDelta {
    /// 1-based line number.
    pub line: usize,
    pub local: String,
    pub stored: String,
}

/// Differences between the local and stored copy of one script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptDiff {
    pub name: String,
    /// No local source or config file.
    pub missing_locally: bool,
    pub source_changed: bool,
    pub config_changed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<LineDelta>,
}

impl ScriptDiff {
    /// Whether local and stored differ in any way.
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.missing_locally || self.source_changed || self.config_changed
    }
}

/// Diff one script.
///
/// # Errors
///
/// Returns `ScriptNotFound` if the script is not stored, or a store/IO error.
pub fn diff_script(storage: &SqliteStorage, script_dir: &Path, name: &str) -> Result<ScriptDiff> {
    let stored = require_script(storage.conn(), name)?;
    compare(&stored, script_dir)
}

/// Diff every stored script, sorted by name.
///
/// # Errors
///
/// Returns the first store or IO error.
pub fn diff_all(storage: &SqliteStorage, script_dir: &Path) -> Result<Vec<ScriptDiff>> {
    storage
        .list_script_names()?
        .iter()
        .map(|name| diff_script(storage, script_dir, name))
        .collect()
}

fn compare(stored: &ScriptDefinition, script_dir: &Path) -> Result<ScriptDiff> {
    let name = &stored.name;
    let mut diff = ScriptDiff {
        name: name.clone(),
        ..ScriptDiff::default()
    };

    let source_path = script_path(script_dir, name, stored.config.language(name)?);
    let (Some(local_source), Some(local_config)) = (
        read_if_exists(&source_path)?,
        read_if_exists(&config_path(script_dir, name))?,
    ) else {
        diff.missing_locally = true;
        return Ok(diff);
    };

    if local_source != stored.source {
        diff.source_changed = true;
        diff.lines = line_deltas(&local_source, &stored.source);
    }

    let stored_config = stored.config.to_pretty_json()?;
    diff.config_changed = canonical(&local_config) != stored_config;

    Ok(diff)
}

/// Re-serialize a config so formatting alone never counts as a change.
/// Unparseable text is compared as-is.
fn canonical(config: &str) -> String {
    ScriptConfig::from_json(config)
        .and_then(|parsed| parsed.to_pretty_json())
        .unwrap_or_else(|_| config.to_string())
}

fn line_deltas(local: &str, stored: &str) -> Vec<LineDelta> {
    local
        .split('\n')
        .zip(stored.split('\n'))
        .enumerate()
        .filter(|(_, (l, s))| l != s)
        .map(|(i, (l, s))| LineDelta {
            line: i + 1,
            local: l.to_string(),
            stored: s.to_string(),
        })
        .collect()
}
