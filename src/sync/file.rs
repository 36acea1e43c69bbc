//! Script directory layout and atomic file operations.
//!
//! A script directory holds `<NAME>.js` or `<NAME>.py` next to a `conf/`
//! subdirectory with `<NAME>.json`. Writes go through a temp file, sync to
//! disk, then rename, so an interrupted fetch never leaves half a file.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::ScriptLanguage;

/// Name of the configuration subdirectory.
pub const CONF_DIR: &str = "conf";

/// `<dir>/conf`.
#[must_use]
pub fn conf_dir(script_dir: &Path) -> PathBuf {
    script_dir.join(CONF_DIR)
}

/// `<dir>/conf/<NAME>.json`.
#[must_use]
pub fn config_path(script_dir: &Path, name: &str) -> PathBuf {
    conf_dir(script_dir).join(format!("{name}.json"))
}

/// `<dir>/<NAME>.js` or `<dir>/<NAME>.py`.
#[must_use]
pub fn script_path(script_dir: &Path, name: &str, language: ScriptLanguage) -> PathBuf {
    script_dir.join(format!("{name}{}", language.extension()))
}

/// Read a file, returning `None` if it does not exist.
///
/// # Errors
///
/// Returns an error for any failure other than a missing file.
pub fn read_if_exists(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Write content to a file atomically.
///
/// This function:
/// 1. Writes content to a temporary file (same path with a `.tmp` suffix)
/// 2. Calls `fsync` to ensure data is on disk
/// 3. Atomically renames the temp file to the target path
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Script names found in a directory, sorted.
///
/// Skips `conf` and anything that is not a regular `.js` or `.py` file.
/// Names are the file stems as found on disk.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn discover_scripts(script_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(script_dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_name() == CONF_DIR || !entry.file_type()?.is_file() {
            continue;
        }
        if ScriptLanguage::from_path(&path).is_none() {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    names.dedup();
    Ok(names)
}
