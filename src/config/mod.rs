//! Settings loading.
//!
//! Commands need two things: the SQLite database holding the automation
//! script tables and the local script directory. Both come from a JSON
//! settings file, and either can be overridden from the command line.
//!
//! # Settings file
//!
//! ```json
//! {
//!     "DATABASE": "maximo.db",
//!     "HOSTNAME": "db.example.com",
//!     "UID": "maximo",
//!     "PWD": "secret",
//!     "PORT": 50000,
//!     "PROTOCOL": "TCPIP",
//!     "scriptDir": "scripts",
//!     "dirLocation": "relative"
//! }
//! ```
//!
//! `HOSTNAME`, `UID`, `PWD`, `PORT` and `PROTOCOL` are optional and only
//! shown in the connection string logged at debug level.

use crate::error::{Error, Result};

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the working directory.
pub const SETTINGS_FILE: &str = "autoscript.json";

/// Environment variable naming a settings file.
pub const SETTINGS_ENV: &str = "AUTOSCRIPT_CONFIG";

/// How `scriptDir` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirLocation {
    /// Resolved against the directory holding the settings file.
    Relative,
    /// Taken as-is.
    Absolute,
}

/// Settings file contents before validation.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawSettings {
    #[serde(rename = "DATABASE")]
    database: Option<String>,
    #[serde(rename = "HOSTNAME")]
    hostname: Option<String>,
    #[serde(rename = "UID")]
    uid: Option<String>,
    #[serde(rename = "PWD")]
    pwd: Option<String>,
    #[serde(rename = "PORT")]
    port: Option<serde_json::Value>,
    #[serde(rename = "PROTOCOL")]
    protocol: Option<String>,
    #[serde(rename = "scriptDir")]
    script_dir: Option<String>,
    #[serde(rename = "dirLocation")]
    dir_location: Option<DirLocation>,
}

/// Connection parameters, kept for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub database: String,
    pub hostname: Option<String>,
    pub uid: Option<String>,
    pub pwd: Option<String>,
    pub port: Option<String>,
    pub protocol: Option<String>,
}

impl ConnectionInfo {
    /// `DATABASE=..;HOSTNAME=..;...` with the password replaced by `****`.
    #[must_use]
    pub fn masked(&self) -> String {
        let masked_pwd = self.pwd.as_ref().map(|_| "****".to_string());
        [
            ("DATABASE", Some(&self.database)),
            ("HOSTNAME", self.hostname.as_ref()),
            ("UID", self.uid.as_ref()),
            ("PWD", masked_pwd.as_ref()),
            ("PORT", self.port.as_ref()),
            ("PROTOCOL", self.protocol.as_ref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| format!("{key}={v};")))
        .collect()
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Command-line overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides<'a> {
    /// Explicit settings file (`--config`).
    pub config: Option<&'a Path>,
    /// Database path (`--db`), replaces `DATABASE`.
    pub db: Option<&'a Path>,
    /// Script directory (`--script-dir`), replaces `scriptDir`.
    pub script_dir: Option<&'a Path>,
}

/// Resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: PathBuf,
    pub script_dir: PathBuf,
    pub connection: ConnectionInfo,
    /// Settings file used, if any.
    pub source: Option<PathBuf>,
}

/// Global settings directory: `~/.autoscript/`.
#[must_use]
pub fn global_settings_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".autoscript"))
}

/// Locate the settings file.
///
/// Priority:
/// 1. `explicit` path (`--config`), returned even when it does not exist
/// 2. `AUTOSCRIPT_CONFIG` environment variable
/// 3. `./autoscript.json`
/// 4. `~/.autoscript/config.json`
#[must_use]
pub fn locate_settings_file(explicit: Option<&Path>) -> Option<PathBuf> {
    let from_env = std::env::var(SETTINGS_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    let cwd = std::env::current_dir().ok().map(|d| d.join(SETTINGS_FILE));
    let global = global_settings_dir().map(|d| d.join("config.json"));
    pick_settings_file(explicit, from_env, [cwd, global])
}

fn pick_settings_file(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    fallbacks: [Option<PathBuf>; 2],
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if from_env.is_some() {
        return from_env;
    }
    fallbacks.into_iter().flatten().find(|p| p.is_file())
}

/// Load settings, applying command-line overrides.
///
/// With both `db` and `script_dir` overrides and no explicit settings
/// file, no file is read at all.
///
/// # Errors
///
/// Returns `Config` if no settings file can be found, if it cannot be
/// parsed, or if a required key is missing.
pub fn load_settings(overrides: Overrides<'_>) -> Result<Settings> {
    if overrides.config.is_none() {
        if let (Some(db), Some(script_dir)) = (overrides.db, overrides.script_dir) {
            let settings = Settings {
                database: db.to_path_buf(),
                script_dir: script_dir.to_path_buf(),
                connection: ConnectionInfo {
                    database: db.display().to_string(),
                    ..ConnectionInfo::default()
                },
                source: None,
            };
            debug!(connection = %settings.connection, "settings from command line");
            return Ok(settings);
        }
    }

    let path = locate_settings_file(overrides.config).ok_or_else(|| {
        Error::Config(format!(
            "no settings file found (looked for --config, {SETTINGS_ENV}, ./{SETTINGS_FILE}, ~/.autoscript/config.json)"
        ))
    })?;
    load_settings_file(&path, overrides)
}

/// Load settings from a specific file, applying command-line overrides.
///
/// # Errors
///
/// Returns `Config` if the file is missing, unparseable, or lacks a
/// required key.
pub fn load_settings_file(path: &Path, overrides: Overrides<'_>) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("cannot read settings file {}: {e}", path.display()))
    })?;
    let raw: RawSettings = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("invalid settings file {}: {e}", path.display()))
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let settings = resolve(raw, base, overrides, path)?;
    debug!(
        file = %path.display(),
        connection = %settings.connection,
        script_dir = %settings.script_dir.display(),
        "settings loaded"
    );
    Ok(settings)
}

fn resolve(raw: RawSettings, base: &Path, overrides: Overrides<'_>, path: &Path) -> Result<Settings> {
    let database = match overrides.db {
        Some(db) => db.to_path_buf(),
        None => {
            let name = required(raw.database.as_deref(), "DATABASE")?;
            relative_to(base, Path::new(name))
        }
    };

    let script_dir = match overrides.script_dir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let dir = required(raw.script_dir.as_deref(), "scriptDir")?;
            match raw.dir_location {
                Some(DirLocation::Relative) => base.join(dir),
                Some(DirLocation::Absolute) => PathBuf::from(dir),
                None => return Err(missing("dirLocation")),
            }
        }
    };

    let connection = ConnectionInfo {
        database: database.display().to_string(),
        hostname: raw.hostname,
        uid: raw.uid,
        pwd: raw.pwd,
        port: raw.port.map(|p| match p {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }),
        protocol: raw.protocol,
    };

    Ok(Settings {
        database,
        script_dir,
        connection,
        source: Some(path.to_path_buf()),
    })
}

fn required<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str> {
    value.filter(|v| !v.trim().is_empty()).ok_or_else(|| missing(key))
}

fn missing(key: &str) -> Error {
    Error::Config(format!("{key} not found in config file"))
}

fn relative_to(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
