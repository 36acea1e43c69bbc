//! Error types for the autoscript CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Classified store failures (authentication, timeout, generic)
//! - Context-aware recovery hints
//! - Structured JSON output for `--json` consumers
//!
//! Every error is terminal for the running command; the process exits with 1.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for autoscript operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ConfigError,
    ScriptNotFound,
    FileNotFound,
    UnsupportedLanguage,
    InvalidEvent,
    OrphanLaunchPointVariable,
    AuthenticationFailed,
    Timeout,
    DatabaseError,
    IoError,
    JsonError,
    InvalidArgument,
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::ConfigError => "CONFIG_ERROR",
            Self::ScriptNotFound => "SCRIPT_NOT_FOUND",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::UnsupportedLanguage => "UNSUPPORTED_LANGUAGE",
            Self::InvalidEvent => "INVALID_EVENT",
            Self::OrphanLaunchPointVariable => "ORPHAN_LAUNCH_POINT_VARIABLE",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::Timeout => "TIMEOUT",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

// ── Store failure classes ─────────────────────────────────────

/// Coarse classification of a store failure, used to pick the one-line message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Authentication,
    Timeout,
    Generic,
}

impl StoreErrorKind {
    /// Classify a rusqlite error.
    #[must_use]
    pub fn classify(err: &rusqlite::Error) -> Self {
        use rusqlite::ErrorCode as Code;

        match err.sqlite_error_code() {
            Some(Code::AuthorizationForStatementDenied | Code::PermissionDenied) => {
                Self::Authentication
            }
            Some(Code::DatabaseBusy | Code::DatabaseLocked) => Self::Timeout,
            _ => Self::Generic,
        }
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in autoscript operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Script not found in database: {name}")]
    ScriptNotFound { name: String },

    #[error("Script file not found: {}", path.display())]
    ScriptFileNotFound { path: PathBuf },

    #[error("Script {name} configuration file not found: {}", path.display())]
    ConfigFileNotFound { name: String, path: PathBuf },

    #[error("Unsupported language '{language}' for script {name}")]
    UnsupportedLanguage { name: String, language: String },

    #[error("Invalid event for launch point {launch_point}: {reason}")]
    InvalidEvent { launch_point: String, reason: String },

    #[error(
        "Launch point variable {variable} references launch point {launch_point}, which does not exist for script {script}"
    )]
    OrphanLaunchPointVariable {
        script: String,
        launch_point: String,
        variable: String,
    },

    #[error("{}", database_message(*kind, source))]
    Database {
        kind: StoreErrorKind,
        #[source]
        source: rusqlite::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Other(String),
}

fn database_message(kind: StoreErrorKind, source: &rusqlite::Error) -> String {
    match kind {
        StoreErrorKind::Authentication => "Invalid username or password.".to_string(),
        StoreErrorKind::Timeout => "Connection timed out.".to_string(),
        StoreErrorKind::Generic => format!("Database error: {source}"),
    }
}

impl From<rusqlite::Error> for Error {
    fn from(source: rusqlite::Error) -> Self {
        Self::Database {
            kind: StoreErrorKind::classify(&source),
            source,
        }
    }
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Config(_) => ErrorCode::ConfigError,
            Self::ScriptNotFound { .. } => ErrorCode::ScriptNotFound,
            Self::ScriptFileNotFound { .. } | Self::ConfigFileNotFound { .. } => {
                ErrorCode::FileNotFound
            }
            Self::UnsupportedLanguage { .. } => ErrorCode::UnsupportedLanguage,
            Self::InvalidEvent { .. } => ErrorCode::InvalidEvent,
            Self::OrphanLaunchPointVariable { .. } => ErrorCode::OrphanLaunchPointVariable,
            Self::Database { kind, .. } => match kind {
                StoreErrorKind::Authentication => ErrorCode::AuthenticationFailed,
                StoreErrorKind::Timeout => ErrorCode::Timeout,
                StoreErrorKind::Generic => ErrorCode::DatabaseError,
            },
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Process exit code. Every fatal error exits with 1.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        1
    }

    /// Full error detail including the source chain, shown at the highest verbosity.
    #[must_use]
    pub fn detailed(&self) -> String {
        let mut out = format!("{self}");
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(&format!("\n  caused by: {err}"));
            source = std::error::Error::source(err);
        }
        out
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Config(msg) if msg.contains("settings file") => Some(
                "Create autoscript.json with DATABASE, scriptDir and dirLocation, \
                 or pass --db and --script-dir"
                    .to_string(),
            ),
            Self::ScriptNotFound { .. } => {
                Some("Use `autoscript list` to see stored scripts.".to_string())
            }
            Self::ConfigFileNotFound { name, .. } => Some(format!(
                "Each script needs conf/{name}.json next to its source. \
                 Run `autoscript fetch --script {name}` to create it from the database."
            )),
            Self::UnsupportedLanguage { .. } => {
                Some("SCRIPTLANGUAGE must be \"js\" or \"jython\".".to_string())
            }
            Self::InvalidEvent { .. } => Some(
                "Save launch points need EVENT_TYPE \"save\", exactly one of before_save, \
                 after_save, after_commit, and at least one of add, update, delete."
                    .to_string(),
            ),
            Self::Config(_)
            | Self::ScriptFileNotFound { .. }
            | Self::OrphanLaunchPointVariable { .. }
            | Self::Database { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "exit_code": self.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn test_busy_is_timeout() {
        let err: Error = sqlite_failure(rusqlite::ffi::SQLITE_BUSY).into();
        assert_eq!(err.error_code(), ErrorCode::Timeout);
        assert_eq!(err.to_string(), "Connection timed out.");
    }

    #[test]
    fn test_auth_is_authentication() {
        let err: Error = sqlite_failure(rusqlite::ffi::SQLITE_AUTH).into();
        assert_eq!(err.error_code(), ErrorCode::AuthenticationFailed);
        assert_eq!(err.to_string(), "Invalid username or password.");
    }

    #[test]
    fn test_generic_database_error() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.error_code(), ErrorCode::DatabaseError);
        assert!(err.to_string().starts_with("Database error:"));
    }

    #[test]
    fn test_every_error_exits_with_one() {
        let errors = [
            Error::Config("missing".into()),
            Error::ScriptNotFound { name: "X".into() },
            Error::InvalidArgument("bad".into()),
        ];
        for err in errors {
            assert_eq!(err.exit_code(), 1);
        }
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let err = Error::UnsupportedLanguage {
            name: "TEST1".into(),
            language: "groovy".into(),
        };
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "UNSUPPORTED_LANGUAGE");
        assert!(json["error"]["hint"].as_str().unwrap().contains("jython"));
    }
}
