//! Database schema definitions.
//!
//! The four automation script tables. They are created on open when absent,
//! so an empty SQLite file is a valid, empty store.

use rusqlite::{Connection, Result};

/// Current schema version for tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema.
///
/// Timestamps are TEXT in `YYYY-MM-DD HH:MM:SS.ffffff` form. Children refer
/// to their owners by name, not by id; there are no foreign keys.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

-- Automation scripts
CREATE TABLE IF NOT EXISTS AUTOSCRIPT (
    AUTOSCRIPTID INTEGER PRIMARY KEY,
    AUTOSCRIPT TEXT NOT NULL UNIQUE,
    STATUS TEXT,
    DESCRIPTION TEXT,
    SOURCE TEXT,
    VERSION TEXT,
    CREATEDDATE TEXT,
    STATUSDATE TEXT,
    CHANGEDATE TEXT,
    OWNER TEXT,
    CREATEDBY TEXT,
    CHANGEBY TEXT,
    HASLD INTEGER DEFAULT 0,
    LANGCODE TEXT,
    SCRIPTLANGUAGE TEXT,
    USERDEFINED INTEGER DEFAULT 1,
    LOGLEVEL TEXT,
    INTERFACE INTEGER DEFAULT 0,
    ACTIVE INTEGER DEFAULT 0
);

-- Script variables
CREATE TABLE IF NOT EXISTS AUTOSCRIPTVARS (
    AUTOSCRIPTVARSID INTEGER PRIMARY KEY,
    AUTOSCRIPT TEXT NOT NULL,
    VARNAME TEXT NOT NULL,
    VARBINDINGTYPE TEXT,
    VARTYPE TEXT,
    DESCRIPTION TEXT,
    ALLOWOVERRIDE INTEGER DEFAULT 0,
    ACCESSFLAG TEXT,
    VARBINDINGVALUE TEXT,
    LITERALDATATYPE TEXT,
    UNIQUE (AUTOSCRIPT, VARNAME)
);

CREATE INDEX IF NOT EXISTS idx_autoscriptvars_script ON AUTOSCRIPTVARS(AUTOSCRIPT);

-- Launch points
CREATE TABLE IF NOT EXISTS SCRIPTLAUNCHPOINT (
    SCRIPTLAUNCHPOINTID INTEGER PRIMARY KEY,
    LAUNCHPOINTNAME TEXT NOT NULL,
    AUTOSCRIPT TEXT NOT NULL,
    DESCRIPTION TEXT,
    LAUNCHPOINTTYPE TEXT NOT NULL,
    ACTIVE INTEGER DEFAULT 0,
    OBJECTNAME TEXT,
    OBJECTEVENT INTEGER,
    ATTRIBUTENAME TEXT,
    CONDITION TEXT,
    UNIQUE (AUTOSCRIPT, LAUNCHPOINTNAME)
);

CREATE INDEX IF NOT EXISTS idx_scriptlaunchpoint_script ON SCRIPTLAUNCHPOINT(AUTOSCRIPT);

-- Launch point variables
CREATE TABLE IF NOT EXISTS LAUNCHPOINTVARS (
    LAUNCHPOINTVARSID INTEGER PRIMARY KEY,
    LAUNCHPOINTNAME TEXT NOT NULL,
    AUTOSCRIPT TEXT NOT NULL,
    VARNAME TEXT NOT NULL,
    VARBINDINGVALUE TEXT,
    UNIQUE (AUTOSCRIPT, LAUNCHPOINTNAME, VARNAME)
);

CREATE INDEX IF NOT EXISTS idx_launchpointvars_lp ON LAUNCHPOINTVARS(AUTOSCRIPT, LAUNCHPOINTNAME);
";

/// The four synchronized tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Script,
    Variable,
    LaunchPoint,
    LaunchPointVariable,
}

impl Table {
    /// Deploy order: every table after its owner.
    pub const ALL: [Self; 4] = [
        Self::Script,
        Self::Variable,
        Self::LaunchPoint,
        Self::LaunchPointVariable,
    ];

    /// SQL table name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Script => "AUTOSCRIPT",
            Self::Variable => "AUTOSCRIPTVARS",
            Self::LaunchPoint => "SCRIPTLAUNCHPOINT",
            Self::LaunchPointVariable => "LAUNCHPOINTVARS",
        }
    }

    /// Numeric primary key column.
    #[must_use]
    pub const fn id_column(&self) -> &'static str {
        match self {
            Self::Script => "AUTOSCRIPTID",
            Self::Variable => "AUTOSCRIPTVARSID",
            Self::LaunchPoint => "SCRIPTLAUNCHPOINTID",
            Self::LaunchPointVariable => "LAUNCHPOINTVARSID",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Apply pragmas and create missing tables.
///
/// # Errors
///
/// Returns an error if any statement fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            CURRENT_SCHEMA_VERSION,
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
        ],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_schema() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("Failed to apply schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            Table::Script,
            Table::Variable,
            Table::LaunchPoint,
            Table::LaunchPointVariable,
        ] {
            assert!(tables.contains(&table.name().to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        apply_schema(&conn).expect("First apply failed");
        apply_schema(&conn).expect("Second apply failed");
    }

    #[test]
    fn test_script_name_unique() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO AUTOSCRIPT (AUTOSCRIPTID, AUTOSCRIPT) VALUES (1, 'TEST1')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO AUTOSCRIPT (AUTOSCRIPTID, AUTOSCRIPT) VALUES (2, 'TEST1')",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn test_launch_point_variable_has_no_foreign_key() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        // Owner ordering is enforced by the deploy cascade, not the schema.
        let result = conn.execute(
            "INSERT INTO LAUNCHPOINTVARS (LAUNCHPOINTVARSID, LAUNCHPOINTNAME, AUTOSCRIPT, VARNAME)
             VALUES (1, 'NOPE', 'TEST1', 'VAR1')",
            [],
        );
        assert!(result.is_ok());
    }
}
