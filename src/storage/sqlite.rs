//! SQLite storage implementation.
//!
//! `SqliteStorage` owns the connection and the transaction discipline.
//! Record-level reads and writes go through the [`Repository`] trait, which
//! is implemented for `rusqlite::Connection` so the same code runs inside
//! and outside a transaction.

use crate::error::Result;
use crate::storage::schema::{apply_schema, Table};
use crate::storage::sql::{Row, Statement};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default busy timeout when the database is locked by another writer.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Record access over any open connection.
pub trait Repository {
    /// Run a SELECT and return every row, column names upper-cased.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails to prepare or run.
    fn query(&self, statement: &Statement) -> Result<Vec<Row>>;

    /// Run an INSERT or UPDATE and return the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    fn run(&self, statement: &Statement) -> Result<usize>;

    /// Current maximum id of `table`, or 0 when the table is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn max_id(&self, table: Table) -> Result<i64> {
        let rows = self.query(&Statement::max_id(table))?;
        Ok(rows
            .first()
            .and_then(|row| row.get("MAXID"))
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }
}

impl Repository for Connection {
    fn query(&self, statement: &Statement) -> Result<Vec<Row>> {
        debug!(sql = %statement.sql, params = statement.params.len(), "query");
        let mut stmt = self.prepare(&statement.sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_uppercase())
            .collect();

        let rows = stmt.query_map(
            rusqlite::params_from_iter(statement.params.iter().map(to_sql)),
            |row| {
                let mut record = Row::new();
                for (i, column) in columns.iter().enumerate() {
                    record.insert(column.clone(), from_sql(row.get_ref(i)?));
                }
                Ok(record)
            },
        )?;

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn run(&self, statement: &Statement) -> Result<usize> {
        debug!(sql = %statement.sql, params = statement.params.len(), "execute");
        let affected = self.execute(
            &statement.sql,
            rusqlite::params_from_iter(statement.params.iter().map(to_sql)),
        )?;
        Ok(affected)
    }
}

/// Convert a JSON value into a bindable SQLite value.
fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .unwrap_or(SqlValue::Null),
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Convert a column value into JSON.
fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (or create) a database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout: Option<Duration>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(timeout.unwrap_or(DEFAULT_BUSY_TIMEOUT))?;
        apply_schema(&conn)?;
        debug!(path = %path.display(), "opened store");
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside an IMMEDIATE transaction.
    ///
    /// Commits when `f` returns `Ok`. On error the transaction is dropped,
    /// which rolls back every statement `f` issued.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a store error from begin/commit.
    pub fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let result = match f(&tx) {
            Ok(result) => result,
            Err(err) => {
                debug!(op, error = %err, "rolling back");
                return Err(err);
            }
        };

        tx.commit()?;
        debug!(op, "committed");
        Ok(result)
    }

    /// Every stored script name, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_script_names(&self) -> Result<Vec<String>> {
        let rows = self
            .conn
            .query(&Statement::select(Table::Script, &["AUTOSCRIPT"], &[]))?;
        let mut names: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get("AUTOSCRIPT").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }
}
