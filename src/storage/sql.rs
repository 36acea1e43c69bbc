//! SQL statement construction.
//!
//! Statements are built from table and column names known at compile time;
//! every value travels as a bound parameter. `render` produces the literal
//! text (single quotes doubled) for dry-run and verbose display only.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::storage::schema::Table;

/// One stored record: upper-case column name to value.
pub type Row = BTreeMap<String, Value>;

/// An equality constraint `column = value`.
pub type Constraint = (&'static str, Value);

/// A SQL statement with positional parameters (`?1`, `?2`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    /// `SELECT <columns> FROM <table> [WHERE a = ?1 AND b = ?2] ORDER BY <id>`.
    ///
    /// An empty column list selects `*`.
    #[must_use]
    pub fn select(table: Table, columns: &[&str], constraints: &[Constraint]) -> Self {
        let columns = if columns.is_empty() {
            "*".to_string()
        } else {
            columns.join(", ")
        };
        let mut sql = format!("SELECT {columns} FROM {}", table.name());
        let params = push_where(&mut sql, constraints, 0);
        sql.push_str(&format!(" ORDER BY {}", table.id_column()));
        Self { sql, params }
    }

    /// `SELECT MAX(<id>) AS MAXID FROM <table>`.
    #[must_use]
    pub fn max_id(table: Table) -> Self {
        Self {
            sql: format!("SELECT MAX({}) AS MAXID FROM {}", table.id_column(), table.name()),
            params: Vec::new(),
        }
    }

    /// `INSERT INTO <table> (<columns>) VALUES (?1, ...)` over every column of `row`.
    #[must_use]
    pub fn insert(table: Table, row: &Row) -> Self {
        let columns: Vec<&str> = row.keys().map(String::as_str).collect();
        let placeholders: Vec<String> = (1..=row.len()).map(|i| format!("?{i}")).collect();
        Self {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table.name(),
                columns.join(", "),
                placeholders.join(", ")
            ),
            params: row.values().cloned().collect(),
        }
    }

    /// `UPDATE <table> SET a = ?1, ... WHERE <key>`.
    #[must_use]
    pub fn update(table: Table, set: &Row, key: &[Constraint]) -> Self {
        let assignments: Vec<String> = set
            .keys()
            .enumerate()
            .map(|(i, column)| format!("{column} = ?{}", i + 1))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", table.name(), assignments.join(", "));
        let mut params: Vec<Value> = set.values().cloned().collect();
        params.extend(push_where(&mut sql, key, set.len()));
        Self { sql, params }
    }

    /// Whether this statement changes the store.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !self.sql.starts_with("SELECT")
    }

    /// Literal SQL text with parameters substituted.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut chars = self.sql.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '?' {
                out.push(c);
                continue;
            }
            let mut digits = String::new();
            while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                digits.push(*d);
                chars.next();
            }
            match digits
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| self.params.get(i))
            {
                Some(value) => out.push_str(&quote_literal(value)),
                None => {
                    out.push('?');
                    out.push_str(&digits);
                }
            }
        }
        out
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn push_where(sql: &mut String, constraints: &[Constraint], offset: usize) -> Vec<Value> {
    if constraints.is_empty() {
        return Vec::new();
    }
    let clauses: Vec<String> = constraints
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("{column} = ?{}", offset + i + 1))
        .collect();
    sql.push_str(" WHERE ");
    sql.push_str(&clauses.join(" AND "));
    constraints.iter().map(|(_, value)| value.clone()).collect()
}

/// Escape single quotes by doubling them.
#[must_use]
pub fn escape_quotes(text: &str) -> String {
    text.replace('\'', "''")
}

/// Render a value as a SQL literal.
#[must_use]
pub fn quote_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => i64::from(*b).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", escape_quotes(s)),
        other => format!("'{}'", escape_quotes(&other.to_string())),
    }
}
