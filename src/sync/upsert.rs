//! The per-record upsert protocol.
//!
//! Every record kind goes through the same decision:
//!
//! 1. Find the stored row. A candidate carrying an id is looked up by id; an
//!    id-less candidate is looked up by its natural key.
//! 2. Found and unchanged: skip.
//! 3. Found and changed: update by natural key, leaving the id and the
//!    insert-only columns alone.
//! 4. Not found: allocate an id and insert.
//!
//! Under dry run the statements are built and returned but not executed.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::storage::{Constraint, Repository, Row, Statement, Table};
use crate::sync::allocator::IdAllocator;
use crate::sync::detect::first_difference;
use crate::sync::types::{Outcome, SyncOptions};

/// A record ready for the upsert protocol.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub table: Table,
    /// Human-readable name for logs, e.g. `variable VAR1`.
    pub label: String,
    /// Id carried by the local configuration, if any.
    pub id: Option<i64>,
    /// Natural key: update target, and lookup for id-less candidates.
    pub key: Vec<Constraint>,
    /// Where to read the stored row for comparison once the id is known to
    /// exist. `None` reads it by id.
    pub compare_by: Option<Vec<Constraint>>,
    /// Authored columns: compared, updated and inserted.
    pub fields: Row,
    /// Columns written only on insert.
    pub on_insert: Row,
    /// Columns written only on update.
    pub on_update: Row,
}

impl Candidate {
    #[must_use]
    pub fn new(table: Table, label: impl Into<String>, id: Option<i64>) -> Self {
        Self {
            table,
            label: label.into(),
            id,
            key: Vec::new(),
            compare_by: None,
            fields: Row::new(),
            on_insert: Row::new(),
            on_update: Row::new(),
        }
    }

    /// Set an authored column; `None` leaves it out entirely.
    pub fn field(&mut self, column: &str, value: Option<impl Into<Value>>) -> &mut Self {
        if let Some(value) = value {
            self.fields.insert(column.to_string(), value.into());
        }
        self
    }
}

/// What the protocol did, plus the mutating statement if one was built.
#[derive(Debug, Clone)]
pub struct Applied {
    pub outcome: Outcome,
    pub statement: Option<Statement>,
}

/// Run the upsert protocol for one candidate.
///
/// # Errors
///
/// Returns an error if any query or mutation fails.
pub fn upsert(
    repo: &dyn Repository,
    allocator: &mut IdAllocator,
    candidate: Candidate,
    options: &SyncOptions,
) -> Result<Applied> {
    let table = candidate.table;

    let changed = match find_stored(repo, &candidate)? {
        Stored::Absent => return insert(repo, allocator, candidate, options),
        Stored::Found(row) => first_difference(&row, &candidate.fields),
        Stored::Unreadable => Some(table.id_column().to_string()),
    };
    let Some(column) = changed else {
        debug!(record = %candidate.label, "unchanged, skipping");
        return Ok(Applied {
            outcome: Outcome::Skipped,
            statement: None,
        });
    };
    debug!(record = %candidate.label, column = %column, "changed");

    let mut set = candidate.fields;
    set.extend(candidate.on_update);
    let statement = Statement::update(table, &set, &candidate.key);

    if options.dry_run {
        debug!(sql = %statement, "dry run, not updating");
    } else {
        let affected = repo.run(&statement)?;
        if affected == 0 {
            warn!(record = %candidate.label, table = %table, "update matched no rows");
        } else {
            debug!(record = %candidate.label, "updated");
        }
    }

    Ok(Applied {
        outcome: Outcome::Updated,
        statement: Some(statement),
    })
}

enum Stored {
    Absent,
    Found(Row),
    /// The id exists but the comparison lookup found nothing; counts as changed.
    Unreadable,
}

/// Locate the stored counterpart.
fn find_stored(repo: &dyn Repository, candidate: &Candidate) -> Result<Stored> {
    let table = candidate.table;
    let id_column = table.id_column();

    let Some(id) = candidate.id else {
        let rows = repo.query(&Statement::select(table, &[], &candidate.key))?;
        return Ok(rows.into_iter().next().map_or(Stored::Absent, Stored::Found));
    };

    let by_id = repo.query(&Statement::select(
        table,
        &[id_column],
        &[(id_column, Value::from(id))],
    ))?;
    if by_id.is_empty() {
        debug!(record = %candidate.label, id, "id not in store, inserting");
        return Ok(Stored::Absent);
    }

    let lookup = candidate
        .compare_by
        .clone()
        .unwrap_or_else(|| vec![(id_column, Value::from(id))]);
    let rows = repo.query(&Statement::select(table, &[], &lookup))?;
    Ok(rows.into_iter().next().map_or(Stored::Unreadable, Stored::Found))
}

fn insert(
    repo: &dyn Repository,
    allocator: &mut IdAllocator,
    candidate: Candidate,
    options: &SyncOptions,
) -> Result<Applied> {
    let table = candidate.table;
    let id = allocator.next_id(repo)?;

    let mut row = candidate.fields;
    row.extend(candidate.on_insert);
    row.insert(table.id_column().to_string(), Value::from(id));
    let statement = Statement::insert(table, &row);

    if options.dry_run {
        debug!(sql = %statement, "dry run, not inserting");
    } else {
        repo.run(&statement)?;
        debug!(record = %candidate.label, id, "inserted");
    }

    Ok(Applied {
        outcome: Outcome::Inserted(id),
        statement: Some(statement),
    })
}
