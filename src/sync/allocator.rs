//! Per-table id allocation.
//!
//! Each allocator reads `MAX(id)` the first time it is asked for an id and
//! counts up in memory from there. It never re-reads the store.
//!
//! Precondition: one writer at a time. Two runs allocating against the same
//! store concurrently can hand out the same id; nothing here coordinates
//! across processes.

use crate::error::Result;
use crate::storage::{Repository, Table};
use tracing::debug;

/// Running id counter for one table.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    table: Table,
    last: Option<i64>,
    issued: usize,
}

impl IdAllocator {
    #[must_use]
    pub const fn new(table: Table) -> Self {
        Self {
            table,
            last: None,
            issued: 0,
        }
    }

    /// Next unused id. Seeds from the store on first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the seeding query fails.
    pub fn next_id(&mut self, repo: &dyn Repository) -> Result<i64> {
        let last = match self.last {
            Some(last) => last,
            None => {
                let seed = repo.max_id(self.table)?;
                debug!(table = %self.table, seed, "seeded id allocator");
                seed
            }
        };
        let id = last + 1;
        self.last = Some(id);
        self.issued += 1;
        Ok(id)
    }

    /// Number of ids handed out so far.
    #[must_use]
    pub const fn issued(&self) -> usize {
        self.issued
    }
}

/// One allocator per table, shared across every script in a run.
#[derive(Debug, Clone)]
pub struct IdAllocators {
    script: IdAllocator,
    variable: IdAllocator,
    launch_point: IdAllocator,
    launch_point_variable: IdAllocator,
}

impl Default for IdAllocators {
    fn default() -> Self {
        Self {
            script: IdAllocator::new(Table::Script),
            variable: IdAllocator::new(Table::Variable),
            launch_point: IdAllocator::new(Table::LaunchPoint),
            launch_point_variable: IdAllocator::new(Table::LaunchPointVariable),
        }
    }
}

impl IdAllocators {
    pub fn get_mut(&mut self, table: Table) -> &mut IdAllocator {
        match table {
            Table::Script => &mut self.script,
            Table::Variable => &mut self.variable,
            Table::LaunchPoint => &mut self.launch_point,
            Table::LaunchPointVariable => &mut self.launch_point_variable,
        }
    }

    /// Ids handed out across all tables.
    #[must_use]
    pub const fn issued(&self) -> usize {
        self.script.issued
            + self.variable.issued
            + self.launch_point.issued
            + self.launch_point_variable.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Row, SqliteStorage, Statement};
    use serde_json::json;

    fn insert_variable(storage: &SqliteStorage, id: i64, name: &str) {
        let mut row = Row::new();
        row.insert("AUTOSCRIPTVARSID".into(), json!(id));
        row.insert("AUTOSCRIPT".into(), json!("TEST1"));
        row.insert("VARNAME".into(), json!(name));
        storage
            .conn()
            .run(&Statement::insert(Table::Variable, &row))
            .unwrap();
    }

    #[test]
    fn test_kth_id_is_max_plus_k() {
        let storage = SqliteStorage::open_memory().unwrap();
        insert_variable(&storage, 10, "A");
        insert_variable(&storage, 17, "B");

        let mut allocator = IdAllocator::new(Table::Variable);
        for k in 1..=3 {
            assert_eq!(allocator.next_id(storage.conn()).unwrap(), 17 + k);
        }
        assert_eq!(allocator.issued(), 3);
    }

    #[test]
    fn test_empty_table_starts_at_one() {
        let storage = SqliteStorage::open_memory().unwrap();
        let mut allocator = IdAllocator::new(Table::LaunchPoint);
        assert_eq!(allocator.next_id(storage.conn()).unwrap(), 1);
    }

    #[test]
    fn test_seeds_only_once() {
        let storage = SqliteStorage::open_memory().unwrap();
        let mut allocator = IdAllocator::new(Table::Variable);
        assert_eq!(allocator.next_id(storage.conn()).unwrap(), 1);

        // A row written behind the allocator's back is not seen.
        insert_variable(&storage, 50, "LATE");
        assert_eq!(allocator.next_id(storage.conn()).unwrap(), 2);
    }

    #[test]
    fn test_tables_are_independent() {
        let storage = SqliteStorage::open_memory().unwrap();
        insert_variable(&storage, 5, "A");

        let mut allocators = IdAllocators::default();
        assert_eq!(
            allocators
                .get_mut(Table::Variable)
                .next_id(storage.conn())
                .unwrap(),
            6
        );
        assert_eq!(
            allocators
                .get_mut(Table::Script)
                .next_id(storage.conn())
                .unwrap(),
            1
        );
        assert_eq!(allocators.issued(), 2);
    }
}
