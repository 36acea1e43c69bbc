//! Sync options, outcomes and run statistics.

use serde::Serialize;

use crate::storage::{Statement, Table};

/// How much a command reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Errors only.
    Silent,
    /// One line per script.
    #[default]
    Normal,
    /// Per-record decisions, statements and line-level diffs.
    Detailed,
}

impl Verbosity {
    /// Map `--silent` / `--verbose <1|2>` to a level.
    #[must_use]
    pub const fn from_flags(silent: bool, level: u8) -> Self {
        if silent {
            Self::Silent
        } else if level >= 2 {
            Self::Detailed
        } else {
            Self::Normal
        }
    }
}

/// Options threaded through every sync operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Compute statements without executing them.
    pub dry_run: bool,
    /// Fetch: rewrite local files even when unchanged.
    pub force: bool,
}

/// Result of applying the upsert protocol to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Stored record matches the candidate.
    Skipped,
    /// Stored record was updated by natural key.
    Updated,
    /// New record inserted with the given id.
    Inserted(i64),
}

/// Per-entity counts for a deploy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityStats {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl EntityStats {
    /// Count one outcome.
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Skipped => self.skipped += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Inserted(_) => self.inserted += 1,
        }
    }

    /// Records that changed the store (or would have, under dry run).
    #[must_use]
    pub const fn mutations(&self) -> usize {
        self.inserted + self.updated
    }

    fn merge(&mut self, other: &Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
    }
}

/// Statistics for a deploy run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct DeployStats {
    /// Scripts whose cascade completed.
    pub scripts_deployed: Vec<String>,
    pub scripts: EntityStats,
    pub variables: EntityStats,
    pub launch_points: EntityStats,
    pub launch_point_variables: EntityStats,
    /// Rendered mutating statements, collected under dry run.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub statements: Vec<String>,
}

impl DeployStats {
    /// Count an outcome against its table.
    pub fn record(&mut self, table: Table, outcome: Outcome) {
        self.entity_mut(table).record(outcome);
    }

    /// Keep a statement for the dry-run report.
    pub fn push_statement(&mut self, statement: &Statement) {
        self.statements.push(statement.render());
    }

    /// Stats for one table.
    #[must_use]
    pub const fn entity(&self, table: Table) -> &EntityStats {
        match table {
            Table::Script => &self.scripts,
            Table::Variable => &self.variables,
            Table::LaunchPoint => &self.launch_points,
            Table::LaunchPointVariable => &self.launch_point_variables,
        }
    }

    fn entity_mut(&mut self, table: Table) -> &mut EntityStats {
        match table {
            Table::Script => &mut self.scripts,
            Table::Variable => &mut self.variables,
            Table::LaunchPoint => &mut self.launch_points,
            Table::LaunchPointVariable => &mut self.launch_point_variables,
        }
    }

    /// Total inserts and updates across all tables.
    #[must_use]
    pub const fn mutations(&self) -> usize {
        self.scripts.mutations()
            + self.variables.mutations()
            + self.launch_points.mutations()
            + self.launch_point_variables.mutations()
    }

    /// Total inserts across all tables.
    #[must_use]
    pub const fn inserted(&self) -> usize {
        self.scripts.inserted
            + self.variables.inserted
            + self.launch_points.inserted
            + self.launch_point_variables.inserted
    }

    /// Fold another run's stats into this one.
    pub fn merge(&mut self, other: Self) {
        self.scripts.merge(&other.scripts);
        self.variables.merge(&other.variables);
        self.launch_points.merge(&other.launch_points);
        self.launch_point_variables
            .merge(&other.launch_point_variables);
        self.scripts_deployed.extend(other.scripts_deployed);
        self.statements.extend(other.statements);
    }
}

/// What fetch did with one script's local files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    Unchanged,
    Updated,
    Created,
}

/// Statistics for a fetch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    pub total: usize,
    pub updated: usize,
    pub created: usize,
}

impl FetchStats {
    /// Count one script.
    pub fn record(&mut self, outcome: FetchOutcome) {
        self.total += 1;
        match outcome {
            FetchOutcome::Unchanged => {}
            FetchOutcome::Updated => self.updated += 1,
            FetchOutcome::Created => self.created += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, 2), Verbosity::Silent);
        assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, 2), Verbosity::Detailed);
        assert!(Verbosity::Detailed > Verbosity::Normal);
    }

    #[test]
    fn test_entity_stats() {
        let mut stats = EntityStats::default();
        stats.record(Outcome::Inserted(4));
        stats.record(Outcome::Updated);
        stats.record(Outcome::Skipped);
        assert_eq!(stats.mutations(), 2);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_deploy_stats_merge() {
        let mut first = DeployStats::default();
        first.record(Table::Script, Outcome::Inserted(1));
        first.scripts_deployed.push("A".into());

        let mut second = DeployStats::default();
        second.record(Table::LaunchPointVariable, Outcome::Updated);
        second.scripts_deployed.push("B".into());

        first.merge(second);
        assert_eq!(first.mutations(), 2);
        assert_eq!(first.inserted(), 1);
        assert_eq!(first.scripts_deployed, vec!["A", "B"]);
    }

    #[test]
    fn test_fetch_stats() {
        let mut stats = FetchStats::default();
        stats.record(FetchOutcome::Created);
        stats.record(FetchOutcome::Unchanged);
        assert_eq!(
            stats,
            FetchStats {
                total: 2,
                updated: 0,
                created: 1
            }
        );
    }
}
