//! SQLite storage layer for automation scripts.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - Bound-parameter statements
//! - Transaction discipline for each script's deploy cascade
//!
//! # Submodules
//!
//! - [`schema`] - Database schema definitions
//! - [`sql`] - Statement construction and literal rendering
//! - [`sqlite`] - Connection, transactions and the [`Repository`] trait

pub mod schema;
pub mod sql;
pub mod sqlite;

pub use schema::Table;
pub use sql::{Constraint, Row, Statement};
pub use sqlite::{Repository, SqliteStorage};
