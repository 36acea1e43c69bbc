//! Synchronize automation scripts between a SQLite store and a local
//! script directory.
//!
//! This crate provides the core functionality for the `autoscript` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Settings file loading and command-line overrides
//! - [`event`] - Launch point event code table
//! - [`model`] - Script, variable and launch point types
//! - [`storage`] - SQLite database layer
//! - [`sync`] - Deploy, fetch and diff
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod storage;
pub mod sync;

pub use error::{Error, Result};
