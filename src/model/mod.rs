//! Data models for automation scripts.
//!
//! This module contains the local, file-backed representation:
//! - ScriptConfig (the `conf/<NAME>.json` sidecar)
//! - Variable, LaunchPoint, LaunchPointVariable
//! - ScriptDefinition (source text plus configuration)

mod flag;
pub mod script;

pub use script::{
    LaunchPoint, LaunchPointVariable, ScriptConfig, ScriptDefinition, ScriptLanguage, Variable,
};
