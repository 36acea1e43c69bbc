//! Diff command implementation.

use super::{open_store, Output};
use crate::cli::Target;
use crate::config::Overrides;
use crate::error::Result;
use crate::sync::{diff_all, diff_script, ScriptDiff};
use colored::Colorize;

/// Execute the diff command.
///
/// Reporting differences is not an error: the command exits 0 either way.
///
/// # Errors
///
/// Returns `ScriptNotFound` for an unknown `--script`, or the first
/// settings, store or file error.
pub fn execute(target: &Target, overrides: Overrides<'_>, output: Output) -> Result<()> {
    let (settings, storage) = open_store(overrides, false)?;

    let diffs = match target.name() {
        Some(name) => vec![diff_script(&storage, &settings.script_dir, name)?],
        None => diff_all(&storage, &settings.script_dir)?,
    };
    let modified: Vec<&ScriptDiff> = diffs.iter().filter(|d| d.is_modified()).collect();

    if output.json {
        let payload = serde_json::json!({
            "modified": modified.len(),
            "scripts": modified,
        });
        println!("{}", serde_json::to_string(&payload)?);
        return Ok(());
    }

    if !output.human() {
        return Ok(());
    }

    if modified.is_empty() {
        match target.name() {
            Some(name) => println!("{name} is up to date"),
            None => println!("All scripts are up to date"),
        }
        return Ok(());
    }

    for diff in &modified {
        print_diff(diff, output.detailed());
    }
    if target.name().is_none() {
        println!("{} scripts have been modified", modified.len());
    }
    Ok(())
}

fn print_diff(diff: &ScriptDiff, detailed: bool) {
    let name = &diff.name;
    if diff.missing_locally {
        println!("Script {name} is missing locally.");
        return;
    }
    if diff.source_changed {
        println!("Script {name} has been modified.");
        if detailed {
            for delta in &diff.lines {
                println!("  {}", format!("line {}:", delta.line).dimmed());
                println!("  {}", format!("- {}", delta.local).red());
                println!("  {}", format!("+ {}", delta.stored).green());
            }
        }
    }
    if diff.config_changed {
        println!("Configuration for script {name} has been modified.");
    }
}
