//! Fetch command implementation.

use super::{open_store, Output};
use crate::cli::FetchArgs;
use crate::config::Overrides;
use crate::error::Result;
use crate::sync::{fetch_all, fetch_script, FetchOutcome, SyncOptions};

/// Execute the fetch command.
///
/// # Errors
///
/// Returns `ScriptNotFound` for an unknown `--script`, or the first
/// settings, store or file error.
pub fn execute(args: &FetchArgs, overrides: Overrides<'_>, output: Output) -> Result<()> {
    let (settings, storage) = open_store(overrides, false)?;
    let options = SyncOptions {
        dry_run: false,
        force: args.force,
    };

    if let Some(name) = args.target.name() {
        let outcome = fetch_script(&storage, &settings.script_dir, name, options)?;
        if output.json {
            let payload = serde_json::json!({
                "success": true,
                "script": name,
                "outcome": outcome,
            });
            println!("{}", serde_json::to_string(&payload)?);
        } else if output.human() {
            match outcome {
                FetchOutcome::Unchanged => println!("{name} is up to date"),
                FetchOutcome::Updated => println!("{name} updated"),
                FetchOutcome::Created => println!("{name} created"),
            }
        }
        return Ok(());
    }

    let stats = fetch_all(&storage, &settings.script_dir, options)?;
    if output.json {
        let payload = serde_json::json!({
            "success": true,
            "dir": settings.script_dir.display().to_string(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string(&payload)?);
    } else if output.human() {
        println!(
            "Total scripts: {}, Updated: {}, Created: {}",
            stats.total, stats.updated, stats.created
        );
        if output.detailed() {
            println!("  Location: {}", settings.script_dir.display());
        }
    }
    Ok(())
}
