//! Deploy command implementation.

use super::{open_store, Output};
use crate::cli::DeployArgs;
use crate::config::Overrides;
use crate::error::{Error, Result};
use crate::sync::{deploy_all, deploy_script, DeployStats, EntityStats, SyncOptions};

/// Execute the deploy command.
///
/// # Errors
///
/// Returns the first settings, file, validation or store error.
pub fn execute(args: &DeployArgs, overrides: Overrides<'_>, output: Output) -> Result<()> {
    let (settings, mut storage) = open_store(overrides, true)?;
    if !settings.script_dir.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "script directory does not exist: {}",
            settings.script_dir.display()
        )));
    }

    let options = SyncOptions {
        dry_run: args.dry_run,
        force: false,
    };

    let stats = match args.target.name() {
        Some(name) => deploy_script(&mut storage, &settings.script_dir, name, options)?,
        None => deploy_all(&mut storage, &settings.script_dir, options)?,
    };

    if output.json {
        let payload = serde_json::json!({
            "success": true,
            "dry_run": args.dry_run,
            "stats": stats,
        });
        println!("{}", serde_json::to_string(&payload)?);
        return Ok(());
    }

    if !output.human() {
        return Ok(());
    }

    match args.target.name() {
        Some(name) if args.dry_run => println!("{name} dry run complete, nothing written"),
        Some(name) => println!("{name} deployed successfully"),
        None if args.dry_run => println!("Dry run complete, nothing written"),
        None => println!("Scripts deployed successfully"),
    }

    if output.detailed() {
        print_details(&stats);
    }
    Ok(())
}

fn print_details(stats: &DeployStats) {
    println!();
    if !stats.scripts_deployed.is_empty() {
        println!("  Scripts:       {}", stats.scripts_deployed.join(", "));
    }
    print_entity_stats("Script rows", &stats.scripts);
    print_entity_stats("Variables", &stats.variables);
    print_entity_stats("Launch points", &stats.launch_points);
    print_entity_stats("LP variables", &stats.launch_point_variables);

    if !stats.statements.is_empty() {
        println!();
        println!("  Statements:");
        for statement in &stats.statements {
            println!("    {statement}");
        }
    }
}

fn print_entity_stats(label: &str, stats: &EntityStats) {
    println!(
        "  {label:<14} {} inserted, {} updated, {} unchanged",
        stats.inserted, stats.updated, stats.skipped
    );
}
