//! List command implementation.

use super::{open_store, Output};
use crate::config::Overrides;
use crate::error::Result;

/// Print every stored script name, sorted.
///
/// # Errors
///
/// Returns a settings or store error.
pub fn execute(overrides: Overrides<'_>, output: Output) -> Result<()> {
    let (_, storage) = open_store(overrides, false)?;
    let names = storage.list_script_names()?;

    if output.json {
        let payload = serde_json::json!({
            "count": names.len(),
            "scripts": names,
        });
        println!("{}", serde_json::to_string(&payload)?);
        return Ok(());
    }

    // Names go to stdout even with --silent so the output can be piped.
    for name in &names {
        println!("{name}");
    }
    if output.detailed() {
        println!();
        println!("Total scripts: {}", names.len());
    }
    Ok(())
}
