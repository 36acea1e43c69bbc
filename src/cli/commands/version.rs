//! Version command implementation.

use crate::error::Result;
use crate::model::ScriptLanguage;
use crate::storage::schema::CURRENT_SCHEMA_VERSION;
use crate::storage::Table;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct VersionInfo {
    version: &'static str,
    schema: i32,
    tables: Vec<&'static str>,
    languages: Vec<String>,
}

impl VersionInfo {
    fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            schema: CURRENT_SCHEMA_VERSION,
            tables: Table::ALL.iter().map(Table::name).collect(),
            languages: [ScriptLanguage::Js, ScriptLanguage::Jython]
                .iter()
                .map(|l| format!("{l} ({})", l.extension()))
                .collect(),
        }
    }
}

/// Print the version, the store schema version and the synced tables.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(json: bool) -> Result<()> {
    let info = VersionInfo::current();

    if json {
        println!("{}", serde_json::to_string(&info)?);
        return Ok(());
    }

    println!("autoscript version {} (schema {})", info.version, info.schema);
    println!("  tables:    {}", info.tables.join(", "));
    println!("  languages: {}", info.languages.join(", "));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info_lists_tables_in_deploy_order() {
        let info = VersionInfo::current();
        assert_eq!(
            info.tables,
            ["AUTOSCRIPT", "AUTOSCRIPTVARS", "SCRIPTLAUNCHPOINT", "LAUNCHPOINTVARS"]
        );
        assert_eq!(info.languages, ["js (.js)", "jython (.py)"]);
        assert_eq!(info.schema, CURRENT_SCHEMA_VERSION);
    }
}
