//! Shared test fixtures: the TEST1 script and a temp script directory.

use std::fs;

use tempfile::TempDir;

pub const TEST1_SOURCE: &str = "// TEST1\nvar msg = 'it''s here';\nservice.log(msg);\n";

pub const TEST1_CONF: &str = r#"{
    "DESCRIPTION": "Test script",
    "ACTIVE": 1,
    "LOGLEVEL": "ERROR",
    "SCRIPTLANGUAGE": "js",
    "variables": [
        {"VARNAME": "VAR1", "VARBINDINGTYPE": "LITERAL", "VARTYPE": "IN", "ALLOWOVERRIDE": 1, "VARBINDINGVALUE": "42"}
    ],
    "launchPoints": [
        {
            "LAUNCHPOINTNAME": "TEST1_LP",
            "LAUNCHPOINTTYPE": "OBJECT",
            "OBJECTNAME": "ASSET",
            "ACTIVE": 1,
            "EVENT_TYPE": "save",
            "before_save": true,
            "add": true,
            "VARIABLES": [{"VARNAME": "VAR1", "VARBINDINGVALUE": "7"}]
        }
    ]
}"#;

/// A script directory holding `TEST1.js` and `conf/TEST1.json` with `conf`.
pub fn script_dir(conf: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("conf")).unwrap();
    fs::write(dir.path().join("TEST1.js"), TEST1_SOURCE).unwrap();
    fs::write(dir.path().join("conf").join("TEST1.json"), conf).unwrap();
    dir
}
