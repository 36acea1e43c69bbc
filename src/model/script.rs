//! Script configuration model.
//!
//! Mirrors the JSON sidecar stored at `conf/<NAME>.json`. Keys keep the
//! column names of the store so a fetched file and a hand-written file
//! look the same.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};
use crate::event::{self, Event, EventFlags, EventType, LaunchPointType};

/// Language of a script body. Decides the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLanguage {
    Js,
    Jython,
}

impl ScriptLanguage {
    /// Parse the `SCRIPTLANGUAGE` value (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "js" => Some(Self::Js),
            "jython" => Some(Self::Jython),
            _ => None,
        }
    }

    /// File extension including the dot.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Js => ".js",
            Self::Jython => ".py",
        }
    }

    /// Recognize a script file by its extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "js" => Some(Self::Js),
            "py" => Some(Self::Jython),
            _ => None,
        }
    }
}

impl fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Js => f.write_str("js"),
            Self::Jython => f.write_str("jython"),
        }
    }
}

/// Script-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptConfig {
    #[serde(rename = "DESCRIPTION", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "VERSION", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(
        rename = "ACTIVE",
        default,
        deserialize_with = "super::flag::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub active: Option<i64>,

    #[serde(rename = "LOGLEVEL", default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    #[serde(
        rename = "INTERFACE",
        default,
        deserialize_with = "super::flag::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub interface: Option<i64>,

    #[serde(rename = "AUTOSCRIPTID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(rename = "LANGCODE", default, skip_serializing_if = "Option::is_none")]
    pub lang_code: Option<String>,

    #[serde(rename = "SCRIPTLANGUAGE")]
    pub script_language: String,

    #[serde(default)]
    pub variables: Vec<Variable>,

    #[serde(rename = "launchPoints", default)]
    pub launch_points: Vec<LaunchPoint>,
}

/// A script variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(rename = "VARNAME")]
    pub name: String,

    #[serde(rename = "DESCRIPTION", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "VARBINDINGTYPE", default, skip_serializing_if = "Option::is_none")]
    pub binding_type: Option<String>,

    #[serde(rename = "VARTYPE", default, skip_serializing_if = "Option::is_none")]
    pub var_type: Option<String>,

    #[serde(
        rename = "ALLOWOVERRIDE",
        default,
        deserialize_with = "super::flag::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub allow_override: Option<i64>,

    #[serde(rename = "ACCESSFLAG", default, skip_serializing_if = "Option::is_none")]
    pub access_flag: Option<String>,

    #[serde(rename = "VARBINDINGVALUE", default, skip_serializing_if = "Option::is_none")]
    pub binding_value: Option<String>,

    #[serde(rename = "LITERALDATATYPE", default, skip_serializing_if = "Option::is_none")]
    pub literal_data_type: Option<String>,

    #[serde(rename = "AUTOSCRIPTVARSID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// A launch point binding the script to an object or attribute event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchPoint {
    #[serde(rename = "LAUNCHPOINTNAME")]
    pub name: String,

    #[serde(rename = "LAUNCHPOINTTYPE")]
    pub launch_point_type: LaunchPointType,

    #[serde(
        rename = "ACTIVE",
        default,
        deserialize_with = "super::flag::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub active: Option<i64>,

    #[serde(rename = "DESCRIPTION", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "OBJECTNAME", default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,

    #[serde(rename = "ATTRIBUTENAME", default, skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,

    #[serde(rename = "CONDITION", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(rename = "SCRIPTLAUNCHPOINTID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(rename = "VARIABLES", default)]
    pub variables: Vec<LaunchPointVariable>,

    #[serde(rename = "EVENT_TYPE", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,

    #[serde(flatten)]
    pub flags: EventFlags,

    /// Raw stored code, kept only when it has no decoded form.
    #[serde(rename = "OBJECTEVENT", default, skip_serializing_if = "Option::is_none")]
    pub object_event: Option<i64>,
}

/// A launch point variable binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchPointVariable {
    #[serde(rename = "VARNAME")]
    pub name: String,

    #[serde(rename = "VARBINDINGVALUE", default, skip_serializing_if = "Option::is_none")]
    pub binding_value: Option<String>,

    #[serde(rename = "LAUNCHPOINTVARSID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl LaunchPoint {
    /// A launch point with no event, object or variables.
    #[must_use]
    pub fn new(name: &str, launch_point_type: LaunchPointType) -> Self {
        Self {
            name: name.to_string(),
            launch_point_type,
            active: None,
            description: None,
            object_name: None,
            attribute_name: None,
            condition: None,
            id: None,
            variables: Vec::new(),
            event_type: None,
            flags: EventFlags::default(),
            object_event: None,
        }
    }

    /// The `OBJECTEVENT` code to store for this launch point.
    ///
    /// Encoded from `EVENT_TYPE` and flags when present, otherwise the raw
    /// `OBJECTEVENT` value (if any).
    ///
    /// # Errors
    ///
    /// Returns `InvalidEvent` when the authored flags have no code.
    pub fn object_event_code(&self) -> Result<Option<i64>> {
        let Some(event_type) = self.event_type else {
            return Ok(self.object_event);
        };

        let event = Event {
            event_type,
            flags: self.flags,
        };
        event::encode(self.launch_point_type, &event)
            .map(Some)
            .map_err(|e| Error::InvalidEvent {
                launch_point: self.name.clone(),
                reason: e.to_string(),
            })
    }

    /// Replace the stored code with its decoded `EVENT_TYPE` and flags.
    ///
    /// Codes outside the table are kept raw in `OBJECTEVENT`. Returns `false`
    /// in that case so the caller can warn.
    pub fn apply_object_event(&mut self, code: i64) -> bool {
        match event::decode(self.launch_point_type, code) {
            Some(event) => {
                self.event_type = Some(event.event_type);
                self.flags = event.flags;
                self.object_event = None;
                true
            }
            None => {
                self.event_type = None;
                self.flags = EventFlags::default();
                self.object_event = Some(code);
                false
            }
        }
    }
}

impl ScriptConfig {
    /// Parse configuration JSON without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a typed key is invalid.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Canonical serialization: pretty-printed with 4-space indentation.
    ///
    /// Field order is fixed by the struct declarations, so the output is
    /// deterministic for equal values.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| Error::Other(e.to_string()))
    }

    /// Resolve `SCRIPTLANGUAGE`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedLanguage` for anything other than `js` or `jython`.
    pub fn language(&self, script_name: &str) -> Result<ScriptLanguage> {
        ScriptLanguage::parse(&self.script_language).ok_or_else(|| Error::UnsupportedLanguage {
            name: script_name.to_string(),
            language: self.script_language.clone(),
        })
    }

    /// Validate language and every launch point event.
    ///
    /// # Errors
    ///
    /// Returns the first language or event error found.
    pub fn validate(&self, script_name: &str) -> Result<()> {
        self.language(script_name)?;
        for launch_point in &self.launch_points {
            launch_point.object_event_code()?;
        }
        Ok(())
    }
}

/// A script as authored locally: name, source text and configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDefinition {
    /// Upper-cased script name.
    pub name: String,
    pub source: String,
    pub config: ScriptConfig,
}
