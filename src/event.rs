//! Launch point event codec.
//!
//! A launch point stores its trigger as a single integer (`OBJECTEVENT`).
//! Script configuration files describe the same trigger as an `EVENT_TYPE`
//! plus boolean flags. This module converts between the two through one
//! lookup table, so `encode` and `decode` cannot drift apart.
//!
//! For `OBJECT` launch points the save family is composed:
//! `code = phase multiplier × action mask`, where the multipliers are
//! before_save = 1, after_save = 8, after_commit = 64 and the mask is the
//! sum of add = 2, update = 4, delete = 8. Every other event has a fixed code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Kind of launch point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchPointType {
    Object,
    Attribute,
}

impl LaunchPointType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "OBJECT",
            Self::Attribute => "ATTRIBUTE",
        }
    }

    /// Parse the stored column value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "OBJECT" => Some(Self::Object),
            "ATTRIBUTE" => Some(Self::Attribute),
            _ => None,
        }
    }
}

impl fmt::Display for LaunchPointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `EVENT_TYPE` written in script configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Init,
    Save,
    Validate,
    AllowObjCreation,
    AllowObjDelete,
    RunAction,
    RestrictAccess,
    RetrieveList,
}

impl EventType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Save => "save",
            Self::Validate => "validate",
            Self::AllowObjCreation => "allow_obj_creation",
            Self::AllowObjDelete => "allow_obj_delete",
            Self::RunAction => "run_action",
            Self::RestrictAccess => "restrict_access",
            Self::RetrieveList => "retrieve_list",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Save phase of an `OBJECT` save launch point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BeforeSave,
    AfterSave,
    AfterCommit,
}

impl Phase {
    pub const ALL: [Self; 3] = [Self::BeforeSave, Self::AfterSave, Self::AfterCommit];

    #[must_use]
    pub const fn multiplier(self) -> i64 {
        match self {
            Self::BeforeSave => 1,
            Self::AfterSave => 8,
            Self::AfterCommit => 64,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeSave => "before_save",
            Self::AfterSave => "after_save",
            Self::AfterCommit => "after_commit",
        }
    }
}

const ADD: i64 = 2;
const UPDATE: i64 = 4;
const DELETE: i64 = 8;

/// Boolean trigger flags as they appear in configuration files.
///
/// Unset flags are omitted when serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFlags {
    #[serde(default, skip_serializing_if = "is_false")]
    pub add: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub update: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub delete: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub before_save: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub after_save: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub after_commit: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl EventFlags {
    /// Action mask: add = 2, update = 4, delete = 8.
    #[must_use]
    pub const fn mask(&self) -> i64 {
        let mut mask = 0;
        if self.add {
            mask += ADD;
        }
        if self.update {
            mask += UPDATE;
        }
        if self.delete {
            mask += DELETE;
        }
        mask
    }

    fn phases(&self) -> Vec<Phase> {
        Phase::ALL
            .into_iter()
            .filter(|p| match p {
                Phase::BeforeSave => self.before_save,
                Phase::AfterSave => self.after_save,
                Phase::AfterCommit => self.after_commit,
            })
            .collect()
    }

    fn from_parts(phase: Option<Phase>, mask: i64) -> Self {
        Self {
            add: mask & ADD != 0,
            update: mask & UPDATE != 0,
            delete: mask & DELETE != 0,
            before_save: phase == Some(Phase::BeforeSave),
            after_save: phase == Some(Phase::AfterSave),
            after_commit: phase == Some(Phase::AfterCommit),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A decoded launch point event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub event_type: EventType,
    pub flags: EventFlags,
}

/// Why an event description cannot be encoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("save event has no add, update or delete flag")]
    MissingAction,

    #[error("save event has no before_save, after_save or after_commit flag")]
    MissingPhase,

    #[error("save event has more than one phase flag set")]
    ConflictingPhases,

    #[error("event type '{event_type}' is not valid for {launch_point_type} launch points")]
    NotApplicable {
        event_type: EventType,
        launch_point_type: LaunchPointType,
    },
}

/// One row of the code table.
#[derive(Debug, Clone)]
pub struct EventCode {
    pub launch_point_type: LaunchPointType,
    pub event_type: EventType,
    pub phase: Option<Phase>,
    pub mask: i64,
    pub code: i64,
    pub label: String,
}

const OBJECT_FIXED: [(EventType, i64); 4] = [
    (EventType::Init, 1),
    (EventType::Validate, 1024),
    (EventType::AllowObjCreation, 2048),
    (EventType::AllowObjDelete, 4096),
];

const ATTRIBUTE_FIXED: [(EventType, i64); 5] = [
    (EventType::Validate, 0),
    (EventType::RunAction, 1),
    (EventType::Init, 2),
    (EventType::RestrictAccess, 8),
    (EventType::RetrieveList, 16),
];

/// Every valid `(launch point type, code)` pair.
pub static EVENT_CODES: LazyLock<Vec<EventCode>> = LazyLock::new(|| {
    let mut rows = Vec::new();

    for (event_type, code) in OBJECT_FIXED {
        rows.push(fixed_row(LaunchPointType::Object, event_type, code));
    }

    for phase in Phase::ALL {
        for mask in (ADD..=ADD + UPDATE + DELETE).step_by(2) {
            let flags = EventFlags::from_parts(None, mask);
            let actions: Vec<&str> = [("add", flags.add), ("update", flags.update), ("delete", flags.delete)]
                .into_iter()
                .filter_map(|(name, set)| set.then_some(name))
                .collect();
            rows.push(EventCode {
                launch_point_type: LaunchPointType::Object,
                event_type: EventType::Save,
                phase: Some(phase),
                mask,
                code: phase.multiplier() * mask,
                label: format!("save {} {}", phase.as_str(), actions.join("+")),
            });
        }
    }

    for (event_type, code) in ATTRIBUTE_FIXED {
        rows.push(fixed_row(LaunchPointType::Attribute, event_type, code));
    }

    rows
});

fn fixed_row(launch_point_type: LaunchPointType, event_type: EventType, code: i64) -> EventCode {
    EventCode {
        launch_point_type,
        event_type,
        phase: None,
        mask: 0,
        code,
        label: event_type.as_str().to_string(),
    }
}

/// Encode an event description into its stored integer code.
///
/// # Errors
///
/// Returns an error when the combination has no code: a save event missing
/// its action or phase flags, a save event with several phases, or an event
/// type that does not exist for this launch point type.
pub fn encode(launch_point_type: LaunchPointType, event: &Event) -> Result<i64, EventError> {
    let (phase, mask) = if launch_point_type == LaunchPointType::Object
        && event.event_type == EventType::Save
    {
        let phases = event.flags.phases();
        let phase = match phases.as_slice() {
            [] => return Err(EventError::MissingPhase),
            [phase] => *phase,
            _ => return Err(EventError::ConflictingPhases),
        };
        let mask = event.flags.mask();
        if mask == 0 {
            return Err(EventError::MissingAction);
        }
        (Some(phase), mask)
    } else {
        (None, 0)
    };

    EVENT_CODES
        .iter()
        .find(|row| {
            row.launch_point_type == launch_point_type
                && row.event_type == event.event_type
                && row.phase == phase
                && row.mask == mask
        })
        .map(|row| row.code)
        .ok_or(EventError::NotApplicable {
            event_type: event.event_type,
            launch_point_type,
        })
}

/// Decode a stored integer code. Returns `None` for codes outside the table.
#[must_use]
pub fn decode(launch_point_type: LaunchPointType, code: i64) -> Option<Event> {
    EVENT_CODES
        .iter()
        .find(|row| row.launch_point_type == launch_point_type && row.code == code)
        .map(|row| Event {
            event_type: row.event_type,
            flags: EventFlags::from_parts(row.phase, row.mask),
        })
}
