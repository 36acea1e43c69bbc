//! Lenient yes/no column handling.
//!
//! Yes/no columns are stored as integers, but hand-written configuration
//! often says `true` or `"1"`. Input accepts all three; output is always
//! the integer form.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
    Bool(bool),
    Int(i64),
    Text(String),
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Raw>::deserialize(deserializer)?;
    raw.map(|value| match value {
        Raw::Bool(b) => Ok(i64::from(b)),
        Raw::Int(n) => Ok(n),
        Raw::Text(s) => match s.trim().to_lowercase().as_str() {
            "1" | "true" | "y" | "yes" => Ok(1),
            "0" | "false" | "n" | "no" => Ok(0),
            other => Err(serde::de::Error::custom(format!(
                "expected a yes/no value, got '{other}'"
            ))),
        },
    })
    .transpose()
}
