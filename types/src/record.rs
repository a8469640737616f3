//! Wire records as served by the script server.
//!
//! The server is loose about JSON types: numbers sometimes arrive as strings
//! and strings sometimes arrive as `null`. These structs absorb that at the
//! deserialization boundary so the domain types never see it.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Element 0 of a fetched sequence, and each element of the script list.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGroupRecord {
    #[serde(rename = "groupID", deserialize_with = "lenient_int")]
    pub group_id: i64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub filename: String,
    #[serde(rename = "cfStop", deserialize_with = "lenient_int")]
    pub cf_stop: i64,
    #[serde(rename = "cfPause", deserialize_with = "lenient_int")]
    pub cf_pause: i64,
    #[serde(rename = "cfNext", deserialize_with = "lenient_int")]
    pub cf_next: i64,
    #[serde(rename = "cfPrevious", deserialize_with = "lenient_int")]
    pub cf_previous: i64,
}

/// Elements 1..n of a fetched sequence.
#[derive(Debug, Clone, Deserialize)]
pub struct RawInstructionRecord {
    #[serde(rename = "instructionNumber", deserialize_with = "lenient_int")]
    pub instruction_number: i64,
    #[serde(rename = "commandID", default, deserialize_with = "lenient_opt_int")]
    pub command_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(rename = "type", deserialize_with = "lenient_int")]
    pub kind: i64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub filename: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: String,
    #[serde(deserialize_with = "lenient_float")]
    pub delay: f64,
    #[serde(rename = "cfStop", deserialize_with = "lenient_int")]
    pub cf_stop: i64,
    #[serde(rename = "cfPause", deserialize_with = "lenient_int")]
    pub cf_pause: i64,
    #[serde(rename = "cfNext", deserialize_with = "lenient_int")]
    pub cf_next: i64,
    #[serde(rename = "cfPrevious", deserialize_with = "lenient_int")]
    pub cf_previous: i64,
    /// Branch slots stay untyped here; each is decoded on its own so one bad
    /// slot cannot fail the whole instruction.
    #[serde(default)]
    pub branching: Vec<Value>,
}

/// One `branching` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBranchRecord {
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub record: Option<String>,
}

fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_int(&value).ok_or_else(|| D::Error::custom(format!("expected integer, got {value}")))
}

fn lenient_opt_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    value_to_int(&value)
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("expected integer, got {value}")))
}

fn lenient_float<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| D::Error::custom(format!("expected number, got {value}")))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_text(deserializer)?.unwrap_or_default())
}

fn lenient_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(D::Error::custom(format!("expected text, got {other}"))),
    }
}

fn value_to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
