//src/models.rs
//! Records as they sit in the tree store. Field names are camelCase on the
//! wire; ids come from the key path and are never part of the stored body.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter, EnumString};

/// Parameter name to raw value. For an exercise the values are empty
/// placeholders (the schema); for a history entry they are the reading.
pub type Parameters = BTreeMap<String, String>;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

pub fn now_ms() -> Timestamp {
    Utc::now().timestamp_millis()
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum BodyPart {
    Arms,
    Shoulders,
    Back,
    Chest,
    Abs,
    Glutes,
    Legs,
    Cardio,
}

// Readings may have been written as numbers by other clients; keep them as
// text and drop nulls.
fn scalar_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

// A map keyed exactly "0".."n" is read back from the tree as an array.
fn de_parameters<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Parameters, D::Error> {
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    let pairs: Vec<(String, Value)> = match raw {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(map)) => map.into_iter().collect(),
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a parameter map, found {other}"
            )))
        }
    };
    Ok(pairs
        .into_iter()
        .filter_map(|(k, v)| scalar_to_text(v).map(|text| (k, text)))
        .collect())
}

fn de_optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(scalar_to_text)
        .filter(|text| !text.trim().is_empty()))
}

fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(de_optional_text(deserializer)?.unwrap_or_default())
}

// A list whose middle item was deleted comes back as an index-keyed object.
fn de_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    let items: Vec<Value> = match raw {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.into_iter().filter(|v| !v.is_null()).collect(),
        Some(Value::Object(map)) => {
            let mut keyed: Vec<(u64, Value)> = map
                .into_iter()
                .filter_map(|(k, v)| k.parse::<u64>().ok().map(|i| (i, v)))
                .collect();
            keyed.sort_by_key(|(i, _)| *i);
            keyed.into_iter().map(|(_, v)| v).collect()
        }
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a list, found {other}"
            )))
        }
    };
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(serde::de::Error::custom))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(skip)]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(default, deserialize_with = "de_text")]
    pub description: String,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    #[serde(skip)]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(default, deserialize_with = "de_text")]
    pub category_id: String,
    pub body_part: BodyPart,
    #[serde(default, deserialize_with = "de_parameters")]
    pub parameters: Parameters,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Exercise {
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }
}

/// Builds the placeholder schema stored on an exercise.
pub fn parameter_schema<I, N>(names: I) -> Parameters
where
    I: IntoIterator<Item = N>,
    N: AsRef<str>,
{
    names
        .into_iter()
        .map(|n| (n.as_ref().trim().to_string(), String::new()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct NewExercise {
    pub name: String,
    pub category_id: String,
    pub body_part: BodyPart,
    pub parameter_names: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExerciseUpdate {
    pub name: Option<String>,
    pub category_id: Option<String>,
    pub body_part: Option<BodyPart>,
    pub parameter_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(skip)]
    pub id: String,
    #[serde(skip)]
    pub exercise_id: String,
    #[serde(default, deserialize_with = "de_parameters")]
    pub parameters: Parameters,
    /// Reading of the entry that preceded this one when it was written.
    /// Never recomputed afterwards.
    #[serde(default, deserialize_with = "de_parameters")]
    pub previous_parameters: Parameters,
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(
        default,
        deserialize_with = "de_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryUpdate {
    pub parameters: Option<Parameters>,
    /// `Some(None)` clears the comment.
    pub comment: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntry {
    #[serde(skip)]
    pub id: String,
    #[serde(skip)]
    pub exercise_id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub comment: String,
    #[serde(default)]
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetExercise {
    #[serde(default, deserialize_with = "de_text")]
    pub exercise_id: String,
    /// Zero means "not set" and counts as one set.
    #[serde(default)]
    pub sets: u32,
    #[serde(default, deserialize_with = "de_text")]
    pub reps: String,
    #[serde(
        default,
        deserialize_with = "de_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

impl SheetExercise {
    pub const fn effective_sets(&self) -> u32 {
        if self.sets == 0 {
            1
        } else {
            self.sets
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSheet {
    #[serde(skip)]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(default, deserialize_with = "de_text")]
    pub description: String,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u32>,
    #[serde(default, deserialize_with = "de_list")]
    pub exercises: Vec<SheetExercise>,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl WorkoutSheet {
    pub fn total_sets(&self) -> u32 {
        self.exercises.iter().map(SheetExercise::effective_sets).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewWorkoutSheet {
    pub name: String,
    pub description: String,
    pub estimated_duration: Option<u32>,
    pub exercises: Vec<SheetExercise>,
}

#[derive(Debug, Clone, Default)]
pub struct SheetUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub estimated_duration: Option<Option<u32>>,
    pub exercises: Option<Vec<SheetExercise>>,
}
