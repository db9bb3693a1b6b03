//src/repository/mod.rs
//! One module per entity type, each mapping its records onto a key-path
//! namespace of the tree store. Functions take the store by reference the
//! same way the rest of the crate passes it around; none of them coordinate
//! with each other. Cross-entity rules live in `journal`.

use crate::store::{self, KeyPath, TreeStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub mod category;
pub mod diary;
pub mod exercise;
pub mod history;
pub mod sheet;

pub const CATEGORIES: &str = "categories";
pub const EXERCISES: &str = "exercises";
pub const EXERCISE_HISTORY: &str = "exerciseHistory";
pub const EXERCISE_DIARY: &str = "exerciseDiary";
pub const WORKOUT_SHEETS: &str = "workoutSheets";

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("Category not found: {0}")]
    CategoryNotFound(String),
    #[error("Exercise not found: {0}")]
    ExerciseNotFound(String),
    #[error("History entry not found: {0}")]
    HistoryEntryNotFound(String),
    #[error("Diary entry not found: {0}")]
    DiaryEntryNotFound(String),
    #[error("Workout sheet not found: {0}")]
    SheetNotFound(String),
    #[error("Malformed record at {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Store(#[from] store::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// `root/id/...` for a top-level namespace.
pub(crate) fn node(root: &str, segments: &[&str]) -> Result<KeyPath> {
    let mut path = KeyPath::parse(root)?;
    for segment in segments {
        path = path.child(segment)?;
    }
    Ok(path)
}

/// Trims `value` and rejects it when blank.
pub(crate) fn required(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Required(field));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn encode<T: Serialize>(record: &T) -> Result<Value> {
    serde_json::to_value(record).map_err(Error::Encode)
}

pub(crate) fn decode<T: DeserializeOwned>(path: &KeyPath, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| Error::Decode {
        path: path.to_string(),
        source,
    })
}

/// Reads and decodes one record, `None` when absent.
pub(crate) async fn fetch<S, T>(store: &S, path: &KeyPath) -> Result<Option<T>>
where
    S: TreeStore,
    T: DeserializeOwned,
{
    match store.get(path).await? {
        Some(value) => decode(path, value).map(Some),
        None => Ok(None),
    }
}

/// Reads and decodes every child of `parent`. Records that fail to decode
/// are skipped with a warning rather than failing the whole listing.
pub(crate) async fn fetch_children<S, T>(store: &S, parent: &KeyPath) -> Result<Vec<(String, T)>>
where
    S: TreeStore,
    T: DeserializeOwned,
{
    let mut records = Vec::new();
    for (key, value) in store.children(parent).await? {
        let path = parent.child(&key)?;
        match decode::<T>(&path, value) {
            Ok(record) => records.push((key, record)),
            Err(e) => warn!("Skipping record: {e}"),
        }
    }
    Ok(records)
}
