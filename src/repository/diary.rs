//src/repository/diary.rs
//! `exerciseDiary/{exerciseId}/{entryId}`: free-text notes per exercise.

use super::{encode, fetch, fetch_children, node, required, Error, Result, EXERCISE_DIARY};
use crate::models::{DiaryEntry, Timestamp};
use crate::store::TreeStore;
use serde_json::{Map, Value};
use std::cmp::Reverse;
use tracing::info;

pub async fn add<S: TreeStore>(
    store: &S,
    exercise_id: &str,
    comment: &str,
    timestamp: Timestamp,
) -> Result<DiaryEntry> {
    let mut entry = DiaryEntry {
        id: String::new(),
        exercise_id: exercise_id.to_string(),
        comment: required("Diary comment", comment)?,
        timestamp,
    };
    entry.id = store
        .push(&node(EXERCISE_DIARY, &[exercise_id])?, encode(&entry)?)
        .await?;
    info!(id = %entry.id, %exercise_id, "added diary entry");
    Ok(entry)
}

/// Notes of one exercise, newest first.
pub async fn list_for_exercise<S: TreeStore>(store: &S, exercise_id: &str) -> Result<Vec<DiaryEntry>> {
    let parent = node(EXERCISE_DIARY, &[exercise_id])?;
    let mut entries: Vec<DiaryEntry> = fetch_children::<_, DiaryEntry>(store, &parent)
        .await?
        .into_iter()
        .map(|(id, entry)| DiaryEntry {
            id,
            exercise_id: exercise_id.to_string(),
            ..entry
        })
        .collect();
    entries.sort_by(|a, b| {
        (Reverse(a.timestamp), Reverse(&a.id)).cmp(&(Reverse(b.timestamp), Reverse(&b.id)))
    });
    Ok(entries)
}

pub async fn get<S: TreeStore>(store: &S, exercise_id: &str, entry_id: &str) -> Result<Option<DiaryEntry>> {
    let path = node(EXERCISE_DIARY, &[exercise_id, entry_id])?;
    Ok(fetch::<_, DiaryEntry>(store, &path).await?.map(|entry| DiaryEntry {
        id: entry_id.to_string(),
        exercise_id: exercise_id.to_string(),
        ..entry
    }))
}

pub async fn update<S: TreeStore>(store: &S, exercise_id: &str, entry_id: &str, comment: &str) -> Result<()> {
    if get(store, exercise_id, entry_id).await?.is_none() {
        return Err(Error::DiaryEntryNotFound(entry_id.to_string()));
    }
    let mut fields = Map::new();
    fields.insert(
        "comment".into(),
        Value::String(required("Diary comment", comment)?),
    );
    store
        .update(&node(EXERCISE_DIARY, &[exercise_id, entry_id])?, fields)
        .await?;
    info!(%exercise_id, %entry_id, "updated diary entry");
    Ok(())
}

pub async fn delete<S: TreeStore>(store: &S, exercise_id: &str, entry_id: &str) -> Result<()> {
    store
        .remove(&node(EXERCISE_DIARY, &[exercise_id, entry_id])?)
        .await?;
    info!(%exercise_id, %entry_id, "deleted diary entry");
    Ok(())
}

/// Drops the whole diary subtree of one exercise.
pub async fn delete_all<S: TreeStore>(store: &S, exercise_id: &str) -> Result<()> {
    store.remove(&node(EXERCISE_DIARY, &[exercise_id])?).await?;
    info!(%exercise_id, "deleted diary subtree");
    Ok(())
}
