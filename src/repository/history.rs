//src/repository/history.rs
//! `exerciseHistory/{exerciseId}/{entryId}`: dated parameter readings.

use super::{encode, fetch, fetch_children, node, Error, Result, EXERCISE_HISTORY};
use crate::models::{HistoryEntry, HistoryUpdate, Parameters, Timestamp};
use crate::store::TreeStore;
use serde_json::{Map, Value};
use std::cmp::Reverse;
use tracing::{debug, info};

// Newest first. Push ids grow with time, so they break timestamp ties.
fn sort_newest_first(entries: &mut [HistoryEntry]) {
    entries.sort_by(|a, b| {
        (Reverse(a.timestamp), Reverse(&a.id)).cmp(&(Reverse(b.timestamp), Reverse(&b.id)))
    });
}

pub async fn add<S: TreeStore>(
    store: &S,
    exercise_id: &str,
    parameters: Parameters,
    previous_parameters: Parameters,
    comment: Option<String>,
    timestamp: Timestamp,
) -> Result<HistoryEntry> {
    let mut entry = HistoryEntry {
        id: String::new(),
        exercise_id: exercise_id.to_string(),
        parameters,
        previous_parameters,
        timestamp,
        comment: comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    };
    entry.id = store
        .push(&node(EXERCISE_HISTORY, &[exercise_id])?, encode(&entry)?)
        .await?;
    info!(id = %entry.id, %exercise_id, "added history entry");
    Ok(entry)
}

/// Entries of one exercise, newest first.
pub async fn list_for_exercise<S: TreeStore>(store: &S, exercise_id: &str) -> Result<Vec<HistoryEntry>> {
    let parent = node(EXERCISE_HISTORY, &[exercise_id])?;
    let mut entries: Vec<HistoryEntry> = fetch_children::<_, HistoryEntry>(store, &parent)
        .await?
        .into_iter()
        .map(|(id, entry)| HistoryEntry {
            id,
            exercise_id: exercise_id.to_string(),
            ..entry
        })
        .collect();
    sort_newest_first(&mut entries);
    debug!(%exercise_id, count = entries.len(), "listed history");
    Ok(entries)
}

/// Most recent entry of one exercise.
pub async fn latest<S: TreeStore>(store: &S, exercise_id: &str) -> Result<Option<HistoryEntry>> {
    Ok(list_for_exercise(store, exercise_id).await?.into_iter().next())
}

/// Every entry of every exercise, newest first.
pub async fn list_all<S: TreeStore>(store: &S) -> Result<Vec<HistoryEntry>> {
    let root = node(EXERCISE_HISTORY, &[])?;
    let mut entries = Vec::new();
    for (exercise_id, _) in store.children(&root).await? {
        entries.extend(list_for_exercise(store, &exercise_id).await?);
    }
    sort_newest_first(&mut entries);
    Ok(entries)
}

pub async fn get<S: TreeStore>(store: &S, exercise_id: &str, entry_id: &str) -> Result<Option<HistoryEntry>> {
    let path = node(EXERCISE_HISTORY, &[exercise_id, entry_id])?;
    Ok(fetch::<_, HistoryEntry>(store, &path).await?.map(|entry| HistoryEntry {
        id: entry_id.to_string(),
        exercise_id: exercise_id.to_string(),
        ..entry
    }))
}

/// Edits the reading or comment of one entry. Newer entries keep the
/// `previousParameters` they captured when they were written.
pub async fn update<S: TreeStore>(
    store: &S,
    exercise_id: &str,
    entry_id: &str,
    changes: HistoryUpdate,
) -> Result<()> {
    if get(store, exercise_id, entry_id).await?.is_none() {
        return Err(Error::HistoryEntryNotFound(entry_id.to_string()));
    }
    let mut fields = Map::new();
    if let Some(parameters) = changes.parameters {
        if parameters.is_empty() {
            return Err(Error::Required("At least one parameter value"));
        }
        fields.insert("parameters".into(), encode(&parameters)?);
    }
    if let Some(comment) = changes.comment {
        let comment = comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        fields.insert("comment".into(), comment.map_or(Value::Null, Value::String));
    }
    if fields.is_empty() {
        return Err(Error::Invalid {
            field: "update",
            reason: format!("no fields provided to update for history entry {entry_id}"),
        });
    }
    store
        .update(&node(EXERCISE_HISTORY, &[exercise_id, entry_id])?, fields)
        .await?;
    info!(%exercise_id, %entry_id, "updated history entry");
    Ok(())
}

pub async fn delete<S: TreeStore>(store: &S, exercise_id: &str, entry_id: &str) -> Result<()> {
    store
        .remove(&node(EXERCISE_HISTORY, &[exercise_id, entry_id])?)
        .await?;
    info!(%exercise_id, %entry_id, "deleted history entry");
    Ok(())
}

/// Drops the whole history subtree of one exercise.
pub async fn delete_all<S: TreeStore>(store: &S, exercise_id: &str) -> Result<()> {
    store.remove(&node(EXERCISE_HISTORY, &[exercise_id])?).await?;
    info!(%exercise_id, "deleted history subtree");
    Ok(())
}
