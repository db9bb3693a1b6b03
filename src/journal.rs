//src/journal.rs
//! Operations spanning more than one namespace: documenting a reading,
//! reference checks and the cascade deletes. Each step is its own store
//! call; a failure stops the remaining steps and nothing is rolled back.

use crate::models::{
    now_ms, DiaryEntry, Exercise, ExerciseUpdate, HistoryEntry, NewExercise, Parameters,
};
use crate::repository::{category, diary, exercise, history, Error, Result};
use crate::store::TreeStore;
use tracing::{debug, info};

/// What a documentation write produced. `diary` is set only when a comment
/// was given.
#[derive(Debug, Clone)]
pub struct Documented {
    pub history: HistoryEntry,
    pub diary: Option<DiaryEntry>,
}

async fn ensure_category<S: TreeStore>(store: &S, category_id: &str) -> Result<()> {
    if category::get(store, category_id).await?.is_none() {
        return Err(Error::CategoryNotFound(category_id.to_string()));
    }
    Ok(())
}

/// Creates an exercise after checking its category exists.
pub async fn create_exercise<S: TreeStore>(store: &S, new: NewExercise) -> Result<Exercise> {
    ensure_category(store, new.category_id.trim()).await?;
    exercise::create(store, new).await
}

/// Updates an exercise, checking the new category when one is given.
pub async fn update_exercise<S: TreeStore>(store: &S, id: &str, changes: ExerciseUpdate) -> Result<()> {
    if let Some(category_id) = &changes.category_id {
        ensure_category(store, category_id.trim()).await?;
    }
    exercise::update(store, id, changes).await
}

/// Records a reading. The most recent existing entry becomes
/// `previousParameters`; a non-blank comment is also written to the diary
/// with the same timestamp.
pub async fn add_documentation<S: TreeStore>(
    store: &S,
    exercise_id: &str,
    parameters: Parameters,
    comment: Option<&str>,
) -> Result<Documented> {
    if exercise::get(store, exercise_id).await?.is_none() {
        return Err(Error::ExerciseNotFound(exercise_id.to_string()));
    }
    let parameters: Parameters = parameters
        .into_iter()
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect();
    if parameters.is_empty() {
        return Err(Error::Required("At least one parameter value"));
    }

    let previous = history::latest(store, exercise_id)
        .await?
        .map(|entry| entry.parameters)
        .unwrap_or_default();
    debug!(%exercise_id, previous = previous.len(), "captured previous reading");

    let comment = comment.map(str::trim).filter(|c| !c.is_empty());
    let timestamp = now_ms();
    let history = history::add(
        store,
        exercise_id,
        parameters,
        previous,
        comment.map(str::to_string),
        timestamp,
    )
    .await?;

    let diary = match comment {
        Some(comment) => Some(diary::add(store, exercise_id, comment, timestamp).await?),
        None => None,
    };
    Ok(Documented { history, diary })
}

/// Deletes an exercise record, then its history, then its diary.
pub async fn delete_exercise<S: TreeStore>(store: &S, exercise_id: &str) -> Result<()> {
    if exercise::get(store, exercise_id).await?.is_none() {
        return Err(Error::ExerciseNotFound(exercise_id.to_string()));
    }
    exercise::delete(store, exercise_id).await?;
    history::delete_all(store, exercise_id).await?;
    diary::delete_all(store, exercise_id).await?;
    info!(%exercise_id, "exercise cascade complete");
    Ok(())
}

/// Deletes every exercise in the category (with their history and diary),
/// then the category record. Returns how many exercises went with it.
pub async fn delete_category<S: TreeStore>(store: &S, category_id: &str) -> Result<usize> {
    ensure_category(store, category_id).await?;
    let exercises = exercise::list_by_category(store, category_id).await?;
    for exercise in &exercises {
        info!(%category_id, exercise_id = %exercise.id, "cascading to exercise");
        delete_exercise(store, &exercise.id).await?;
    }
    category::delete(store, category_id).await?;
    info!(%category_id, removed_exercises = exercises.len(), "category cascade complete");
    Ok(exercises.len())
}
