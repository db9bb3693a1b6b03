//src/repository/sheet.rs
use super::{encode, fetch, fetch_children, node, required, Error, Result, WORKOUT_SHEETS};
use crate::models::{now_ms, NewWorkoutSheet, SheetExercise, SheetUpdate, WorkoutSheet};
use crate::store::TreeStore;
use serde_json::{Map, Value};
use tracing::info;

fn check_exercises(exercises: &[SheetExercise]) -> Result<()> {
    if exercises.iter().any(|e| e.exercise_id.trim().is_empty()) {
        return Err(Error::Required("Sheet exercise id"));
    }
    Ok(())
}

pub async fn create<S: TreeStore>(store: &S, new: NewWorkoutSheet) -> Result<WorkoutSheet> {
    check_exercises(&new.exercises)?;
    let now = now_ms();
    let mut sheet = WorkoutSheet {
        id: String::new(),
        name: required("Sheet name", &new.name)?,
        description: new.description.trim().to_string(),
        estimated_duration: new.estimated_duration,
        exercises: new.exercises,
        created_at: now,
        updated_at: now,
    };
    sheet.id = store.push(&node(WORKOUT_SHEETS, &[])?, encode(&sheet)?).await?;
    info!(id = %sheet.id, name = %sheet.name, "created workout sheet");
    Ok(sheet)
}

pub async fn list<S: TreeStore>(store: &S) -> Result<Vec<WorkoutSheet>> {
    let records = fetch_children::<_, WorkoutSheet>(store, &node(WORKOUT_SHEETS, &[])?).await?;
    Ok(records
        .into_iter()
        .map(|(id, sheet)| WorkoutSheet { id, ..sheet })
        .collect())
}

pub async fn get<S: TreeStore>(store: &S, id: &str) -> Result<Option<WorkoutSheet>> {
    let path = node(WORKOUT_SHEETS, &[id])?;
    Ok(fetch::<_, WorkoutSheet>(store, &path)
        .await?
        .map(|sheet| WorkoutSheet {
            id: id.to_string(),
            ..sheet
        }))
}

/// Applies the given fields and bumps `updatedAt`. A new exercise list
/// replaces the old one entirely.
pub async fn update<S: TreeStore>(store: &S, id: &str, changes: SheetUpdate) -> Result<()> {
    if get(store, id).await?.is_none() {
        return Err(Error::SheetNotFound(id.to_string()));
    }
    let mut fields = Map::new();
    if let Some(name) = changes.name {
        fields.insert("name".into(), Value::String(required("Sheet name", &name)?));
    }
    if let Some(description) = changes.description {
        fields.insert(
            "description".into(),
            Value::String(description.trim().to_string()),
        );
    }
    if let Some(duration) = changes.estimated_duration {
        fields.insert(
            "estimatedDuration".into(),
            duration.map_or(Value::Null, Value::from),
        );
    }
    if let Some(exercises) = changes.exercises {
        check_exercises(&exercises)?;
        fields.insert("exercises".into(), encode(&exercises)?);
    }
    if fields.is_empty() {
        return Err(Error::Invalid {
            field: "update",
            reason: format!("no fields provided to update for sheet {id}"),
        });
    }
    fields.insert("updatedAt".into(), Value::from(now_ms()));
    store.update(&node(WORKOUT_SHEETS, &[id])?, fields).await?;
    info!(%id, "updated workout sheet");
    Ok(())
}

pub async fn delete<S: TreeStore>(store: &S, id: &str) -> Result<()> {
    store.remove(&node(WORKOUT_SHEETS, &[id])?).await?;
    info!(%id, "deleted workout sheet");
    Ok(())
}
