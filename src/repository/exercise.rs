//src/repository/exercise.rs
use super::{encode, fetch, fetch_children, node, required, Error, Result, EXERCISES};
use crate::models::{now_ms, parameter_schema, Exercise, ExerciseUpdate, NewExercise, Parameters};
use crate::store::TreeStore;
use serde_json::{Map, Value};
use tracing::info;

fn schema_from_names(names: &[String]) -> Result<Parameters> {
    if names.iter().any(|n| n.trim().is_empty()) {
        return Err(Error::Invalid {
            field: "parameters",
            reason: "parameter names cannot be blank".to_string(),
        });
    }
    Ok(parameter_schema(names))
}

/// Creates an exercise. The caller is responsible for checking that the
/// category exists; the store does not enforce references.
pub async fn create<S: TreeStore>(store: &S, new: NewExercise) -> Result<Exercise> {
    let now = now_ms();
    let mut exercise = Exercise {
        id: String::new(),
        name: required("Exercise name", &new.name)?,
        category_id: required("Category", &new.category_id)?,
        body_part: new.body_part,
        parameters: schema_from_names(&new.parameter_names)?,
        created_at: now,
        updated_at: now,
    };
    exercise.id = store.push(&node(EXERCISES, &[])?, encode(&exercise)?).await?;
    info!(id = %exercise.id, name = %exercise.name, "created exercise");
    Ok(exercise)
}

pub async fn list<S: TreeStore>(store: &S) -> Result<Vec<Exercise>> {
    let records = fetch_children::<_, Exercise>(store, &node(EXERCISES, &[])?).await?;
    Ok(records
        .into_iter()
        .map(|(id, exercise)| Exercise { id, ..exercise })
        .collect())
}

pub async fn list_by_category<S: TreeStore>(store: &S, category_id: &str) -> Result<Vec<Exercise>> {
    Ok(list(store)
        .await?
        .into_iter()
        .filter(|e| e.category_id == category_id)
        .collect())
}

pub async fn get<S: TreeStore>(store: &S, id: &str) -> Result<Option<Exercise>> {
    let path = node(EXERCISES, &[id])?;
    Ok(fetch::<_, Exercise>(store, &path)
        .await?
        .map(|exercise| Exercise {
            id: id.to_string(),
            ..exercise
        }))
}

/// Applies the given fields and bumps `updatedAt`. Replacing the parameter
/// names replaces the whole schema; recorded history is untouched.
pub async fn update<S: TreeStore>(store: &S, id: &str, changes: ExerciseUpdate) -> Result<()> {
    if get(store, id).await?.is_none() {
        return Err(Error::ExerciseNotFound(id.to_string()));
    }
    let mut fields = Map::new();
    if let Some(name) = changes.name {
        fields.insert("name".into(), Value::String(required("Exercise name", &name)?));
    }
    if let Some(category_id) = changes.category_id {
        fields.insert(
            "categoryId".into(),
            Value::String(required("Category", &category_id)?),
        );
    }
    if let Some(body_part) = changes.body_part {
        fields.insert("bodyPart".into(), encode(&body_part)?);
    }
    if let Some(names) = changes.parameter_names {
        fields.insert("parameters".into(), encode(&schema_from_names(&names)?)?);
    }
    if fields.is_empty() {
        return Err(Error::Invalid {
            field: "update",
            reason: format!("no fields provided to update for exercise {id}"),
        });
    }
    fields.insert("updatedAt".into(), Value::from(now_ms()));
    store.update(&node(EXERCISES, &[id])?, fields).await?;
    info!(%id, "updated exercise");
    Ok(())
}

/// Deletes the exercise record only; see `journal::delete_exercise` for the
/// cascade over history and diary.
pub async fn delete<S: TreeStore>(store: &S, id: &str) -> Result<()> {
    store.remove(&node(EXERCISES, &[id])?).await?;
    info!(%id, "deleted exercise record");
    Ok(())
}
