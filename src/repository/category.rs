//src/repository/category.rs
use super::{encode, fetch, fetch_children, node, required, Error, Result, CATEGORIES};
use crate::models::{now_ms, Category, CategoryUpdate, NewCategory};
use crate::store::TreeStore;
use serde_json::{Map, Value};
use tracing::info;

/// Creates a category stamped with the current time.
pub async fn create<S: TreeStore>(store: &S, new: NewCategory) -> Result<Category> {
    let now = now_ms();
    let mut category = Category {
        id: String::new(),
        name: required("Category name", &new.name)?,
        description: new.description.trim().to_string(),
        created_at: now,
        updated_at: now,
    };
    category.id = store.push(&node(CATEGORIES, &[])?, encode(&category)?).await?;
    info!(id = %category.id, name = %category.name, "created category");
    Ok(category)
}

pub async fn list<S: TreeStore>(store: &S) -> Result<Vec<Category>> {
    let records = fetch_children::<_, Category>(store, &node(CATEGORIES, &[])?).await?;
    Ok(records
        .into_iter()
        .map(|(id, category)| Category { id, ..category })
        .collect())
}

pub async fn get<S: TreeStore>(store: &S, id: &str) -> Result<Option<Category>> {
    let path = node(CATEGORIES, &[id])?;
    Ok(fetch::<_, Category>(store, &path)
        .await?
        .map(|category| Category {
            id: id.to_string(),
            ..category
        }))
}

/// Applies the given fields and bumps `updatedAt`.
pub async fn update<S: TreeStore>(store: &S, id: &str, changes: CategoryUpdate) -> Result<()> {
    if get(store, id).await?.is_none() {
        return Err(Error::CategoryNotFound(id.to_string()));
    }
    let mut fields = Map::new();
    if let Some(name) = changes.name {
        fields.insert("name".into(), Value::String(required("Category name", &name)?));
    }
    if let Some(description) = changes.description {
        fields.insert(
            "description".into(),
            Value::String(description.trim().to_string()),
        );
    }
    if fields.is_empty() {
        return Err(Error::Invalid {
            field: "update",
            reason: format!("no fields provided to update for category {id}"),
        });
    }
    fields.insert("updatedAt".into(), Value::from(now_ms()));
    store.update(&node(CATEGORIES, &[id])?, fields).await?;
    info!(%id, "updated category");
    Ok(())
}

/// Deletes the category record only. Use `journal::delete_category` to also
/// remove the exercises that reference it.
pub async fn delete<S: TreeStore>(store: &S, id: &str) -> Result<()> {
    store.remove(&node(CATEGORIES, &[id])?).await?;
    info!(%id, "deleted category record");
    Ok(())
}
