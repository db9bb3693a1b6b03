//src/store/any.rs
use super::{Error, KeyPath, MemoryStore, RestStore, SqliteStore, TreeStore};
use serde_json::{Map, Value};
use std::fmt;

/// Backend picked at runtime from configuration.
pub enum AnyStore {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
    Rest(RestStore),
}

impl fmt::Display for AnyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(_) => write!(f, "memory (not persisted)"),
            Self::Sqlite(store) => write!(f, "sqlite ({})", store.location()),
            Self::Rest(store) => write!(f, "rest ({})", store.base_url()),
        }
    }
}

impl TreeStore for AnyStore {
    async fn push(&self, parent: &KeyPath, value: Value) -> Result<String, Error> {
        match self {
            Self::Memory(s) => s.push(parent, value).await,
            Self::Sqlite(s) => s.push(parent, value).await,
            Self::Rest(s) => s.push(parent, value).await,
        }
    }

    async fn get(&self, path: &KeyPath) -> Result<Option<Value>, Error> {
        match self {
            Self::Memory(s) => s.get(path).await,
            Self::Sqlite(s) => s.get(path).await,
            Self::Rest(s) => s.get(path).await,
        }
    }

    async fn children(&self, path: &KeyPath) -> Result<Vec<(String, Value)>, Error> {
        match self {
            Self::Memory(s) => s.children(path).await,
            Self::Sqlite(s) => s.children(path).await,
            Self::Rest(s) => s.children(path).await,
        }
    }

    async fn update(&self, path: &KeyPath, fields: Map<String, Value>) -> Result<(), Error> {
        match self {
            Self::Memory(s) => s.update(path, fields).await,
            Self::Sqlite(s) => s.update(path, fields).await,
            Self::Rest(s) => s.update(path, fields).await,
        }
    }

    async fn remove(&self, path: &KeyPath) -> Result<(), Error> {
        match self {
            Self::Memory(s) => s.remove(path).await,
            Self::Sqlite(s) => s.remove(path).await,
            Self::Rest(s) => s.remove(path).await,
        }
    }
}
