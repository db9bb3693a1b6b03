//src/store/memory.rs
use super::push_id::PushIdGenerator;
use super::tree::{self, LeafTable};
use super::{value_children, Error, KeyPath, TreeStore};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// In-process tree. Nothing survives the process; used by tests and by the
/// `memory` backend for throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    leaves: Mutex<BTreeMap<String, Value>>,
    ids: PushIdGenerator,
}

impl LeafTable for BTreeMap<String, Value> {
    fn leaves_under(&self, base: &str) -> Result<Vec<(String, Value)>, Error> {
        let (lo, hi) = tree::descendant_range(base);
        let mut rows: Vec<(String, Value)> = self
            .get(base)
            .map(|leaf| (base.to_string(), leaf.clone()))
            .into_iter()
            .collect();
        rows.extend(self.range(lo..hi).map(|(k, v)| (k.clone(), v.clone())));
        Ok(rows)
    }

    fn delete_under(&mut self, base: &str) -> Result<(), Error> {
        let (lo, hi) = tree::descendant_range(base);
        let doomed: Vec<String> = self.range(lo..hi).map(|(k, _)| k.clone()).collect();
        for key in doomed {
            self.remove(&key);
        }
        self.remove(base);
        Ok(())
    }

    fn delete_exact(&mut self, path: &str) -> Result<(), Error> {
        self.remove(path);
        Ok(())
    }

    fn insert_leaf(&mut self, path: &str, leaf: &Value) -> Result<(), Error> {
        self.insert(path.to_string(), leaf.clone());
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_leaves<T>(&self, f: impl FnOnce(&mut BTreeMap<String, Value>) -> T) -> T {
        let mut guard = self.leaves.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Number of leaf rows, for tests asserting that subtrees are gone.
    pub fn leaf_count(&self) -> usize {
        self.with_leaves(|leaves| leaves.len())
    }
}

impl TreeStore for MemoryStore {
    async fn push(&self, parent: &KeyPath, value: Value) -> Result<String, Error> {
        let id = self.ids.next_id();
        let path = parent.child(&id)?;
        self.with_leaves(|leaves| tree::write(leaves, &path, &value))?;
        debug!(%path, "memory push");
        Ok(id)
    }

    async fn get(&self, path: &KeyPath) -> Result<Option<Value>, Error> {
        self.with_leaves(|leaves| tree::read(leaves, path))
    }

    async fn children(&self, path: &KeyPath) -> Result<Vec<(String, Value)>, Error> {
        let value = self.with_leaves(|leaves| tree::read(leaves, path))?;
        Ok(value_children(value))
    }

    async fn update(&self, path: &KeyPath, fields: Map<String, Value>) -> Result<(), Error> {
        self.with_leaves(|leaves| tree::merge(leaves, path, &fields))
    }

    async fn remove(&self, path: &KeyPath) -> Result<(), Error> {
        self.with_leaves(|leaves| tree::remove(leaves, path))?;
        debug!(%path, "memory remove");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> KeyPath {
        KeyPath::parse(p).unwrap()
    }

    #[tokio::test]
    async fn push_then_read_back() {
        let store = MemoryStore::new();
        let id = store
            .push(&path("categories"), json!({"name": "Legs", "createdAt": 1}))
            .await
            .unwrap();
        let value = store.get(&path("categories").child(&id).unwrap()).await.unwrap();
        assert_eq!(value, Some(json!({"name": "Legs", "createdAt": 1})));
    }

    #[tokio::test]
    async fn children_come_back_in_push_order() {
        let store = MemoryStore::new();
        let parent = path("exerciseDiary/e1");
        let mut ids = Vec::new();
        for n in 0..5 {
            ids.push(store.push(&parent, json!({"comment": n})).await.unwrap());
        }
        let kids: Vec<String> = store
            .children(&parent)
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(kids, ids);
    }

    #[tokio::test]
    async fn update_merges_and_null_deletes() {
        let store = MemoryStore::new();
        let node = path("categories/c1");
        let mut init = Map::new();
        init.insert("name".into(), json!("Legs"));
        init.insert("description".into(), json!("lower body"));
        store.update(&node, init).await.unwrap();

        let mut patch = Map::new();
        patch.insert("name".into(), json!("Lower"));
        patch.insert("description".into(), Value::Null);
        store.update(&node, patch).await.unwrap();

        assert_eq!(store.get(&node).await.unwrap(), Some(json!({"name": "Lower"})));
    }

    #[tokio::test]
    async fn remove_deletes_only_the_subtree() {
        let store = MemoryStore::new();
        store.push(&path("exerciseHistory/e1"), json!({"a": 1})).await.unwrap();
        store.push(&path("exerciseHistory/e10"), json!({"a": 2})).await.unwrap();
        store.remove(&path("exerciseHistory/e1")).await.unwrap();

        assert_eq!(store.get(&path("exerciseHistory/e1")).await.unwrap(), None);
        assert!(store.get(&path("exerciseHistory/e10")).await.unwrap().is_some());
        assert_eq!(store.leaf_count(), 1);
    }
}
