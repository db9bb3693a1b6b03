//src/store/sqlite.rs
use super::push_id::PushIdGenerator;
use super::tree::{self, LeafTable};
use super::{value_children, Error, KeyPath, TreeStore};
use rusqlite::{params, Connection};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Local file-backed tree. Each scalar leaf is one row keyed by its full
/// path, so a subtree is a contiguous key range.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    ids: PushIdGenerator,
    location: String,
}

/// Leaf-row view over a connection or an open transaction.
struct Leaves<'c>(&'c Connection);

impl LeafTable for Leaves<'_> {
    fn leaves_under(&self, base: &str) -> Result<Vec<(String, Value)>, Error> {
        let (lo, hi) = tree::descendant_range(base);
        let mut stmt = self.0.prepare_cached(
            "SELECT path, value FROM nodes
             WHERE path = ?1 OR (path >= ?2 AND path < ?3)
             ORDER BY path",
        )?;
        let rows = stmt.query_map(params![base, lo, hi], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut leaves = Vec::new();
        for row in rows {
            let (path, text) = row?;
            leaves.push((path, serde_json::from_str(&text)?));
        }
        Ok(leaves)
    }

    fn delete_under(&mut self, base: &str) -> Result<(), Error> {
        let (lo, hi) = tree::descendant_range(base);
        self.0.execute(
            "DELETE FROM nodes WHERE path = ?1 OR (path >= ?2 AND path < ?3)",
            params![base, lo, hi],
        )?;
        Ok(())
    }

    fn delete_exact(&mut self, path: &str) -> Result<(), Error> {
        self.0
            .execute("DELETE FROM nodes WHERE path = ?1", params![path])?;
        Ok(())
    }

    fn insert_leaf(&mut self, path: &str, leaf: &Value) -> Result<(), Error> {
        self.0.execute(
            "INSERT OR REPLACE INTO nodes (path, value) VALUES (?1, ?2)",
            params![path, serde_json::to_string(leaf)?],
        )?;
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<(), Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS nodes (
            path TEXT PRIMARY KEY NOT NULL, -- slash-joined key path of a scalar leaf
            value TEXT NOT NULL             -- the leaf as JSON
        ) WITHOUT ROWID",
        [],
    )?;
    Ok(())
}

impl SqliteStore {
    /// Opens (or creates) the store file, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        info!(path = %path.display(), "opened sqlite store");
        Ok(Self::from_connection(conn, path.display().to_string()))
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self::from_connection(conn, ":memory:".to_string()))
    }

    fn from_connection(conn: Connection, location: String) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            ids: PushIdGenerator::new(),
            location,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    async fn run<T, F>(&self, op: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, Error> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            op(&mut guard)
        })
        .await?
    }

    async fn write(&self, path: KeyPath, value: Value) -> Result<(), Error> {
        self.run(move |conn| {
            let tx = conn.transaction()?;
            tree::write(&mut Leaves(&tx), &path, &value)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

impl TreeStore for SqliteStore {
    async fn push(&self, parent: &KeyPath, value: Value) -> Result<String, Error> {
        let id = self.ids.next_id();
        let path = parent.child(&id)?;
        debug!(%path, "sqlite push");
        self.write(path, value).await?;
        Ok(id)
    }

    async fn get(&self, path: &KeyPath) -> Result<Option<Value>, Error> {
        let path = path.clone();
        self.run(move |conn| tree::read(&Leaves(conn), &path)).await
    }

    async fn children(&self, path: &KeyPath) -> Result<Vec<(String, Value)>, Error> {
        Ok(value_children(self.get(path).await?))
    }

    async fn update(&self, path: &KeyPath, fields: Map<String, Value>) -> Result<(), Error> {
        let path = path.clone();
        debug!(%path, fields = fields.len(), "sqlite update");
        self.run(move |conn| {
            let tx = conn.transaction()?;
            tree::merge(&mut Leaves(&tx), &path, &fields)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, path: &KeyPath) -> Result<(), Error> {
        let path = path.clone();
        debug!(%path, "sqlite remove");
        self.run(move |conn| tree::remove(&mut Leaves(conn), &path))
            .await
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
    async fn documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested").join("journal.sqlite");

        let id = {
            let store = SqliteStore::open(&file).unwrap();
            store
                .push(
                    &path("workoutSheets"),
                    json!({"name": "Push day", "exercises": [{"exerciseId": "e1", "sets": 3, "reps": "8"}]}),
                )
                .await
                .unwrap()
        };

        let store = SqliteStore::open(&file).unwrap();
        let sheet = store
            .get(&path("workoutSheets").child(&id).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sheet["name"], "Push day");
        assert_eq!(sheet["exercises"][0]["sets"], 3);
    }

    #[tokio::test]
    async fn replacing_an_array_drops_stale_items() {
        let store = SqliteStore::open_in_memory().unwrap();
        let node = path("workoutSheets/s1");
        let mut fields = Map::new();
        fields.insert("exercises".into(), json!([{"sets": 1}, {"sets": 2}, {"sets": 3}]));
        store.update(&node, fields).await.unwrap();

        let mut fields = Map::new();
        fields.insert("exercises".into(), json!([{"sets": 9}]));
        store.update(&node, fields).await.unwrap();

        let sheet = store.get(&node).await.unwrap().unwrap();
        assert_eq!(sheet, json!({"exercises": [{"sets": 9}]}));
    }

    #[tokio::test]
    async fn remove_subtree_keeps_neighbours() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.push(&path("exerciseDiary/a"), json!({"comment": "x"})).await.unwrap();
        store.push(&path("exerciseDiary/ab"), json!({"comment": "y"})).await.unwrap();
        store.remove(&path("exerciseDiary/a")).await.unwrap();

        assert!(store.children(&path("exerciseDiary/a")).await.unwrap().is_empty());
        assert_eq!(store.children(&path("exerciseDiary/ab")).await.unwrap().len(), 1);
    }
}
