//src/store/mod.rs
//! Key-path addressed tree store.
//!
//! Every backend exposes the same five primitives: push a child under a
//! generated id, read a point, read the children of a node, merge fields into
//! a node and delete a subtree. There are no transactions; each call is an
//! independent operation and the last write wins.

use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use thiserror::Error;

mod any;
mod memory;
pub mod push_id;
mod rest;
mod sqlite;
mod tree;

pub use any::AnyStore;
pub use memory::MemoryStore;
pub use rest::RestStore;
pub use sqlite::SqliteStore;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid key path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("Store database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error accessing store: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Request to remote store failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Remote store returned {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("Unexpected response from remote store: {0}")]
    UnexpectedResponse(String),
    #[error("Background store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Slash-delimited address of a node, e.g. `exerciseHistory/-Nabc/-Nxyz`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath {
    segments: Vec<String>,
}

// Characters the remote tree rejects inside a key.
const FORBIDDEN_KEY_CHARS: &[char] = &['.', '#', '$', '[', ']', '/'];

fn check_segment(segment: &str, whole: &str) -> Result<(), Error> {
    if segment.is_empty() {
        return Err(Error::InvalidPath {
            path: whole.to_string(),
            reason: "empty segment",
        });
    }
    if segment.contains(FORBIDDEN_KEY_CHARS) || segment.chars().any(char::is_control) {
        return Err(Error::InvalidPath {
            path: whole.to_string(),
            reason: "segment contains a forbidden character",
        });
    }
    Ok(())
}

impl KeyPath {
    /// Parses `a/b/c`. Leading and trailing slashes are ignored.
    pub fn parse(path: &str) -> Result<Self, Error> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Err(Error::InvalidPath {
                path: path.to_string(),
                reason: "path has no segments",
            });
        }
        let segments = trimmed
            .split('/')
            .map(|s| check_segment(s, path).map(|()| s.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// Appends one segment.
    pub fn child(&self, segment: &str) -> Result<Self, Error> {
        check_segment(segment, &format!("{self}/{segment}"))?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, i.e. the id of the node this path points at.
    pub fn key(&self) -> &str {
        // parse/child never build an empty path
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Proper ancestors, nearest last: `a/b/c` gives `a`, `a/b`.
    pub(crate) fn ancestors(&self) -> Vec<String> {
        (1..self.segments.len())
            .map(|n| self.segments[..n].join("/"))
            .collect()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// The store collaborator every repository talks to.
///
/// Absent nodes read as `None`. Writing `null` or an empty object removes the
/// node, as the remote tree does, so readers must treat missing fields as
/// empty.
pub trait TreeStore: Send + Sync {
    /// Writes `value` under a new child of `parent` and returns the child's id.
    /// Ids sort in creation order.
    fn push(
        &self,
        parent: &KeyPath,
        value: Value,
    ) -> impl Future<Output = Result<String, Error>> + Send;

    /// Reads the subtree rooted at `path`.
    fn get(&self, path: &KeyPath) -> impl Future<Output = Result<Option<Value>, Error>> + Send;

    /// Reads the direct children of `path`, ordered by key.
    fn children(
        &self,
        path: &KeyPath,
    ) -> impl Future<Output = Result<Vec<(String, Value)>, Error>> + Send;

    /// Merges `fields` into the node at `path`. A `null` field deletes it.
    fn update(
        &self,
        path: &KeyPath,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Deletes the subtree rooted at `path`. Deleting nothing is not an error.
    fn remove(&self, path: &KeyPath) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Splits a node value into ordered `(key, child)` pairs.
pub(crate) fn value_children(value: Option<Value>) -> Vec<(String, Value)> {
    match value {
        Some(Value::Object(map)) => map.into_iter().collect(),
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}
