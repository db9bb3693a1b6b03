//src/store/tree.rs
// Local backends keep the tree as flat `(path, scalar)` leaf rows. Writing a
// node replaces every leaf at or below it; reading re-assembles the nested
// value from the leaves sorted by path.

use super::{Error, KeyPath};
use serde_json::{Map, Value};

/// Storage of leaf rows keyed by full path.
pub(crate) trait LeafTable {
    /// Leaf at `base` plus every leaf below it, sorted by path.
    fn leaves_under(&self, base: &str) -> Result<Vec<(String, Value)>, Error>;
    /// Deletes the leaf at `base` and every leaf below it.
    fn delete_under(&mut self, base: &str) -> Result<(), Error>;
    fn delete_exact(&mut self, path: &str) -> Result<(), Error>;
    fn insert_leaf(&mut self, path: &str, leaf: &Value) -> Result<(), Error>;
}

/// Exclusive upper bound of the key range holding the descendants of `base`.
/// `'0'` is the character right after `'/'`.
pub(crate) fn descendant_range(base: &str) -> (String, String) {
    (format!("{base}/"), format!("{base}0"))
}

fn flatten_into(path: &KeyPath, value: &Value, out: &mut Vec<(String, Value)>) -> Result<(), Error> {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(&path.child(key)?, child, out)?;
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(&path.child(&index.to_string())?, child, out)?;
            }
        }
        scalar => out.push((path.to_string(), scalar.clone())),
    }
    Ok(())
}

/// Leaf rows for `value` written at `path`. Nulls and empty containers
/// produce no rows.
pub(crate) fn flatten(path: &KeyPath, value: &Value) -> Result<Vec<(String, Value)>, Error> {
    let mut out = Vec::new();
    flatten_into(path, value, &mut out)?;
    Ok(out)
}

fn insert_at(node: &mut Value, segments: &[&str], leaf: Value) {
    let Value::Object(map) = node else { return };
    match segments {
        [] => {}
        [last] => {
            map.insert((*last).to_string(), leaf);
        }
        [first, rest @ ..] => {
            let child = map
                .entry((*first).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            insert_at(child, rest, leaf);
        }
    }
}

// Objects keyed exactly 0..n come back as arrays, like the remote tree does.
fn restore_arrays(value: Value) -> Value {
    let Value::Object(map) = value else {
        return value;
    };
    let map: Map<String, Value> = map
        .into_iter()
        .map(|(k, v)| (k, restore_arrays(v)))
        .collect();

    let mut indexed = Vec::with_capacity(map.len());
    for (key, child) in &map {
        match key.parse::<usize>() {
            Ok(i) if i.to_string() == *key => indexed.push((i, child.clone())),
            _ => return Value::Object(map),
        }
    }
    indexed.sort_by_key(|(i, _)| *i);
    if indexed.iter().enumerate().all(|(pos, (i, _))| pos == *i) {
        Value::Array(indexed.into_iter().map(|(_, v)| v).collect())
    } else {
        Value::Object(map)
    }
}

/// Rebuilds the value rooted at `base` from its leaf rows.
pub(crate) fn assemble(base: &str, rows: Vec<(String, Value)>) -> Option<Value> {
    let prefix = format!("{base}/");
    let mut root: Option<Value> = None;
    for (path, leaf) in rows {
        if path == base {
            // a leaf never has descendants
            return Some(leaf);
        }
        let Some(rest) = path.strip_prefix(&prefix) else {
            continue;
        };
        let segments: Vec<&str> = rest.split('/').collect();
        let node = root.get_or_insert_with(|| Value::Object(Map::new()));
        insert_at(node, &segments, leaf);
    }
    root.map(restore_arrays)
}

pub(crate) fn read<T: LeafTable>(table: &T, path: &KeyPath) -> Result<Option<Value>, Error> {
    let base = path.to_string();
    Ok(assemble(&base, table.leaves_under(&base)?))
}

fn apply<T: LeafTable>(table: &mut T, path: &KeyPath, leaves: &[(String, Value)]) -> Result<(), Error> {
    // a scalar sitting on an ancestor would shadow the new subtree
    for ancestor in path.ancestors() {
        table.delete_exact(&ancestor)?;
    }
    table.delete_under(&path.to_string())?;
    for (leaf_path, leaf) in leaves {
        table.insert_leaf(leaf_path, leaf)?;
    }
    Ok(())
}

/// Replaces the subtree at `path` with `value`.
pub(crate) fn write<T: LeafTable>(table: &mut T, path: &KeyPath, value: &Value) -> Result<(), Error> {
    let leaves = flatten(path, value)?;
    apply(table, path, &leaves)
}

/// Replaces each named child of `path`. Every key is validated before the
/// first write.
pub(crate) fn merge<T: LeafTable>(
    table: &mut T,
    path: &KeyPath,
    fields: &Map<String, Value>,
) -> Result<(), Error> {
    let planned = fields
        .iter()
        .map(|(key, value)| {
            let child = path.child(key)?;
            let leaves = flatten(&child, value)?;
            Ok((child, leaves))
        })
        .collect::<Result<Vec<_>, Error>>()?;
    for (child, leaves) in &planned {
        apply(table, child, leaves)?;
    }
    Ok(())
}

pub(crate) fn remove<T: LeafTable>(table: &mut T, path: &KeyPath) -> Result<(), Error> {
    table.delete_under(&path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_skips_nulls_and_nests_paths() {
        let path = KeyPath::parse("exercises/e1").unwrap();
        let leaves = flatten(
            &path,
            &json!({"name": "Squat", "parameters": {"weight": ""}, "gone": null, "tags": ["a", "b"]}),
        )
        .unwrap();
        let paths: Vec<&str> = leaves.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "exercises/e1/name",
                "exercises/e1/parameters/weight",
                "exercises/e1/tags/0",
                "exercises/e1/tags/1",
            ]
        );
    }

    #[test]
    fn flatten_rejects_keys_with_slashes() {
        let path = KeyPath::parse("categories/c1").unwrap();
        assert!(flatten(&path, &json!({"a/b": 1})).is_err());
    }

    #[test]
    fn assemble_restores_objects_and_arrays() {
        let rows = vec![
            ("s/1/exercises/0/sets".to_string(), json!(3)),
            ("s/1/exercises/1/sets".to_string(), json!(4)),
            ("s/1/name".to_string(), json!("Push")),
        ];
        let value = assemble("s/1", rows).unwrap();
        assert_eq!(
            value,
            json!({"exercises": [{"sets": 3}, {"sets": 4}], "name": "Push"})
        );
    }

    #[test]
    fn sparse_index_maps_stay_objects() {
        let rows = vec![("x/0".to_string(), json!(1)), ("x/2".to_string(), json!(3))];
        assert_eq!(assemble("x", rows).unwrap(), json!({"0": 1, "2": 3}));
    }

    #[test]
    fn descendant_range_excludes_siblings_with_common_prefix() {
        let (lo, hi) = descendant_range("exercises/e1");
        assert!("exercises/e1/name".to_string() >= lo);
        assert!("exercises/e1/name".to_string() < hi);
        assert!("exercises/e10/name".to_string() >= hi);
    }
}
