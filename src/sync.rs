//! Path-keyed diffs for peer synchronization.
//!
//! A diff is a flat JSON object whose keys are `/`-separated paths into a
//! nested state tree (`"tiles/base/3|4": {...}`). Local changes are flattened
//! for sending; remote diffs are expanded and deep-merged. A `null` leaf means
//! "remove this key".
//!
//! Path segments escape `~` as `~0` and `/` as `~1`, so any object key
//! survives a flatten/expand round trip.

use serde_json::{Map, Value};
use thiserror::Error;

/// Flat `path -> leaf` diff.
pub type FlatDiff = Map<String, Value>;

/// Separator between path segments.
pub const PATH_SEP: char = '/';

/// Errors raised while expanding a remote diff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("diff path is empty")]
    EmptyPath,
    /// One path is a prefix of another, e.g. `a` and `a/b`
    #[error("diff path '{0}' conflicts with another entry")]
    PathConflict(String),
    #[error("remote state must be a JSON object")]
    NotAnObject,
    #[error("remote value at '{path}' is invalid: {message}")]
    InvalidValue { path: String, message: String },
}

/// Escape one object key for use as a path segment.
pub fn escape_segment(key: &str) -> String {
    key.replace('~', "~0").replace(PATH_SEP, "~1")
}

/// Inverse of [`escape_segment`].
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Join raw keys into an escaped path.
pub fn join_path<'a>(keys: impl IntoIterator<Item = &'a str>) -> String {
    keys.into_iter().map(escape_segment).collect::<Vec<_>>().join("/")
}

/// Flatten a state tree into leaf paths.
///
/// Objects are descended into; everything else (including arrays, `null` and
/// empty objects below the root) is a leaf. A non-object root flattens to an
/// empty diff.
pub fn flatten(value: &Value) -> FlatDiff {
    let mut out = FlatDiff::new();
    if let Value::Object(map) = value {
        for (key, child) in map {
            flatten_into(child, escape_segment(key), &mut out);
        }
    }
    out
}

fn flatten_into(value: &Value, path: String, out: &mut FlatDiff) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(child, format!("{}{}{}", path, PATH_SEP, escape_segment(key)), out);
            }
        }
        leaf => {
            out.insert(path, leaf.clone());
        }
    }
}

/// Expand a flat diff into a nested object.
pub fn expand(flat: &FlatDiff) -> Result<Value, SyncError> {
    let mut root = Map::new();
    for (path, leaf) in flat {
        if path.is_empty() {
            return Err(SyncError::EmptyPath);
        }
        let segments: Vec<String> = path.split(PATH_SEP).map(unescape_segment).collect();
        let (last, parents) = segments.split_last().ok_or(SyncError::EmptyPath)?;

        let mut node = &mut root;
        for seg in parents {
            let slot = node
                .entry(seg.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            node = match slot {
                Value::Object(child) => child,
                _ => return Err(SyncError::PathConflict(path.clone())),
            };
        }
        if node.contains_key(last) {
            return Err(SyncError::PathConflict(path.clone()));
        }
        node.insert(last.clone(), leaf.clone());
    }
    Ok(Value::Object(root))
}

/// Leaves that differ between `old` and `new`, keyed by path. Keys present in
/// `old` but gone from `new` map to `null`.
pub fn diff(old: &Value, new: &Value) -> FlatDiff {
    let mut out = FlatDiff::new();
    if let (Value::Object(a), Value::Object(b)) = (old, new) {
        diff_objects(a, b, None, &mut out);
    } else if old != new {
        // Whole-tree replacement has no path form; report the new leaves.
        out = flatten(new);
    }
    out
}

fn diff_objects(old: &Map<String, Value>, new: &Map<String, Value>, prefix: Option<&str>, out: &mut FlatDiff) {
    let path_of = |key: &str| match prefix {
        Some(p) => format!("{}{}{}", p, PATH_SEP, escape_segment(key)),
        None => escape_segment(key),
    };

    for (key, old_child) in old {
        if !new.contains_key(key) {
            out.insert(path_of(key), Value::Null);
        } else if let (Value::Object(a), Some(Value::Object(b))) = (old_child, new.get(key)) {
            if !a.is_empty() && !b.is_empty() {
                diff_objects(a, b, Some(&path_of(key)), out);
            } else if !a.is_empty() {
                // Emptied: a `{}` leaf would merge as a no-op, so remove each key
                let parent = path_of(key);
                for gone in a.keys() {
                    out.insert(format!("{}{}{}", parent, PATH_SEP, escape_segment(gone)), Value::Null);
                }
            } else if a != b {
                flatten_into(&Value::Object(b.clone()), path_of(key), out);
            }
        }
    }
    for (key, new_child) in new {
        match old.get(key) {
            None => flatten_into(new_child, path_of(key), out),
            Some(Value::Object(_)) if new_child.is_object() => {}
            Some(old_child) if old_child != new_child => {
                flatten_into(new_child, path_of(key), out);
            }
            Some(_) => {}
        }
    }
}

/// Deep-merge `patch` into `target`. Non-empty objects merge key by key,
/// `null` removes the key, anything else (including `{}`) replaces.
pub fn merge(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else if value.as_object().is_some_and(|m| !m.is_empty()) {
                let slot = target_map.entry(key.clone()).or_insert(Value::Null);
                merge(slot, value);
            } else {
                target_map.insert(key.clone(), value.clone());
            }
        }
    }
}
