//! A small update grammar over JSON documents: scalar assignment,
//! set-union insertion into arrays, and stable in-place re-sorting.
//!
//! Paths are dot-delimited; intermediate objects are created on demand.
//! Equality for deduplication is plain `Value` equality, which — with
//! BTree-backed maps — is insensitive to the key order a producer
//! happened to emit.

use serde_json::{Map, Value};

use parldata_shared::{ParldataError, Result};

/// How an array is ordered after a sort rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// By each element's canonical serialized form.
    Canonical,
    /// By the canonical serialized form of one field of each element.
    ByField(&'static str),
}

/// One batched update against a stored document. Operations apply in
/// declaration order: assignments, then unions, then sorts.
#[derive(Debug, Clone, Default)]
pub struct UpdateDoc {
    set: Vec<(String, Value)>,
    add_to_set: Vec<(String, Vec<Value>)>,
    sort: Vec<(String, SortKey)>,
}

impl UpdateDoc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `value` at `path`, replacing whatever is there.
    pub fn set(mut self, path: impl Into<String>, value: Value) -> Self {
        self.set.push((path.into(), value));
        self
    }

    /// Append each of `values` to the array at `path` unless an equal
    /// element is already present.
    pub fn add_to_set<I>(mut self, path: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.add_to_set
            .push((path.into(), values.into_iter().collect()));
        self
    }

    /// Rewrite the array at `path` in sorted order.
    pub fn sort(mut self, path: impl Into<String>, key: SortKey) -> Self {
        self.sort.push((path.into(), key));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.add_to_set.is_empty() && self.sort.is_empty()
    }
}

/// Read the value at a dot-delimited `path`, if the whole chain exists.
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Walk to `path`, materializing missing intermediate objects, and return
/// the slot. Fails if a non-object sits where an object is needed.
pub fn ensure_path<'a>(doc: &'a mut Value, path: &str) -> Result<&'a mut Value> {
    let mut current = doc;
    for segment in path.split('.') {
        let object = current.as_object_mut().ok_or_else(|| {
            ParldataError::merge_conflict(format!(
                "path {path:?} crosses a non-object value"
            ))
        })?;
        current = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    Ok(current)
}

fn canonical(value: &Value) -> String {
    // Maps are BTree-backed, so this is the recursively key-sorted form.
    serde_json::to_string(value).unwrap_or_default()
}

/// Apply `update` to `doc` in place.
pub fn apply_update(doc: &mut Value, update: &UpdateDoc) -> Result<()> {
    for (path, value) in &update.set {
        *ensure_path(doc, path)? = value.clone();
    }

    for (path, values) in &update.add_to_set {
        let slot = ensure_path(doc, path)?;
        if slot.is_null() || matches!(slot, Value::Object(m) if m.is_empty()) {
            *slot = Value::Array(Vec::new());
        }
        let array = slot.as_array_mut().ok_or_else(|| {
            ParldataError::merge_conflict(format!("{path:?} is not an array"))
        })?;
        for value in values {
            if !array.contains(value) {
                array.push(value.clone());
            }
        }
    }

    for (path, key) in &update.sort {
        let slot = ensure_path(doc, path)?;
        let array = slot.as_array_mut().ok_or_else(|| {
            ParldataError::merge_conflict(format!("{path:?} is not an array"))
        })?;
        match key {
            SortKey::Canonical => array.sort_by_key(canonical),
            SortKey::ByField(field) => array.sort_by_key(|element| {
                element.get(*field).map(canonical).unwrap_or_default()
            }),
        }
    }
    Ok(())
}
