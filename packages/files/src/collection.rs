//! The JSON structure kept in a record's `files` column.
//!
//! ```json
//! { "avatars": [ { "path": "avatars/0190c0de.png" } ], "documents": [] }
//! ```

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A reference to one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Disk-relative key of the stored file.
    pub path: String,
    /// Keys other than `path` found in stored JSON, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileEntry {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            extra: Map::new(),
        }
    }
}

/// Named, ordered file collections.
///
/// Collection names keep the order they were first inserted in, and so do
/// the entries within each collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CollectionMap {
    collections: IndexMap<String, Vec<FileEntry>>,
}

impl CollectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the raw column value. `None`, blank, `null` and `[]` all
    /// decode to an empty map.
    pub fn decode(raw: Option<&str>) -> Result<Self, serde_json::Error> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::new()),
            Some(text) => serde_json::from_str(text),
        }
    }

    /// Encode for storage in the column.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Entries of one collection; empty if the collection was never created.
    pub fn collection(&self, name: &str) -> &[FileEntry] {
        self.collections
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn first(&self, name: &str) -> Option<&FileEntry> {
        self.collection(name).first()
    }

    /// Append an entry, creating the collection on first use.
    pub fn push(&mut self, name: &str, entry: FileEntry) {
        self.collections
            .entry(name.to_string())
            .or_default()
            .push(entry);
    }

    /// Drop every entry of `name` whose path equals `path`.
    ///
    /// Returns how many entries were removed. A missing collection is left
    /// missing.
    pub fn remove_path(&mut self, name: &str, path: &str) -> usize {
        let Some(entries) = self.collections.get_mut(name) else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|entry| entry.path != path);
        before - entries.len()
    }

    pub fn contains_path(&self, name: &str, path: &str) -> bool {
        self.collection(name).iter().any(|entry| entry.path == path)
    }

    pub fn contains_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Collection names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FileEntry])> {
        self.collections
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    /// Number of collections, including empty ones.
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

impl<'de> Deserialize<'de> for CollectionMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let object = match value {
            Value::Null => return Ok(Self::new()),
            Value::Array(items) if items.is_empty() => return Ok(Self::new()),
            Value::Object(object) => object,
            other => {
                return Err(D::Error::custom(format!(
                    "expected an object of collections, found {}",
                    kind(&other)
                )));
            }
        };

        let mut collections = IndexMap::with_capacity(object.len());
        for (name, entries) in object {
            // Lists that lost their sequential keys after a removal are
            // sometimes stored as objects; their values are the entries.
            let items = match entries {
                Value::Array(items) => items,
                Value::Object(keyed) => keyed.into_iter().map(|(_, v)| v).collect(),
                Value::Null => Vec::new(),
                other => {
                    return Err(D::Error::custom(format!(
                        "collection '{name}' must be a list, found {}",
                        kind(&other)
                    )));
                }
            };
            let entries = items
                .into_iter()
                .map(serde_json::from_value::<FileEntry>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| D::Error::custom(format!("collection '{name}': {e}")))?;
            collections.insert(name, entries);
        }

        Ok(Self { collections })
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
