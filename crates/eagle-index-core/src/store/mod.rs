//! Whole-document JSON store for the index
//!
//! The index is three small JSON documents that are always read and written
//! whole. [`DocumentStore`] is the minimal surface the creator and refresher
//! need (`get`, `put`, and an exclusive `lock` for read-modify-write
//! sections); [`IndexStore`] layers the typed documents on top.

pub mod fs;
pub mod memory;

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::index::{AllIndex, TypeIndex};
use crate::types::EntryType;

pub use fs::FsStore;
pub use memory::MemoryStore;

/// One of the index documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Document {
    AllIndex,
    Type(EntryType),
}

impl Document {
    pub fn file_name(&self) -> String {
        match self {
            Document::AllIndex => "alldex.json".to_string(),
            Document::Type(entry_type) => entry_type.file_name(),
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to lock {path}: {source}")]
    Lock {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unexpected content in {document}: {message}")]
    Shape { document: Document, message: String },
}

/// Read/write whole JSON documents.
///
/// Callers hold the value returned by [`DocumentStore::lock`] for the
/// duration of any read-modify-write sequence.
pub trait DocumentStore: Send + Sync {
    /// Guard released on drop.
    type Lock: Send;

    fn lock(&self) -> Result<Self::Lock, StoreError>;

    /// `Ok(None)` when the document does not exist yet.
    fn get(&self, document: Document) -> Result<Option<Value>, StoreError>;

    fn put(&self, document: Document, value: &Value) -> Result<(), StoreError>;
}

/// Typed access to the index documents.
#[derive(Debug, Clone)]
pub struct IndexStore<S> {
    inner: S,
}

impl<S: DocumentStore> IndexStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn lock(&self) -> Result<S::Lock, StoreError> {
        self.inner.lock()
    }

    pub fn load_alldex(&self) -> Result<Option<AllIndex>, StoreError> {
        self.load(Document::AllIndex)
    }

    pub fn save_alldex(&self, alldex: &AllIndex) -> Result<(), StoreError> {
        self.save(Document::AllIndex, alldex)
    }

    pub fn load_type_index(&self, entry_type: EntryType) -> Result<Option<TypeIndex>, StoreError> {
        self.load(Document::Type(entry_type))
    }

    pub fn save_type_index(
        &self,
        entry_type: EntryType,
        index: &TypeIndex,
    ) -> Result<(), StoreError> {
        self.save(Document::Type(entry_type), index)
    }

    fn load<T: DeserializeOwned>(&self, document: Document) -> Result<Option<T>, StoreError> {
        let Some(value) = self.inner.get(document)? else {
            return Ok(None);
        };
        if !value.is_object() {
            return Err(StoreError::Shape {
                document,
                message: "expected a JSON object at the root".to_string(),
            });
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| StoreError::Shape {
                document,
                message: err.to_string(),
            })
    }

    fn save<T: Serialize>(&self, document: Document, data: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(data).map_err(|err| StoreError::Shape {
            document,
            message: err.to_string(),
        })?;
        self.inner.put(document, &sort_keys(value))
    }
}

/// Recursively order object keys so saved documents diff cleanly.
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, sort_keys(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Render a document the way it is stored on disk: two-space indentation,
/// sorted keys, trailing newline.
///
/// Non-ASCII text is written as raw UTF-8. Files last written by tools that
/// escape it as `\uXXXX` and omit the newline are rewritten in this form
/// on their first save; the JSON values are unchanged.
pub fn render_document(value: &Value) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec_pretty(&sort_keys(value.clone()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexEntry;
    use serde_json::json;

    #[test]
    fn document_file_names() {
        assert_eq!(Document::AllIndex.file_name(), "alldex.json");
        assert_eq!(Document::Type(EntryType::Candidate).file_name(), "candidate.json");
        assert_eq!(Document::Type(EntryType::Primary).to_string(), "primary.json");
    }

    #[test]
    fn render_writes_utf8_and_reads_escaped_input() {
        let escaped: Value = serde_json::from_str(r#"{"name":"\u753b\u50cf"}"#).unwrap();
        let text = String::from_utf8(render_document(&escaped).unwrap()).unwrap();
        assert_eq!(text, "{\n  \"name\": \"画像\"\n}\n");
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), escaped);
    }

    #[test]
    fn render_sorts_keys_recursively() {
        let value = json!({"b": {"z": 1, "a": 2}, "a": [ {"y": 1, "x": 2} ]});
        let text = String::from_utf8(render_document(&value).unwrap()).unwrap();
        let expected = "{\n  \"a\": [\n    {\n      \"x\": 2,\n      \"y\": 1\n    }\n  ],\n  \"b\": {\n    \"a\": 2,\n    \"z\": 1\n  }\n}\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn saved_entries_have_sorted_fields() {
        let store = IndexStore::new(MemoryStore::new());
        let mut index = TypeIndex::new();
        index.insert(
            "p1".to_string(),
            IndexEntry {
                name: "Tool".into(),
                versions: vec!["1.0".into()],
                ..Default::default()
            },
        );
        store.save_type_index(EntryType::Candidate, &index).unwrap();

        let raw = store
            .inner()
            .get(Document::Type(EntryType::Candidate))
            .unwrap()
            .unwrap();
        let keys: Vec<&String> = raw["p1"].as_object().unwrap().keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn non_object_root_is_shape_error() {
        let memory = MemoryStore::new();
        memory.put(Document::AllIndex, &json!(["a"])).unwrap();
        let store = IndexStore::new(memory);
        assert!(matches!(store.load_alldex(), Err(StoreError::Shape { .. })));
    }

    #[test]
    fn missing_document_loads_as_none() {
        let store = IndexStore::new(MemoryStore::new());
        assert!(store.load_alldex().unwrap().is_none());
        assert!(store.load_type_index(EntryType::Primary).unwrap().is_none());
    }
}
