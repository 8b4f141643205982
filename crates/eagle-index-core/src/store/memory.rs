//! In-memory document store for tests and dry runs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::{Document, DocumentStore, StoreError, sort_keys};

/// Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Arc<Mutex<BTreeMap<Document, Value>>>,
    failing_writes: Arc<Mutex<BTreeSet<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `put` of `document` fail with a write error.
    pub fn fail_writes(&self, document: Document) {
        lock(&self.failing_writes).insert(document);
    }

    pub fn contains(&self, document: Document) -> bool {
        lock(&self.documents).contains_key(&document)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DocumentStore for MemoryStore {
    type Lock = ();

    fn lock(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn get(&self, document: Document) -> Result<Option<Value>, StoreError> {
        Ok(lock(&self.documents).get(&document).cloned())
    }

    fn put(&self, document: Document, value: &Value) -> Result<(), StoreError> {
        if lock(&self.failing_writes).contains(&document) {
            return Err(StoreError::Write {
                path: document.file_name(),
                source: std::io::Error::other("write rejected"),
            });
        }
        lock(&self.documents).insert(document, sort_keys(value.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryType;
    use serde_json::json;

    #[test]
    fn clones_share_documents() {
        let store = MemoryStore::new();
        let clone = store.clone();
        store.put(Document::AllIndex, &json!({"a": "primary"})).unwrap();
        assert_eq!(clone.get(Document::AllIndex).unwrap(), Some(json!({"a": "primary"})));
    }

    #[test]
    fn failing_writes_leave_document_untouched() {
        let store = MemoryStore::new();
        let doc = Document::Type(EntryType::Primary);
        store.put(doc, &json!({"a": {}})).unwrap();
        store.fail_writes(doc);

        assert!(matches!(store.put(doc, &json!({})), Err(StoreError::Write { .. })));
        assert_eq!(store.get(doc).unwrap(), Some(json!({"a": {}})));
    }
}
