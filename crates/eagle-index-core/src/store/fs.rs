//! Filesystem-backed document store
//!
//! Documents live as `<root>/<name>.json`. Writes go through a temp file in
//! the same directory and are renamed into place; read-modify-write sections
//! serialize on an advisory lock over `<root>/.index.lock`.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use serde_json::Value;
use tempfile::NamedTempFile;

use super::{Document, DocumentStore, StoreError, render_document};

const LOCK_FILE: &str = ".index.lock";

#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

/// Exclusive hold on the index directory; released on drop.
#[derive(Debug)]
pub struct FsLock {
    _file: File,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, document: Document) -> PathBuf {
        self.root.join(document.file_name())
    }

    fn ensure_root(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Write {
            path: self.root.display().to_string(),
            source,
        })
    }
}

impl DocumentStore for FsStore {
    type Lock = FsLock;

    fn lock(&self) -> Result<FsLock, StoreError> {
        self.ensure_root()?;
        let path = self.root.join(LOCK_FILE);
        let lock_err = |source| StoreError::Lock {
            path: path.display().to_string(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(lock_err)?;
        file.lock_exclusive().map_err(lock_err)?;

        tracing::trace!(path = %path.display(), "acquired index lock");
        Ok(FsLock { _file: file })
    }

    fn get(&self, document: Document) -> Result<Option<Value>, StoreError> {
        let path = self.path(document);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(|source| StoreError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let value = serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Some(value))
    }

    fn put(&self, document: Document, value: &Value) -> Result<(), StoreError> {
        self.ensure_root()?;
        let path = self.path(document);
        let write_err = |source| StoreError::Write {
            path: path.display().to_string(),
            source,
        };

        let bytes = render_document(value).map_err(|err| StoreError::Shape {
            document,
            message: err.to_string(),
        })?;

        let mut tmp = NamedTempFile::new_in(&self.root).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.flush().map_err(write_err)?;
        tmp.persist(&path).map_err(|err| write_err(err.error))?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_as_none() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path().join("index"));
        assert!(store.get(Document::AllIndex).unwrap().is_none());
    }

    #[test]
    fn put_creates_directory_and_writes_pretty_sorted_json() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path().join("index"));

        store
            .put(Document::AllIndex, &json!({"zeta": "primary", "alpha": "candidate"}))
            .unwrap();

        let text = fs::read_to_string(store.path(Document::AllIndex)).unwrap();
        assert_eq!(text, "{\n  \"alpha\": \"candidate\",\n  \"zeta\": \"primary\"\n}\n");
        assert_eq!(
            store.get(Document::AllIndex).unwrap(),
            Some(json!({"alpha": "candidate", "zeta": "primary"}))
        );
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path());
        fs::write(store.path(Document::AllIndex), "{ broken").unwrap();

        assert!(matches!(
            store.get(Document::AllIndex),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn lock_can_be_reacquired_after_drop() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path());

        let first = store.lock().unwrap();
        drop(first);
        let _second = store.lock().unwrap();
        assert!(temp.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn no_temp_files_left_behind() {
        let temp = TempDir::new().unwrap();
        let store = FsStore::new(temp.path());
        store.put(Document::Type(crate::types::EntryType::Candidate), &json!({})).unwrap();

        let names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["candidate.json".to_string()]);
    }
}
