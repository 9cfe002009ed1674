//! File-backed storage for the document server.
//!
//! ```text
//! <DATA_DIR>/
//!   collections/
//!     items.json            {"revision": 3, "documents": [{"id": ..., "body": ...}]}
//!     order_meta.json
//!   blobs/
//!     data/items.blob
//!     data/items.rev
//! ```
//!
//! Every write bumps the revision of the collection or blob it touches. A
//! write that names an expected revision fails with [`ServerStorageError::Conflict`]
//! when the stored revision differs. Callers serialize access; the storage
//! itself holds no locks.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shopdesk_core::remote::protocol::DocumentEntry;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Errors that can occur during server storage operations.
#[derive(Debug)]
pub enum ServerStorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// A stored collection file is not valid JSON.
    ParseError(PathBuf, serde_json::Error),
    /// Collection name, document id or blob path rejected.
    InvalidName(String),
    /// The stored revision is not the one the writer expected.
    Conflict { expected: u64, found: u64 },
}

impl std::fmt::Display for ServerStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            ServerStorageError::ParseError(path, e) => {
                write!(f, "Failed to parse {}: {}", path.display(), e)
            }
            ServerStorageError::InvalidName(name) => write!(f, "Invalid name: {}", name),
            ServerStorageError::Conflict { expected, found } => {
                write!(f, "Revision conflict: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for ServerStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerStorageError::IoError(_, e) => Some(e),
            ServerStorageError::ParseError(_, e) => Some(e),
            _ => None,
        }
    }
}

/// On-disk form of a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredCollection {
    pub revision: u64,
    pub documents: Vec<DocumentEntry>,
}

impl StoredCollection {
    fn find(&self, id: &str) -> Option<&DocumentEntry> {
        self.documents.iter().find(|d| d.id == id)
    }
}

#[derive(Debug, Clone)]
pub struct ServerStorage {
    data_dir: PathBuf,
}

impl ServerStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Rejects names that could escape the data directory.
    fn validate_name(name: &str) -> Result<(), ServerStorageError> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.starts_with('.')
        {
            return Err(ServerStorageError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    fn check_revision(expected: Option<u64>, found: u64) -> Result<(), ServerStorageError> {
        match expected {
            Some(expected) if expected != found => {
                Err(ServerStorageError::Conflict { expected, found })
            }
            _ => Ok(()),
        }
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.data_dir
            .join("collections")
            .join(format!("{}.json", name))
    }

    /// Blob paths are `/`-separated; each segment is validated on its own.
    fn blob_paths(&self, path: &str) -> Result<(PathBuf, PathBuf), ServerStorageError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(ServerStorageError::InvalidName(path.to_string()));
        }
        let mut base = self.data_dir.join("blobs");
        for segment in &segments {
            Self::validate_name(segment)?;
            base.push(segment);
        }
        Ok((with_suffix(&base, ".blob"), with_suffix(&base, ".rev")))
    }

    /// Loads a collection; a missing one is empty at revision 0.
    pub fn load_collection(&self, name: &str) -> Result<StoredCollection, ServerStorageError> {
        Self::validate_name(name)?;
        let path = self.collection_path(name);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ServerStorageError::ParseError(path, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(StoredCollection::default()),
            Err(e) => Err(ServerStorageError::IoError(path, e)),
        }
    }

    fn save_collection(
        &self,
        name: &str,
        collection: &StoredCollection,
    ) -> Result<(), ServerStorageError> {
        let path = self.collection_path(name);
        let bytes = serde_json::to_vec(collection)
            .map_err(|e| ServerStorageError::ParseError(path.clone(), e))?;
        write_atomic(&path, &bytes)
    }

    /// Replaces every document of a collection.
    pub fn replace_collection(
        &self,
        name: &str,
        documents: Vec<DocumentEntry>,
        expected: Option<u64>,
    ) -> Result<u64, ServerStorageError> {
        for document in &documents {
            if document.id.is_empty() {
                return Err(ServerStorageError::InvalidName(document.id.clone()));
            }
        }
        let mut collection = self.load_collection(name)?;
        Self::check_revision(expected, collection.revision)?;
        collection.documents = documents;
        collection.revision += 1;
        self.save_collection(name, &collection)?;
        Ok(collection.revision)
    }

    /// Returns one document body and the collection revision.
    pub fn get_document(
        &self,
        name: &str,
        id: &str,
    ) -> Result<(Option<Value>, u64), ServerStorageError> {
        let collection = self.load_collection(name)?;
        let body = collection.find(id).map(|d| d.body.clone());
        Ok((body, collection.revision))
    }

    /// Inserts or overwrites one document.
    pub fn put_document(
        &self,
        name: &str,
        id: &str,
        body: Value,
        expected: Option<u64>,
    ) -> Result<u64, ServerStorageError> {
        if id.is_empty() {
            return Err(ServerStorageError::InvalidName(id.to_string()));
        }
        let mut collection = self.load_collection(name)?;
        Self::check_revision(expected, collection.revision)?;
        match collection.documents.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.body = body,
            None => collection.documents.push(DocumentEntry {
                id: id.to_string(),
                body,
            }),
        }
        collection.revision += 1;
        self.save_collection(name, &collection)?;
        Ok(collection.revision)
    }

    /// Removes one document. Deleting a missing document changes nothing.
    pub fn delete_document(
        &self,
        name: &str,
        id: &str,
        expected: Option<u64>,
    ) -> Result<u64, ServerStorageError> {
        let mut collection = self.load_collection(name)?;
        Self::check_revision(expected, collection.revision)?;
        let before = collection.documents.len();
        collection.documents.retain(|d| d.id != id);
        if collection.documents.len() == before {
            return Ok(collection.revision);
        }
        collection.revision += 1;
        self.save_collection(name, &collection)?;
        Ok(collection.revision)
    }

    /// Returns the blob bytes and revision, or `None` if never written.
    pub fn load_blob(&self, path: &str) -> Result<Option<(Vec<u8>, u64)>, ServerStorageError> {
        let (blob_path, rev_path) = self.blob_paths(path)?;
        let bytes = match fs::read(&blob_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ServerStorageError::IoError(blob_path, e)),
        };
        Ok(Some((bytes, read_revision(&rev_path)?)))
    }

    /// Writes a blob. `expected` of 0 means the blob must not exist yet.
    pub fn save_blob(
        &self,
        path: &str,
        bytes: &[u8],
        expected: Option<u64>,
    ) -> Result<u64, ServerStorageError> {
        let (blob_path, rev_path) = self.blob_paths(path)?;
        let current = if blob_path.exists() {
            read_revision(&rev_path)?
        } else {
            0
        };
        Self::check_revision(expected, current)?;

        let revision = current + 1;
        write_atomic(&blob_path, bytes)?;
        write_atomic(&rev_path, revision.to_string().as_bytes())?;
        Ok(revision)
    }
}

fn read_revision(path: &Path) -> Result<u64, ServerStorageError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text.trim().parse().unwrap_or(0)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(ServerStorageError::IoError(path.to_path_buf(), e)),
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Writes through a temp file and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ServerStorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| ServerStorageError::IoError(parent.to_path_buf(), e))?;
    }

    let temp_path = with_suffix(path, ".tmp");
    let mut file =
        File::create(&temp_path).map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;
    file.write_all(bytes)
        .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;
    file.sync_all()
        .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;

    fs::rename(&temp_path, path).map_err(|e| ServerStorageError::IoError(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn entry(id: &str, name: &str) -> DocumentEntry {
        DocumentEntry {
            id: id.to_string(),
            body: json!({"id": id, "name": name}),
        }
    }

    #[test]
    fn test_validate_name() {
        assert!(ServerStorage::validate_name("items").is_ok());
        assert!(ServerStorage::validate_name("order_meta").is_ok());
        assert!(ServerStorage::validate_name("").is_err());
        assert!(ServerStorage::validate_name("../etc").is_err());
        assert!(ServerStorage::validate_name("a/b").is_err());
        assert!(ServerStorage::validate_name("a\\b").is_err());
        assert!(ServerStorage::validate_name(".hidden").is_err());
    }

    #[test]
    fn test_missing_collection_is_empty() {
        let temp_dir = tempdir().unwrap();
        let storage = ServerStorage::new(temp_dir.path());

        let collection = storage.load_collection("items").unwrap();
        assert_eq!(collection, StoredCollection::default());
        assert_eq!(storage.get_document("items", "x").unwrap(), (None, 0));
    }

    #[test]
    fn test_put_get_delete_document() {
        let temp_dir = tempdir().unwrap();
        let storage = ServerStorage::new(temp_dir.path());

        assert_eq!(
            storage
                .put_document("categories", "c1", json!({"name": "Drinks"}), None)
                .unwrap(),
            1
        );
        assert_eq!(
            storage.get_document("categories", "c1").unwrap(),
            (Some(json!({"name": "Drinks"})), 1)
        );

        assert_eq!(storage.delete_document("categories", "c1", None).unwrap(), 2);
        assert_eq!(storage.delete_document("categories", "c1", None).unwrap(), 2);
        assert_eq!(storage.get_document("categories", "c1").unwrap(), (None, 2));
    }

    #[test]
    fn test_replace_checks_revision() {
        let temp_dir = tempdir().unwrap();
        let storage = ServerStorage::new(temp_dir.path());

        let rev = storage
            .replace_collection("items", vec![entry("a", "A")], Some(0))
            .unwrap();
        assert_eq!(rev, 1);

        let err = storage
            .replace_collection("items", vec![entry("b", "B")], Some(0))
            .unwrap_err();
        assert!(matches!(
            err,
            ServerStorageError::Conflict {
                expected: 0,
                found: 1
            }
        ));

        storage
            .replace_collection("items", vec![entry("b", "B")], Some(1))
            .unwrap();
        let collection = storage.load_collection("items").unwrap();
        assert_eq!(collection.revision, 2);
        assert_eq!(collection.documents, vec![entry("b", "B")]);
    }

    #[test]
    fn test_collections_are_isolated() {
        let temp_dir = tempdir().unwrap();
        let storage = ServerStorage::new(temp_dir.path());

        storage
            .put_document("customers", "x", json!({"n": 1}), None)
            .unwrap();
        assert!(storage.load_collection("suppliers").unwrap().documents.is_empty());
    }

    #[test]
    fn test_blob_revisions() {
        let temp_dir = tempdir().unwrap();
        let storage = ServerStorage::new(temp_dir.path());

        assert_eq!(storage.load_blob("data/items").unwrap(), None);
        assert_eq!(storage.save_blob("data/items", b"one", Some(0)).unwrap(), 1);
        assert!(storage.save_blob("data/items", b"two", Some(0)).is_err());
        assert_eq!(storage.save_blob("data/items", b"two", Some(1)).unwrap(), 2);
        assert_eq!(storage.save_blob("data/items", b"three", None).unwrap(), 3);

        assert_eq!(
            storage.load_blob("data/items").unwrap(),
            Some((b"three".to_vec(), 3))
        );
        assert!(temp_dir.path().join("blobs/data/items.blob").exists());
    }

    #[test]
    fn test_blob_path_traversal_rejected() {
        let temp_dir = tempdir().unwrap();
        let storage = ServerStorage::new(temp_dir.path());

        assert!(storage.save_blob("../escape", b"x", None).is_err());
        assert!(storage.save_blob("data/../../x", b"x", None).is_err());
        assert!(storage.load_blob("/").is_err());
    }
}
