//! Loose object database on the filesystem.

use crate::{GitObject, ObjectId, Result, StorageError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Content-addressed store of loose objects under `.git/objects`.
///
/// Writes are idempotent: content addressing means an existing file already
/// holds byte-identical data, so it is never rewritten.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Creates a store rooted at the given `objects` directory.
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: objects_dir.into(),
        }
    }

    /// Returns the `objects` directory this store reads and writes.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the loose-object path for an id: `objects/<aa>/<38-hex>`.
    pub fn path_for(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }

    /// Checks whether an object exists.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.path_for(id).is_file()
    }

    /// Stores an object, returning its id.
    ///
    /// The compressed bytes land in a temporary file in the fan-out directory
    /// and are renamed into place, so readers never observe a partial object.
    pub fn put(&self, object: &GitObject) -> Result<ObjectId> {
        let path = self.path_for(&object.id);
        if path.is_file() {
            return Ok(object.id);
        }

        let dir = path
            .parent()
            .ok_or_else(|| StorageError::InvalidObject(object.id.to_hex()))?;
        // Tolerates a concurrent writer creating the same fan-out directory.
        fs::create_dir_all(dir)?;

        let compressed = object.compress()?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&compressed)?;
        tmp.persist(&path).map_err(|e| e.error)?;

        tracing::trace!(id = %object.id, kind = %object.kind, "stored loose object");
        Ok(object.id)
    }

    /// Retrieves an object, verifying its content against the id.
    pub fn get(&self, id: &ObjectId) -> Result<GitObject> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(StorageError::ObjectNotFound(id.to_hex()));
        }

        let compressed = fs::read(&path)?;
        GitObject::decompress_verified(&compressed, id)
    }
}
