//! On-disk layout and locking for the file-backed store.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use fs2::FileExt;
use serde_json::Value;
use tracing::{debug, warn};

use tessera_core::{CollectionName, Fields, Record, RecordId, Result, StoreError, doc_path};

use crate::index::CompositeIndex;

fn invalid_data(path: &Path, err: serde_json::Error) -> StoreError {
    StoreError::InvalidData {
        message: format!("{}: {}", path.display(), err),
    }
}

/// Filesystem storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

/// Advisory lock held until dropped.
pub(crate) struct FileLock {
    file: File,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl FileStore {
    /// Create a store at the given root directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, collection: &CollectionName) -> PathBuf {
        self.root.join("collections").join(collection.as_str())
    }

    fn record_path(&self, collection: &CollectionName, id: &RecordId) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.json", id.as_str()))
    }

    fn indexes_path(&self) -> PathBuf {
        self.root.join("indexes.json")
    }

    /// The store's clock, as written into server-timestamp fields.
    pub(crate) fn now() -> Value {
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    // ========================================================================
    // Locking
    // ========================================================================

    fn open_lock(&self, collection: &CollectionName) -> Result<File> {
        let dir = self.collection_dir(collection);
        fs::create_dir_all(&dir)?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(dir.join(".lock"))?;
        Ok(file)
    }

    /// Lock a collection for reading. Returns `None` if the collection has
    /// never been written.
    pub(crate) fn lock_shared(&self, collection: &CollectionName) -> Result<Option<FileLock>> {
        if !self.collection_dir(collection).exists() {
            return Ok(None);
        }
        let file = self.open_lock(collection)?;
        file.lock_shared()?;
        Ok(Some(FileLock { file }))
    }

    /// Lock a collection for writing.
    pub(crate) fn lock_exclusive(&self, collection: &CollectionName) -> Result<FileLock> {
        let file = self.open_lock(collection)?;
        file.lock_exclusive()?;
        Ok(FileLock { file })
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Read one document, or `None` if it does not exist.
    pub(crate) fn read_fields(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<Option<Fields>> {
        let path = self.record_path(collection, id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let fields = serde_json::from_str(&content).map_err(|e| invalid_data(&path, e))?;
        Ok(Some(fields))
    }

    /// Read one document, failing with `NotFound` if it does not exist.
    pub(crate) fn require_fields(&self, collection: &CollectionName, id: &RecordId) -> Result<Fields> {
        self.read_fields(collection, id)?
            .ok_or_else(|| StoreError::NotFound {
                path: doc_path(collection, id),
            })
    }

    /// Load every document of a collection, in id order.
    pub(crate) fn load_collection(&self, collection: &CollectionName) -> Result<Vec<Record>> {
        let dir = self.collection_dir(collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<RecordId> = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match RecordId::new(stem) {
                Ok(id) => ids.push(id),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable document"),
            }
        }
        ids.sort();

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            // A concurrent delete between listing and reading is not an error.
            if let Some(fields) = self.read_fields(collection, &id)? {
                records.push(Record::new(id, fields));
            }
        }
        Ok(records)
    }

    /// Write one document via a temp file and rename.
    pub(crate) fn write_fields(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        fields: &Fields,
    ) -> Result<()> {
        let path = self.record_path(collection, id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.stage(&path, fields)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn stage(&self, path: &Path, fields: &Fields) -> Result<PathBuf> {
        let content = serde_json::to_string_pretty(fields).map_err(|e| invalid_data(path, e))?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        Ok(temp_path)
    }

    /// Replace several documents of one collection so that either all of
    /// them change or none do.
    ///
    /// `writes` pairs each id with its original and its new fields. Every
    /// new version is staged before any original is replaced; if a rename
    /// fails, the documents already replaced are restored from their
    /// originals.
    pub(crate) fn write_batch(
        &self,
        collection: &CollectionName,
        writes: &[(RecordId, Fields, Fields)],
    ) -> Result<()> {
        let mut staged = Vec::with_capacity(writes.len());
        for (id, _, updated) in writes {
            let path = self.record_path(collection, id);
            match self.stage(&path, updated) {
                Ok(temp_path) => staged.push((temp_path, path)),
                Err(err) => {
                    discard(staged.iter().map(|(temp, _)| temp.as_path()));
                    return Err(err);
                }
            }
        }

        for (n, (temp_path, path)) in staged.iter().enumerate() {
            if let Err(err) = fs::rename(temp_path, path) {
                warn!(%collection, failed_at = n, error = %err, "Batch write failed, restoring");
                discard(staged[n..].iter().map(|(temp, _)| temp.as_path()));
                for (id, original, _) in &writes[..n] {
                    if let Err(restore_err) = self.write_fields(collection, id, original) {
                        warn!(path = %doc_path(collection, id), error = %restore_err, "Could not restore document");
                    }
                }
                return Err(err.into());
            }
        }

        debug!(%collection, count = writes.len(), "Committed batch");
        Ok(())
    }

    /// Remove one document. Returns false if it did not exist.
    pub(crate) fn remove(&self, collection: &CollectionName, id: &RecordId) -> Result<bool> {
        let path = self.record_path(collection, id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// Read the declared composite indexes.
    pub(crate) fn read_indexes(&self) -> Result<Vec<CompositeIndex>> {
        let path = self.indexes_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| invalid_data(&path, e))
    }

    pub(crate) fn write_indexes(&self, indexes: &[CompositeIndex]) -> Result<()> {
        let path = self.indexes_path();
        fs::create_dir_all(&self.root)?;
        let content = serde_json::to_string_pretty(indexes).map_err(|e| invalid_data(&path, e))?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    /// Lock guarding `indexes.json`.
    pub(crate) fn lock_indexes(&self) -> Result<FileLock> {
        fs::create_dir_all(&self.root)?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.root.join("indexes.lock"))?;
        file.lock_exclusive()?;
        Ok(FileLock { file })
    }
}

fn discard<'a>(paths: impl Iterator<Item = &'a Path>) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}
