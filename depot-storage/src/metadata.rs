//! Metadata store port and adapters.
//!
//! The metadata store is a keyed table of [`VersionPointer`] records, one per
//! object path. `put_item` replaces the whole record; callers merge fields
//! themselves before writing.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use depot_core::{StoreError, StoreResult, VersionPointer};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

/// Pointer table abstraction.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch the record for `name`, or `None` when absent.
    async fn get_item(&self, name: &str) -> StoreResult<Option<VersionPointer>>;

    /// Write a full record, replacing any existing one with the same name.
    async fn put_item(&self, pointer: &VersionPointer) -> StoreResult<()>;
}

#[async_trait]
impl<M: MetadataStore + ?Sized> MetadataStore for Arc<M> {
    async fn get_item(&self, name: &str) -> StoreResult<Option<VersionPointer>> {
        (**self).get_item(name).await
    }

    async fn put_item(&self, pointer: &VersionPointer) -> StoreResult<()> {
        (**self).put_item(pointer).await
    }
}

// ============================================================================
// IN-MEMORY ADAPTER
// ============================================================================

/// In-memory pointer table for tests and embedded use.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadataStore {
    items: Arc<RwLock<HashMap<String, VersionPointer>>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn get_item(&self, name: &str) -> StoreResult<Option<VersionPointer>> {
        let items = self
            .items
            .read()
            .map_err(|_| StoreError::backend("metadata store lock poisoned"))?;
        Ok(items.get(name).cloned())
    }

    async fn put_item(&self, pointer: &VersionPointer) -> StoreResult<()> {
        let mut items = self
            .items
            .write()
            .map_err(|_| StoreError::backend("metadata store lock poisoned"))?;
        items.insert(pointer.name.clone(), pointer.clone());
        Ok(())
    }
}

// ============================================================================
// LMDB ADAPTER
// ============================================================================

/// LMDB-backed pointer table.
///
/// Records are stored as JSON under the UTF-8 bytes of the object path. Each
/// `put_item` is a single write transaction.
pub struct LmdbMetadataStore {
    env: Env,
    db: Database<Bytes, Bytes>,
}

impl LmdbMetadataStore {
    /// Open (creating if needed) a pointer table.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> StoreResult<Self> {
        std::fs::create_dir_all(&path)
            .map_err(|e| StoreError::backend(format!("create {}: {}", path.as_ref().display(), e)))?;

        // SAFETY: the environment is opened once per directory by this process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| StoreError::backend(format!("open LMDB environment: {}", e)))?;

        let mut wtxn = env.write_txn().map_err(txn_error)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| StoreError::backend(format!("open database: {}", e)))?;
        wtxn.commit().map_err(txn_error)?;

        Ok(Self { env, db })
    }
}

fn txn_error(err: heed::Error) -> StoreError {
    match err {
        // Readers table or map full: the write may succeed once space frees up.
        heed::Error::Mdb(heed::MdbError::ReadersFull) | heed::Error::Mdb(heed::MdbError::MapFull) => {
            StoreError::Throttled {
                reason: err.to_string(),
            }
        }
        other => StoreError::backend(format!("transaction error: {}", other)),
    }
}

#[async_trait]
impl MetadataStore for LmdbMetadataStore {
    async fn get_item(&self, name: &str) -> StoreResult<Option<VersionPointer>> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        match self.db.get(&rtxn, name.as_bytes()).map_err(txn_error)? {
            Some(bytes) => serde_json::from_slice(bytes)
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    key: name.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    async fn put_item(&self, pointer: &VersionPointer) -> StoreResult<()> {
        let value = serde_json::to_vec(pointer)
            .map_err(|e| StoreError::backend(format!("serialize pointer: {}", e)))?;

        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        self.db
            .put(&mut wtxn, pointer.name.as_bytes(), &value)
            .map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;

        tracing::debug!(name = %pointer.name, "Stored version pointer");
        Ok(())
    }
}
