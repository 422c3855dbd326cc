//! Durable local tier backed by LMDB.
//!
//! Every fetch asks the source for the current change token and serves the
//! local copy only when it was stored under that same token. Entries are
//! keyed by `key 0x00 token`, so an upstream change simply misses and the new
//! copy replaces the stale one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use depot_core::{ChangeToken, DepotError, DepotResult, DEFAULT_UPSTREAM_TIMEOUT};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::traits::{CacheStats, Counters, Source, Tier};
use crate::timeout::bounded;

const KEY_SEPARATOR: u8 = 0x00;

/// Durable local tier over a [`Source`].
pub struct LocalTier<S> {
    env: Env,
    db: Database<Bytes, Bytes>,
    path: PathBuf,
    source: S,
    fetch_timeout: Duration,
    counters: Counters,
}

impl<S: Source> LocalTier<S> {
    /// Open (creating if needed) the local cache at `path`.
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize, source: S) -> DepotResult<Self> {
        let path = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path).map_err(|e| local_error(&path, e))?;

        // SAFETY: the environment is opened once per directory by this process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(&path)
        }
        .map_err(|e| local_error(&path, e))?;

        let mut wtxn = env.write_txn().map_err(|e| local_error(&path, e))?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| local_error(&path, e))?;
        wtxn.commit().map_err(|e| local_error(&path, e))?;

        Ok(Self {
            env,
            db,
            path,
            source,
            fetch_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            counters: Counters::default(),
        })
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Tokens currently persisted for `key`.
    pub fn stored_tokens(&self, key: &str) -> DepotResult<Vec<ChangeToken>> {
        let prefix = key_prefix(key);
        Ok(self
            .keys_with_prefix(&prefix)?
            .into_iter()
            .map(|entry| ChangeToken::new(String::from_utf8_lossy(&entry[prefix.len()..])))
            .collect())
    }

    fn read(&self, entry: &[u8]) -> DepotResult<Option<Vec<u8>>> {
        let rtxn = self.env.read_txn().map_err(|e| local_error(&self.path, e))?;
        let value = self
            .db
            .get(&rtxn, entry)
            .map_err(|e| local_error(&self.path, e))?;
        Ok(value.map(<[u8]>::to_vec))
    }

    fn keys_with_prefix(&self, prefix: &[u8]) -> DepotResult<Vec<Vec<u8>>> {
        let rtxn = self.env.read_txn().map_err(|e| local_error(&self.path, e))?;
        let iter = self
            .db
            .prefix_iter(&rtxn, prefix)
            .map_err(|e| local_error(&self.path, e))?;

        let mut keys = Vec::new();
        for result in iter {
            let (key, _) = result.map_err(|e| local_error(&self.path, e))?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    /// Store `value` under `(key, token)` and drop copies stored under any
    /// other token for the same key.
    fn persist(&self, key: &str, token: &ChangeToken, value: &[u8]) -> DepotResult<()> {
        let fresh = entry_key(key, token);
        let stale: Vec<Vec<u8>> = self
            .keys_with_prefix(&key_prefix(key))?
            .into_iter()
            .filter(|entry| *entry != fresh)
            .collect();

        let mut wtxn = self.env.write_txn().map_err(|e| local_error(&self.path, e))?;
        self.db
            .put(&mut wtxn, &fresh, value)
            .map_err(|e| local_error(&self.path, e))?;
        for entry in &stale {
            self.db
                .delete(&mut wtxn, entry)
                .map_err(|e| local_error(&self.path, e))?;
        }
        wtxn.commit().map_err(|e| local_error(&self.path, e))?;
        Ok(())
    }

    fn entry_count(&self) -> u64 {
        self.env
            .read_txn()
            .ok()
            .and_then(|rtxn| self.db.len(&rtxn).ok())
            .unwrap_or(0)
    }
}

fn key_prefix(key: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(key.len() + 1);
    prefix.extend_from_slice(key.as_bytes());
    prefix.push(KEY_SEPARATOR);
    prefix
}

fn entry_key(key: &str, token: &ChangeToken) -> Vec<u8> {
    let mut entry = key_prefix(key);
    entry.extend_from_slice(token.as_str().as_bytes());
    entry
}

fn local_error(path: &Path, err: impl std::fmt::Display) -> DepotError {
    DepotError::LocalCache {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl<S: Source> Tier for LocalTier<S> {
    async fn fetch(&self, key: &str) -> DepotResult<Vec<u8>> {
        let token = bounded("check_source", self.fetch_timeout, self.source.check_source(key)).await?;

        match self.read(&entry_key(key, &token)) {
            Ok(Some(value)) => {
                self.counters.hit();
                tracing::debug!(key = %key, token = %token, "Local tier hit");
                return Ok(value);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "Local tier read failed, treating as miss"),
        }

        self.counters.miss();
        tracing::debug!(key = %key, token = %token, "Local tier miss");
        let (value, fresh) = bounded(
            "fetch_from_source",
            self.fetch_timeout,
            self.source.fetch_from_source(key),
        )
        .await?;

        if let Err(e) = self.persist(key, &fresh, &value) {
            tracing::warn!(key = %key, error = %e, "Failed to persist local copy");
        }
        Ok(value)
    }

    fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.entry_count())
    }
}
