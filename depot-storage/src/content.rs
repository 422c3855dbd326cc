//! Content store port and the in-memory adapter.
//!
//! The port mirrors an object-storage bucket: idempotent overwrite, full
//! fetch, cheap existence probe returning the change token, and a
//! prefix/delimiter/marker listing.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use async_trait::async_trait;
use depot_core::{ChangeToken, StoreError, StoreResult, StoredObject};

// ============================================================================
// LISTING TYPES
// ============================================================================

/// One listing call against a content store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Only keys starting with this prefix are considered.
    pub prefix: String,
    /// When set, keys with this delimiter after the prefix are rolled up into
    /// common prefixes.
    pub delimiter: Option<char>,
    /// Continuation marker: only entries strictly after it are returned.
    pub marker: Option<String>,
    /// Maximum number of entries (keys plus common prefixes) per page.
    pub max_keys: usize,
}

impl ListRequest {
    pub fn new(prefix: impl Into<String>, max_keys: usize) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: None,
            marker: None,
            max_keys,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_marker(mut self, marker: Option<String>) -> Self {
        self.marker = marker;
        self
    }
}

/// One page of raw listing output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListOutput {
    /// Full keys, in lexicographic order.
    pub keys: Vec<String>,
    /// Rolled-up prefixes including the trailing delimiter.
    pub common_prefixes: Vec<String>,
    /// True iff more entries exist after this page.
    pub is_truncated: bool,
    /// Last entry of this page when truncated.
    pub next_marker: Option<String>,
}

/// Content store abstraction.
///
/// Implementations must be safe for concurrent use; no per-key locking is
/// expected (writes are last-write-wins).
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Write bytes under `key`, replacing any existing value.
    async fn put(&self, key: &str, body: Vec<u8>) -> StoreResult<ChangeToken>;

    /// Read bytes under `key`. Missing keys are `StoreError::NotFound`.
    async fn get(&self, key: &str) -> StoreResult<StoredObject>;

    /// Existence probe returning the change token without the body.
    async fn head(&self, key: &str) -> StoreResult<ChangeToken>;

    /// List one page of keys.
    async fn list(&self, request: &ListRequest) -> StoreResult<ListOutput>;
}

/// Build a listing page from keys in ascending order.
///
/// Shared by adapters that hold (or can enumerate) their whole keyspace.
/// Keys not starting with the request prefix are ignored.
pub fn page_sorted_keys<'a, I>(keys: I, request: &ListRequest) -> ListOutput
where
    I: IntoIterator<Item = &'a str>,
{
    let max_keys = request.max_keys.max(1);
    let marker = request.marker.as_deref();
    let mut output = ListOutput::default();
    let mut entries = 0usize;

    for key in keys {
        if !key.starts_with(&request.prefix) {
            continue;
        }
        if marker.is_some_and(|m| key <= m) {
            continue;
        }

        let rollup = request.delimiter.and_then(|delimiter| {
            key[request.prefix.len()..]
                .find(delimiter)
                .map(|idx| &key[..request.prefix.len() + idx + delimiter.len_utf8()])
        });

        match rollup {
            Some(common) => {
                // Emitted on an earlier page, or already on this one.
                if marker.is_some_and(|m| common <= m)
                    || output.common_prefixes.last().map(String::as_str) == Some(common)
                {
                    continue;
                }
                if entries == max_keys {
                    output.is_truncated = true;
                    break;
                }
                output.common_prefixes.push(common.to_string());
                output.next_marker = Some(common.to_string());
            }
            None => {
                if entries == max_keys {
                    output.is_truncated = true;
                    break;
                }
                output.keys.push(key.to_string());
                output.next_marker = Some(key.to_string());
            }
        }
        entries += 1;
    }

    if !output.is_truncated {
        output.next_marker = None;
    }
    output
}

// ============================================================================
// IN-MEMORY ADAPTER
// ============================================================================

/// In-memory content store for tests and embedded use.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get count of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys in lexicographic order.
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn poisoned() -> StoreError {
    StoreError::backend("content store lock poisoned")
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> StoreResult<ChangeToken> {
        let token = ChangeToken::for_content(&body);
        let mut objects = self.objects.write().map_err(|_| poisoned())?;
        objects.insert(
            key.to_string(),
            StoredObject {
                body,
                token: token.clone(),
                version: None,
            },
        );
        Ok(token)
    }

    async fn get(&self, key: &str) -> StoreResult<StoredObject> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        objects.get(key).cloned().ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })
    }

    async fn head(&self, key: &str) -> StoreResult<ChangeToken> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        objects
            .get(key)
            .map(|object| object.token.clone())
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }

    async fn list(&self, request: &ListRequest) -> StoreResult<ListOutput> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        let start = match request.marker.as_deref() {
            Some(marker) if marker > request.prefix.as_str() => marker,
            _ => request.prefix.as_str(),
        };
        let keys = objects
            .range::<str, _>((Bound::Included(start), Bound::Unbounded))
            .map(|(key, _)| key.as_str())
            .take_while(|key| key.starts_with(&request.prefix));
        Ok(page_sorted_keys(keys, request))
    }
}
