//! Filesystem-backed content store.
//!
//! Layout under the root directory:
//!
//! - `objects/<key>`: object bytes, one file per key
//! - `etags/<key>`: hex change token of the matching object
//! - `tmp/`: staging area; writes land here and are renamed into place
//!
//! Renames within one filesystem are atomic, so readers never observe a
//! partially written object.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use depot_core::{ChangeToken, StoreError, StoreResult, StoredObject, PATH_DELIMITER};
use tokio::fs;

use crate::content::{page_sorted_keys, ContentStore, ListOutput, ListRequest};

const OBJECTS_DIR: &str = "objects";
const ETAGS_DIR: &str = "etags";
const TMP_DIR: &str = "tmp";

/// Content store writing one file per key below a root directory.
#[derive(Debug)]
pub struct FsContentStore {
    root: PathBuf,
    staged: AtomicU64,
}

impl FsContentStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        for dir in [OBJECTS_DIR, ETAGS_DIR, TMP_DIR] {
            fs::create_dir_all(root.join(dir))
                .await
                .map_err(|e| io_error(&root.join(dir).display().to_string(), e))?;
        }
        Ok(Self {
            root,
            staged: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> StoreResult<PathBuf> {
        Ok(self.root.join(OBJECTS_DIR).join(relative_path(key)?))
    }

    fn etag_path(&self, key: &str) -> StoreResult<PathBuf> {
        Ok(self.root.join(ETAGS_DIR).join(relative_path(key)?))
    }

    /// Write `bytes` to `dest` through a staged temp file.
    async fn write_atomic(&self, key: &str, dest: &Path, bytes: &[u8]) -> StoreResult<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await.map_err(|e| io_error(key, e))?;
        }
        let staged = self.root.join(TMP_DIR).join(format!(
            "{}-{}",
            std::process::id(),
            self.staged.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&staged, bytes).await.map_err(|e| io_error(key, e))?;
        if let Err(e) = fs::rename(&staged, dest).await {
            let _ = fs::remove_file(&staged).await;
            return Err(io_error(key, e));
        }
        Ok(())
    }

    /// Collect every key below `dir`, relative to the objects directory.
    async fn walk_keys(&self, dir: PathBuf) -> StoreResult<Vec<String>> {
        let objects = self.root.join(OBJECTS_DIR);
        let mut keys = Vec::new();
        let mut pending = vec![dir];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == IoErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(&dir.display().to_string(), e)),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| io_error(&dir.display().to_string(), e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| io_error(&path.display().to_string(), e))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&objects) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join(&PATH_DELIMITER.to_string());
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// Map a content key to a relative filesystem path, refusing anything that
/// could escape the store root.
fn relative_path(key: &str) -> StoreResult<PathBuf> {
    let mut path = PathBuf::new();
    for segment in key.split(PATH_DELIMITER) {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(StoreError::backend(format!("invalid content key {}", key)));
        }
        path.push(segment);
    }
    Ok(path)
}

fn io_error(key: &str, err: std::io::Error) -> StoreError {
    if err.kind() == IoErrorKind::NotFound {
        StoreError::NotFound {
            key: key.to_string(),
        }
    } else {
        StoreError::Backend {
            reason: format!("{}: {}", key, err),
        }
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> StoreResult<ChangeToken> {
        let token = ChangeToken::for_content(&body);
        let object_path = self.object_path(key)?;
        let etag_path = self.etag_path(key)?;

        self.write_atomic(key, &object_path, &body).await?;
        self.write_atomic(key, &etag_path, token.as_str().as_bytes())
            .await?;

        tracing::debug!(key = %key, token = %token, bytes = body.len(), "Stored object");
        Ok(token)
    }

    async fn get(&self, key: &str) -> StoreResult<StoredObject> {
        let body = fs::read(self.object_path(key)?)
            .await
            .map_err(|e| io_error(key, e))?;
        // Hash the bytes actually read so body and token always agree.
        let token = ChangeToken::for_content(&body);
        Ok(StoredObject {
            body,
            token,
            version: None,
        })
    }

    async fn head(&self, key: &str) -> StoreResult<ChangeToken> {
        match fs::read_to_string(self.etag_path(key)?).await {
            Ok(token) => Ok(ChangeToken::new(token.trim())),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                // Objects written without an etag sidecar still answer.
                let object = self.get(key).await?;
                Ok(object.token)
            }
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn list(&self, request: &ListRequest) -> StoreResult<ListOutput> {
        // Only walk the directory the prefix can live under.
        let base = match request.prefix.rfind(PATH_DELIMITER) {
            Some(idx) => self.object_path(&request.prefix[..idx])?,
            None => self.root.join(OBJECTS_DIR),
        };
        let keys = self.walk_keys(base).await?;
        Ok(page_sorted_keys(keys.iter().map(String::as_str), request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (FsContentStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = FsContentStore::open(temp_dir.path())
            .await
            .expect("store creation should succeed");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (store, _dir) = create_test_store().await;
        let token = store
            .put("fun/foo.obj/123abc", b"wonderful magic content".to_vec())
            .await
            .expect("put should succeed");

        let object = store.get("fun/foo.obj/123abc").await.expect("get should succeed");
        assert_eq!(object.body, b"wonderful magic content");
        assert_eq!(object.token, token);
        assert_eq!(store.head("fun/foo.obj/123abc").await.expect("head"), token);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_bytes_and_token() {
        let (store, _dir) = create_test_store().await;
        let first = store.put("a/b/v1", b"one".to_vec()).await.expect("put");
        let second = store.put("a/b/v1", b"two".to_vec()).await.expect("put");
        assert_ne!(first, second);
        assert_eq!(store.head("a/b/v1").await.expect("head"), second);
        assert_eq!(store.get("a/b/v1").await.expect("get").body, b"two");
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let (store, _dir) = create_test_store().await;
        assert!(store.get("a/b/v1").await.expect_err("missing").is_not_found());
        assert!(store.head("a/b/v1").await.expect_err("missing").is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let (store, _dir) = create_test_store().await;
        let err = store
            .put("../escape", b"x".to_vec())
            .await
            .expect_err("traversal must be refused");
        assert!(!err.is_not_found());
        assert!(store.put("a//b", b"x".to_vec()).await.is_err());
    }

    #[tokio::test]
    async fn test_list_hierarchy() {
        let (store, _dir) = create_test_store().await;
        for key in ["dang/fun/a.obj/v1", "dang/fun/a.obj/v2", "dang/fun/b.obj/v1", "dang/work/c.obj/v1"] {
            store.put(key, key.as_bytes().to_vec()).await.expect("put");
        }

        let categories = store
            .list(&ListRequest::new("dang/", 100).with_delimiter('/'))
            .await
            .expect("list");
        assert_eq!(categories.common_prefixes, vec!["dang/fun/", "dang/work/"]);

        let versions = store
            .list(&ListRequest::new("dang/fun/a.obj/", 100))
            .await
            .expect("list");
        assert_eq!(versions.keys, vec!["dang/fun/a.obj/v1", "dang/fun/a.obj/v2"]);

        let nothing = store
            .list(&ListRequest::new("dang/none/", 100).with_delimiter('/'))
            .await
            .expect("list of absent prefix");
        assert!(nothing.keys.is_empty() && nothing.common_prefixes.is_empty());
    }

    #[tokio::test]
    async fn test_staging_area_is_not_listed() {
        let (store, _dir) = create_test_store().await;
        store.put("a/b/v1", b"x".to_vec()).await.expect("put");
        let all = store.list(&ListRequest::new("", 100)).await.expect("list");
        assert_eq!(all.keys, vec!["a/b/v1"]);
    }
}
