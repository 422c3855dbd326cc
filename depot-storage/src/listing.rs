//! Hierarchical listing over a flat content keyspace.
//!
//! Three levels are exposed: categories (first segment under the store
//! root), objects (second segment under a category) and versions (leaf
//! labels under an object). Continuation tokens are the content store's
//! own marker and are only meaningful against the same listing prefix.

use std::sync::Arc;
use std::time::Duration;

use depot_core::{DepotError, DepotResult, KeyScheme, ListPage, PATH_DELIMITER};

use crate::content::{ContentStore, ListOutput, ListRequest};
use crate::timeout::bounded_store;

/// Listing mode for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Roll keys up at the next delimiter and return group names.
    Grouped,
    /// Return raw leaf labels.
    Leaves,
}

pub struct Lister<C> {
    content: Arc<C>,
    scheme: KeyScheme,
    page_size: usize,
    call_timeout: Duration,
}

impl<C: ContentStore> Lister<C> {
    pub fn new(content: Arc<C>, scheme: KeyScheme, page_size: usize, call_timeout: Duration) -> Self {
        Self {
            content,
            scheme,
            page_size: page_size.max(1),
            call_timeout,
        }
    }

    /// First path segment under the store root.
    pub async fn list_categories(&self, token: Option<&str>) -> DepotResult<ListPage> {
        self.list(&self.scheme.root(), token, Mode::Grouped).await
    }

    /// Objects of one category.
    pub async fn list_objects(&self, category: &str, token: Option<&str>) -> DepotResult<ListPage> {
        depot_core::validate_segment("category", category)?;
        self.list(&self.scheme.category_prefix(category), token, Mode::Grouped)
            .await
    }

    /// Version labels of one object.
    pub async fn list_object_versions(
        &self,
        category: &str,
        object: &str,
        token: Option<&str>,
    ) -> DepotResult<ListPage> {
        depot_core::validate_segment("category", category)?;
        depot_core::validate_segment("object", object)?;
        self.list(&self.scheme.object_prefix(category, object), token, Mode::Leaves)
            .await
    }

    async fn list(&self, prefix: &str, token: Option<&str>, mode: Mode) -> DepotResult<ListPage> {
        let mut marker = match token.filter(|t| !t.is_empty()) {
            Some(token) if token.starts_with(prefix) && token.len() > prefix.len() => {
                Some(token.to_string())
            }
            Some(token) => {
                return Err(DepotError::malformed(
                    "token",
                    format!("{} is not a continuation token for this listing", token),
                ))
            }
            None => None,
        };

        let mut items: Vec<String> = Vec::new();
        loop {
            let mut request = ListRequest::new(prefix, self.page_size).with_marker(marker.clone());
            if mode == Mode::Grouped {
                request = request.with_delimiter(PATH_DELIMITER);
            }

            let output = bounded_store("list", self.call_timeout, self.content.list(&request))
                .await
                .map_err(|source| DepotError::Listing {
                    prefix: prefix.to_string(),
                    source,
                })?;

            match mode {
                Mode::Grouped => {
                    for group in &output.common_prefixes {
                        let name = group[prefix.len()..].trim_end_matches(PATH_DELIMITER);
                        if !name.is_empty() && items.last().map(String::as_str) != Some(name) {
                            items.push(name.to_string());
                        }
                    }
                }
                Mode::Leaves => {
                    items.extend(output.keys.iter().map(|key| key[prefix.len()..].to_string()));
                }
            }

            if !output.is_truncated {
                return Ok(ListPage {
                    items,
                    next_token: None,
                });
            }

            let next = last_entry(&output);
            if next.is_none() || next == marker {
                return Err(DepotError::Listing {
                    prefix: prefix.to_string(),
                    source: depot_core::StoreError::backend("listing cursor did not advance"),
                });
            }
            marker = next;

            if !items.is_empty() {
                tracing::debug!(prefix = %prefix, items = items.len(), "Listing page truncated");
                return Ok(ListPage {
                    items,
                    next_token: marker,
                });
            }
        }
    }
}

/// Cursor for the next store call: the store's marker, or the greatest entry
/// of the page when the store does not report one.
fn last_entry(output: &ListOutput) -> Option<String> {
    output.next_marker.clone().or_else(|| {
        output
            .keys
            .last()
            .into_iter()
            .chain(output.common_prefixes.last())
            .max()
            .cloned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::InMemoryContentStore;

    async fn lister(keys: &[&str], prefix: Option<&str>, page_size: usize) -> Lister<InMemoryContentStore> {
        let store = Arc::new(InMemoryContentStore::new());
        for key in keys {
            store.put(key, b"x".to_vec()).await.expect("put should succeed");
        }
        Lister::new(store, KeyScheme::new(prefix), page_size, Duration::from_secs(5))
    }

    async fn drain_categories(lister: &Lister<InMemoryContentStore>) -> Vec<String> {
        let mut all = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = lister
                .list_categories(token.as_deref())
                .await
                .expect("list should succeed");
            all.extend(page.items);
            match page.next_token {
                Some(next) => token = Some(next),
                None => return all,
            }
        }
    }

    #[tokio::test]
    async fn test_categories_every_page_size() {
        let keys = ["fun/a.obj/v1", "fun/b.obj/v2", "work/c.obj/v1"];
        for page_size in 1..=4 {
            let lister = lister(&keys, None, page_size).await;
            assert_eq!(drain_categories(&lister).await, vec!["fun", "work"], "page size {}", page_size);
        }
    }

    #[tokio::test]
    async fn test_objects_under_prefix() {
        let lister = lister(&["dang/fun/a.obj/v1", "dang/fun/a.obj/v2", "dang/fun/b.obj/v1"], Some("dang"), 10).await;
        let page = lister.list_objects("fun", None).await.expect("list should succeed");
        assert_eq!(page.items, vec!["a.obj", "b.obj"]);
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_versions_are_leaf_labels() {
        let lister = lister(&["fun/a.obj/123abc", "fun/a.obj/456def", "fun/ab.obj/v9"], None, 1).await;
        let first = lister
            .list_object_versions("fun", "a.obj", None)
            .await
            .expect("list should succeed");
        assert_eq!(first.items, vec!["123abc"]);
        let token = first.next_token.expect("more versions");

        let second = lister
            .list_object_versions("fun", "a.obj", Some(&token))
            .await
            .expect("list should succeed");
        assert_eq!(second.items, vec!["456def"]);
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn test_empty_namespace() {
        let lister = lister(&[], None, 10).await;
        let page = lister.list_categories(None).await.expect("list should succeed");
        assert_eq!(page, ListPage::empty());
        let page = lister.list_objects("fun", Some("")).await.expect("empty token is no token");
        assert_eq!(page, ListPage::empty());
    }

    #[tokio::test]
    async fn test_foreign_token_is_malformed() {
        let lister = lister(&["fun/a.obj/v1"], None, 10).await;
        let err = lister
            .list_objects("fun", Some("work/"))
            .await
            .expect_err("token from another listing");
        assert_eq!(err.kind(), depot_core::ErrorKind::Malformed);
    }

    #[tokio::test]
    async fn test_exhausted_token_yields_nothing() {
        let lister = lister(&["fun/a.obj/v1", "work/b.obj/v1"], None, 1).await;
        let page = lister.list_categories(Some("work/")).await.expect("list should succeed");
        assert!(page.items.is_empty());
        assert!(page.next_token.is_none());
    }
}
