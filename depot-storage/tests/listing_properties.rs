//! Property tests for paginated listing.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use depot_core::{KeyScheme, ListPage};
use depot_storage::{ContentStore, InMemoryContentStore, Lister};
use depot_test_utils::generators::arb_content_keys;
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime should build")
}

async fn seeded(keys: &[String], page_size: usize) -> Lister<InMemoryContentStore> {
    let store = Arc::new(InMemoryContentStore::new());
    for key in keys {
        store.put(key, b"x".to_vec()).await.expect("put should succeed");
    }
    Lister::new(store, KeyScheme::new(None), page_size, Duration::from_secs(5))
}

/// Follow tokens until exhaustion, checking the cursor advances each time.
async fn drain<F, Fut>(mut list: F) -> Vec<String>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: std::future::Future<Output = ListPage>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = list(token.clone()).await;
        items.extend(page.items);
        match page.next_token {
            Some(next) => {
                assert!(token.as_ref().map_or(true, |prev| next > *prev), "token must advance");
                token = Some(next);
            }
            None => return items,
        }
    }
}

proptest! {
    #[test]
    fn prop_categories_complete_without_duplicates(
        keys in arb_content_keys(24),
        page_size in 1usize..6,
    ) {
        let rt = runtime();
        let items = rt.block_on(async {
            let lister = seeded(&keys, page_size).await;
            let lister = &lister;
            drain(move |token| {
                async move { lister.list_categories(token.as_deref()).await.expect("list") }
            })
            .await
        });

        let expected: BTreeSet<String> = keys
            .iter()
            .filter_map(|k| k.split('/').next().map(str::to_string))
            .collect();
        let unique: BTreeSet<String> = items.iter().cloned().collect();
        prop_assert_eq!(unique.len(), items.len(), "duplicate items in {:?}", items);
        prop_assert_eq!(unique, expected);
    }

    #[test]
    fn prop_objects_complete_without_duplicates(
        keys in arb_content_keys(24),
        page_size in 1usize..6,
    ) {
        let rt = runtime();
        let items = rt.block_on(async {
            let lister = seeded(&keys, page_size).await;
            let lister = &lister;
            drain(move |token| {
                async move { lister.list_objects("a", token.as_deref()).await.expect("list") }
            })
            .await
        });

        let expected: BTreeSet<String> = keys
            .iter()
            .filter_map(|k| k.strip_prefix("a/"))
            .filter_map(|rest| rest.split('/').next().map(str::to_string))
            .collect();
        let unique: BTreeSet<String> = items.iter().cloned().collect();
        prop_assert_eq!(unique.len(), items.len());
        prop_assert_eq!(unique, expected);
    }

    #[test]
    fn prop_versions_complete_in_order(
        keys in arb_content_keys(24),
        page_size in 1usize..6,
    ) {
        let rt = runtime();
        let items = rt.block_on(async {
            let lister = seeded(&keys, page_size).await;
            let lister = &lister;
            drain(move |token| {
                async move {
                    lister
                        .list_object_versions("a", "a.obj", token.as_deref())
                        .await
                        .expect("list")
                }
            })
            .await
        });

        let expected: Vec<String> = keys
            .iter()
            .filter_map(|k| k.strip_prefix("a/a.obj/"))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        prop_assert_eq!(items, expected);
    }
}
