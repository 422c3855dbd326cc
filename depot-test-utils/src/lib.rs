//! DEPOT Test Utilities
//!
//! Shared test infrastructure for the DEPOT workspace:
//! - Fault-injecting store doubles with call counters
//! - A mutable, counting cache source
//! - Proptest generators for paths, versions and key sets
//! - Fixtures and assertions for common scenarios

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

pub use depot_core::{
    ChangeToken, Channel, DepotError, DepotResult, ErrorKind, ObjectPath, Promotion, StoreError,
    StoreResult, StoredObject, VersionPointer,
};
pub use depot_storage::{
    ContentStore, ControllerConfig, InMemoryContentStore, InMemoryMetadataStore, ListOutput,
    ListRequest, MetadataStore, RetryPolicy, Source, VersionController,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================================================
// METADATA STORE DOUBLE
// ============================================================================

/// Metadata store that replays scripted errors before delegating to an
/// in-memory table.
///
/// Each call pops the next scripted error for its operation, if any.
#[derive(Debug, Default)]
pub struct FlakyMetadataStore {
    inner: InMemoryMetadataStore,
    get_script: Mutex<VecDeque<StoreError>>,
    put_script: Mutex<VecDeque<StoreError>>,
    delay: Mutex<Option<Duration>>,
    get_calls: AtomicU32,
    put_calls: AtomicU32,
}

impl FlakyMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue errors for the next `get_item` calls.
    pub fn fail_gets(&self, errors: impl IntoIterator<Item = StoreError>) {
        lock(&self.get_script).extend(errors);
    }

    /// Queue errors for the next `put_item` calls.
    pub fn fail_puts(&self, errors: impl IntoIterator<Item = StoreError>) {
        lock(&self.put_script).extend(errors);
    }

    /// Delay every call by `delay` before it runs.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *lock(&self.delay) = delay;
    }

    pub fn get_calls(&self) -> u32 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> u32 {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryMetadataStore {
        &self.inner
    }

    async fn pause(&self) {
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl MetadataStore for FlakyMetadataStore {
    async fn get_item(&self, name: &str) -> StoreResult<Option<VersionPointer>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let scripted = lock(&self.get_script).pop_front();
        match scripted {
            Some(err) => Err(err),
            None => self.inner.get_item(name).await,
        }
    }

    async fn put_item(&self, pointer: &VersionPointer) -> StoreResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let scripted = lock(&self.put_script).pop_front();
        match scripted {
            Some(err) => Err(err),
            None => self.inner.put_item(pointer).await,
        }
    }
}

// ============================================================================
// CONTENT STORE DOUBLE
// ============================================================================

/// Content store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentOp {
    Put,
    Get,
    Head,
    List,
}

/// In-memory content store with per-operation injected failures.
#[derive(Debug, Default)]
pub struct FaultyContentStore {
    inner: InMemoryContentStore,
    failures: Mutex<HashMap<ContentOp, StoreError>>,
    calls: Mutex<HashMap<ContentOp, u32>>,
}

impl FaultyContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `op` fail with `err` until cleared.
    pub fn fail(&self, op: ContentOp, err: StoreError) {
        lock(&self.failures).insert(op, err);
    }

    pub fn clear(&self, op: ContentOp) {
        lock(&self.failures).remove(&op);
    }

    pub fn calls(&self, op: ContentOp) -> u32 {
        lock(&self.calls).get(&op).copied().unwrap_or(0)
    }

    pub fn inner(&self) -> &InMemoryContentStore {
        &self.inner
    }

    fn enter(&self, op: ContentOp) -> StoreResult<()> {
        *lock(&self.calls).entry(op).or_insert(0) += 1;
        match lock(&self.failures).get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ContentStore for FaultyContentStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> StoreResult<ChangeToken> {
        self.enter(ContentOp::Put)?;
        self.inner.put(key, body).await
    }

    async fn get(&self, key: &str) -> StoreResult<StoredObject> {
        self.enter(ContentOp::Get)?;
        self.inner.get(key).await
    }

    async fn head(&self, key: &str) -> StoreResult<ChangeToken> {
        self.enter(ContentOp::Head)?;
        self.inner.head(key).await
    }

    async fn list(&self, request: &ListRequest) -> StoreResult<ListOutput> {
        self.enter(ContentOp::List)?;
        self.inner.list(request).await
    }
}

// ============================================================================
// CACHE SOURCE DOUBLE
// ============================================================================

/// Mutable upstream for cache tier tests.
///
/// Tokens are the content hash of the current bytes, so replacing a value
/// changes its token.
#[derive(Debug, Default)]
pub struct CountingSource {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failure: Mutex<Option<DepotError>>,
    delay: Mutex<Option<Duration>>,
    fetch_calls: AtomicU32,
    check_calls: AtomicU32,
}

impl CountingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, key: &str, value: &[u8]) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&self, key: &str, value: &[u8]) {
        lock(&self.objects).insert(key.to_string(), value.to_vec());
    }

    pub fn remove(&self, key: &str) {
        lock(&self.objects).remove(key);
    }

    /// Fail every call with `err` until cleared with `None`.
    pub fn set_failure(&self, err: Option<DepotError>) {
        *lock(&self.failure) = err;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *lock(&self.delay) = delay;
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn check_calls(&self) -> u32 {
        self.check_calls.load(Ordering::SeqCst)
    }

    async fn current(&self, key: &str) -> DepotResult<Vec<u8>> {
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = lock(&self.failure).clone();
        if let Some(err) = failure {
            return Err(err);
        }
        lock(&self.objects)
            .get(key)
            .cloned()
            .ok_or_else(|| DepotError::Upstream {
                key: key.to_string(),
                source: StoreError::NotFound {
                    key: key.to_string(),
                },
            })
    }
}

#[async_trait]
impl Source for CountingSource {
    async fn fetch_from_source(&self, key: &str) -> DepotResult<(Vec<u8>, ChangeToken)> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let value = self.current(key).await?;
        let token = ChangeToken::for_content(&value);
        Ok((value, token))
    }

    async fn check_source(&self, key: &str) -> DepotResult<ChangeToken> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        let value = self.current(key).await?;
        Ok(ChangeToken::for_content(&value))
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating DEPOT inputs.

    use super::*;
    use proptest::prelude::*;

    /// A valid path segment: never empty, never `.` or `..`, no delimiter.
    pub fn arb_segment() -> impl Strategy<Value = String> {
        "[a-z0-9][a-z0-9._-]{0,6}"
    }

    pub fn arb_version() -> impl Strategy<Value = String> {
        "v[0-9]{1,3}|[0-9a-f]{6}"
    }

    pub fn arb_object_path() -> impl Strategy<Value = ObjectPath> {
        (arb_segment(), arb_segment()).prop_filter_map("valid path", |(category, name)| {
            ObjectPath::new(category, name).ok()
        })
    }

    /// Content keys `category/object/version` drawn from small alphabets so
    /// categories and objects repeat.
    pub fn arb_content_keys(max: usize) -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(("[a-d]{1,2}", "[a-d]{1,2}\\.obj", arb_version()), 0..max).prop_map(
            |triples| {
                triples
                    .into_iter()
                    .map(|(category, object, version)| format!("{}/{}/{}", category, object, version))
                    .collect()
            },
        )
    }

    pub fn arb_promotion() -> impl Strategy<Value = Promotion> {
        prop_oneof![Just(Promotion::None), Just(Promotion::Dev), Just(Promotion::Prod)]
    }

    pub fn arb_retryable_error() -> impl Strategy<Value = StoreError> {
        prop_oneof![
            "[a-z ]{1,12}".prop_map(|reason| StoreError::Throttled { reason }),
            "[a-z ]{1,12}".prop_map(|reason| StoreError::Transient { reason }),
        ]
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common testing scenarios.

    use super::*;

    /// Retry policy with the default budget and a 1 ms backoff unit.
    pub fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    pub fn controller_config() -> ControllerConfig {
        ControllerConfig::default().with_retry(fast_retry())
    }

    /// Controller over in-memory stores, sharing the content store handle.
    pub fn in_memory_controller() -> (
        VersionController<InMemoryContentStore, Arc<InMemoryMetadataStore>>,
        Arc<InMemoryContentStore>,
        Arc<InMemoryMetadataStore>,
    ) {
        let content = Arc::new(InMemoryContentStore::new());
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let controller = VersionController::new(controller_config(), content.clone(), metadata.clone());
        (controller, content, metadata)
    }

    /// Controller over fault-injecting doubles.
    pub fn faulty_controller() -> (
        VersionController<FaultyContentStore, Arc<FlakyMetadataStore>>,
        Arc<FaultyContentStore>,
        Arc<FlakyMetadataStore>,
    ) {
        let content = Arc::new(FaultyContentStore::new());
        let metadata = Arc::new(FlakyMetadataStore::new());
        let controller = VersionController::new(controller_config(), content.clone(), metadata.clone());
        (controller, content, metadata)
    }

    pub fn app_path() -> ObjectPath {
        ObjectPath::new("team", "app.bin").unwrap_or_else(|e| panic!("fixture path: {}", e))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for DEPOT error classification.

    use super::*;

    /// Assert that a DepotResult is an error of the given kind.
    #[track_caller]
    pub fn assert_kind<T: std::fmt::Debug>(result: &DepotResult<T>, kind: ErrorKind) {
        match result {
            Err(err) => assert_eq!(err.kind(), kind, "wrong error kind for {:?}", err),
            Ok(value) => panic!("Expected {:?} error, got Ok({:?})", kind, value),
        }
    }

    /// Assert that a DepotResult is a Conflict error.
    #[track_caller]
    pub fn assert_conflict<T: std::fmt::Debug>(result: &DepotResult<T>) {
        assert_kind(result, ErrorKind::Conflict);
    }

    /// Assert that a DepotResult is a NotFound error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &DepotResult<T>) {
        assert_kind(result, ErrorKind::NotFound);
    }
}
