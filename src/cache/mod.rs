//! Key-addressed cache over remote queries
//!
//! Each [`QueryKey`] owns one entry moving through
//! `absent -> loading -> fresh | error`, `fresh -> stale` on invalidation and
//! `stale | error -> loading` on the next fetch. Concurrent fetches of one key
//! share a single request. Values are stored type-erased and handed out as
//! `Arc<T>`.
//!
//! The cache is an explicit object: build one per signed-in session and
//! [`QueryCache::clear`] it on logout.

mod key;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::Error;

pub use key::*;

type CachedValue = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue, Arc<Error>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Loading,
    Fresh,
    Stale,
    Error,
}

/// Outcome of the last run of a named mutation
#[derive(Debug, Clone, Default)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error(Arc<Error>),
}

impl MutationStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

struct CacheEntry {
    value: Option<CachedValue>,
    status: QueryStatus,
    error: Option<Arc<Error>>,
    updated_at: Option<Instant>,
    in_flight: Option<(u64, SharedFetch)>,
    invalidated_in_flight: bool,
}

impl CacheEntry {
    fn new() -> Self {
        Self {
            value: None,
            status: QueryStatus::Loading,
            error: None,
            updated_at: None,
            in_flight: None,
            invalidated_in_flight: false,
        }
    }

    fn fresh_value(&mut self, stale_time: Option<Duration>) -> Option<CachedValue> {
        if self.status != QueryStatus::Fresh {
            return None;
        }
        if let (Some(stale_time), Some(updated_at)) = (stale_time, self.updated_at) {
            if updated_at.elapsed() >= stale_time {
                self.status = QueryStatus::Stale;
                return None;
            }
        }
        self.value.clone()
    }
}

fn downcast<T: Send + Sync + 'static>(key: &QueryKey, value: CachedValue) -> Result<Arc<T>, Error> {
    value
        .downcast::<T>()
        .map_err(|_| Error::general(format!("cached value for {} has a different type", key)))
}

/// Query cache shared by every consumer of one client
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    mutations: Mutex<HashMap<String, MutationStatus>>,
    stale_time: Option<Duration>,
    next_request: AtomicU64,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl QueryCache {
    /// `stale_time` of `None` keeps fetched values fresh until invalidated
    pub fn new(stale_time: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            mutations: Mutex::new(HashMap::new()),
            stale_time,
            next_request: AtomicU64::new(0),
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_mutations(&self) -> MutexGuard<'_, HashMap<String, MutationStatus>> {
        self.mutations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached value for `key` if fresh, otherwise run `fetcher`.
    ///
    /// A fetch already in flight for `key` is joined instead of starting a
    /// second request; every waiter gets the same value or the same error.
    /// Once `key` has been invalidated, later callers start a new request
    /// instead of joining the one already running.
    /// On failure the previous value stays readable through [`QueryCache::get`].
    /// `fetcher` is called with the cache locked, so it must only build the
    /// future and not touch the cache itself.
    pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<Arc<T>, Error>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let (request_id, request) = {
            let mut entries = self.lock_entries();
            let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);

            if let Some(value) = entry.fresh_value(self.stale_time) {
                debug!("cache hit for {}", key);
                return downcast(key, value);
            }

            // a request started before an invalidation cannot serve callers
            // that arrive after it
            let joinable = match &entry.in_flight {
                Some((request_id, request)) if !entry.invalidated_in_flight => {
                    Some((*request_id, request.clone()))
                }
                _ => None,
            };

            match joinable {
                Some((request_id, request)) => {
                    debug!("joining in-flight request for {}", key);
                    (request_id, request)
                }
                None => {
                    let request_id = self.next_request.fetch_add(1, Ordering::Relaxed);
                    let request = fetcher()
                        .map(|result| {
                            result
                                .map(|value| Arc::new(value) as CachedValue)
                                .map_err(Arc::new)
                        })
                        .boxed()
                        .shared();

                    debug!("cache miss for {}, fetching", key);
                    entry.status = QueryStatus::Loading;
                    entry.invalidated_in_flight = false;
                    entry.in_flight = Some((request_id, request.clone()));
                    (request_id, request)
                }
            }
        };

        let result = request.await;
        self.settle(key, request_id, &result);

        match result {
            Ok(value) => downcast(key, value),
            Err(err) => Err(Error::Shared(err)),
        }
    }

    /// Record the outcome of a request; only the first waiter gets to do it
    fn settle(&self, key: &QueryKey, request_id: u64, result: &Result<CachedValue, Arc<Error>>) {
        let mut entries = self.lock_entries();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        if !matches!(entry.in_flight, Some((id, _)) if id == request_id) {
            return;
        }
        entry.in_flight = None;

        match result {
            Ok(value) => {
                entry.value = Some(value.clone());
                entry.error = None;
                entry.updated_at = Some(Instant::now());
                entry.status = if entry.invalidated_in_flight {
                    QueryStatus::Stale
                } else {
                    QueryStatus::Fresh
                };
            }
            Err(err) => {
                warn!("fetch for {} failed: {}", key, err);
                entry.error = Some(err.clone());
                entry.status = QueryStatus::Error;
            }
        }
        entry.invalidated_in_flight = false;
    }

    /// Mark every entry under `prefix` stale and return how many matched.
    ///
    /// Nothing is refetched here; the next [`QueryCache::fetch`] of a stale
    /// key issues a new request. A request in flight during invalidation
    /// settles as stale.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.lock_entries();
        let mut matched = 0;

        for (key, entry) in entries.iter_mut().filter(|(key, _)| key.starts_with(prefix)) {
            matched += 1;
            if entry.in_flight.is_some() {
                entry.invalidated_in_flight = true;
            } else if entry.value.is_some() || entry.status == QueryStatus::Error {
                entry.status = QueryStatus::Stale;
            }
            debug!("invalidated {}", key);
        }

        matched
    }

    pub fn status(&self, key: &QueryKey) -> Option<QueryStatus> {
        self.lock_entries().get(key).map(|entry| entry.status)
    }

    /// Last successfully fetched value, whatever its status
    pub fn get<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let value = self.lock_entries().get(key)?.value.clone()?;
        value.downcast::<T>().ok()
    }

    /// Error of the last failed fetch, until a later fetch succeeds
    pub fn error(&self, key: &QueryKey) -> Option<Arc<Error>> {
        self.lock_entries().get(key)?.error.clone()
    }

    /// Store a value as if it had just been fetched
    pub fn set_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey, value: T) {
        let mut entries = self.lock_entries();
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);
        entry.value = Some(Arc::new(value));
        entry.error = None;
        entry.updated_at = Some(Instant::now());
        if entry.in_flight.is_none() {
            entry.status = QueryStatus::Fresh;
        }
    }

    /// Run a mutation and, if it succeeds, invalidate `invalidates`.
    ///
    /// Success and failure are both recorded under `name`; a failure is also
    /// returned to the caller.
    pub async fn mutate<T, Fut>(&self, name: &str, invalidates: &[QueryKey], mutation: Fut) -> Result<T, Error>
    where
        Fut: Future<Output = Result<T, Error>>,
    {
        self.set_mutation_status(name, MutationStatus::Pending);

        match mutation.await {
            Ok(value) => {
                for prefix in invalidates {
                    self.invalidate(prefix);
                }
                self.set_mutation_status(name, MutationStatus::Success);
                Ok(value)
            }
            Err(err) => {
                warn!("mutation {} failed: {}", name, err);
                let err = Arc::new(err);
                self.set_mutation_status(name, MutationStatus::Error(err.clone()));
                Err(Error::Shared(err))
            }
        }
    }

    pub fn mutation_status(&self, name: &str) -> MutationStatus {
        self.lock_mutations().get(name).cloned().unwrap_or_default()
    }

    fn set_mutation_status(&self, name: &str, status: MutationStatus) {
        self.lock_mutations().insert(name.to_string(), status);
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Drop every entry and mutation record
    pub fn clear(&self) {
        self.lock_entries().clear();
        self.lock_mutations().clear();
        debug!("query cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, Error>> {
        let calls = calls.clone();
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    fn failing_fetch(calls: &Arc<AtomicUsize>) -> impl FnOnce() -> BoxFuture<'static, Result<u32, Error>> {
        let calls = calls.clone();
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                Err(Error::api(500, "boom"))
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_request() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::from(["progress", "2024-01-01", "2024-02-01"]);

        let (first, second) = tokio::join!(
            cache.fetch(&key, counting_fetch(&calls, 7)),
            cache.fetch(&key, counting_fetch(&calls, 8)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*first.unwrap(), 7);
        assert_eq!(*second.unwrap(), 7);
        assert_eq!(cache.status(&key), Some(QueryStatus::Fresh));
    }

    #[tokio::test]
    async fn test_fresh_value_is_served_from_cache() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::user_with_plan();

        cache.fetch(&key, counting_fetch(&calls, 1)).await.unwrap();
        let again = cache.fetch(&key, counting_fetch(&calls, 2)).await.unwrap();

        assert_eq!(*again, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::user_with_plan();

        cache.fetch(&key, counting_fetch(&calls, 1)).await.unwrap();
        assert_eq!(cache.invalidate(&QueryKey::user_with_plan()), 1);
        assert_eq!(cache.status(&key), Some(QueryStatus::Stale));
        assert_eq!(cache.get::<u32>(&key).as_deref(), Some(&1));

        let refetched = cache.fetch(&key, counting_fetch(&calls, 2)).await.unwrap();
        assert_eq!(*refetched, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.status(&key), Some(QueryStatus::Fresh));
    }

    #[tokio::test]
    async fn test_invalidate_by_prefix() {
        let cache = QueryCache::default();
        let january = QueryKey::from(["progress", "2024-01-01", "2024-02-01"]);
        let february = QueryKey::from(["progress", "2024-02-01", "2024-03-01"]);
        let weights = QueryKey::from(["weightHistory", "2024-01-01", "2024-02-01"]);

        cache.set_query_data(&january, 1u32);
        cache.set_query_data(&february, 2u32);
        cache.set_query_data(&weights, 3u32);

        assert_eq!(cache.invalidate(&QueryKey::resource(PROGRESS)), 2);
        assert_eq!(cache.status(&january), Some(QueryStatus::Stale));
        assert_eq!(cache.status(&february), Some(QueryStatus::Stale));
        assert_eq!(cache.status(&weights), Some(QueryStatus::Fresh));
        assert_eq!(cache.invalidate(&QueryKey::resource("unknown")), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_value() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::user_with_plan();

        cache.set_query_data(&key, 5u32);
        cache.invalidate(&key);

        let (first, second) = tokio::join!(
            cache.fetch(&key, failing_fetch(&calls)),
            cache.fetch(&key, failing_fetch(&calls)),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let first = first.unwrap_err();
        let second = second.unwrap_err();
        assert!(matches!(first.root(), Error::Api { status: 500, .. }));
        match (&first, &second) {
            (Error::Shared(a), Error::Shared(b)) => assert!(Arc::ptr_eq(a, b)),
            other => panic!("expected shared errors, got {other:?}"),
        }

        assert_eq!(cache.status(&key), Some(QueryStatus::Error));
        assert_eq!(cache.get::<u32>(&key).as_deref(), Some(&5));
        assert!(cache.error(&key).is_some());

        // no automatic retry; the next fetch asks again
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let recovered = cache.fetch(&key, counting_fetch(&calls, 6)).await.unwrap();
        assert_eq!(*recovered, 6);
        assert!(cache.error(&key).is_none());
    }

    #[tokio::test]
    async fn test_invalidation_during_flight_settles_stale() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::user_with_plan();

        let (value, _) = tokio::join!(cache.fetch(&key, counting_fetch(&calls, 1)), async {
            sleep(Duration::from_millis(5)).await;
            cache.invalidate(&QueryKey::user_with_plan())
        });

        assert_eq!(*value.unwrap(), 1);
        assert_eq!(cache.status(&key), Some(QueryStatus::Stale));
    }

    #[tokio::test]
    async fn test_fetch_after_invalidation_does_not_join_older_request() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::user_with_plan();

        let (first, second) = tokio::join!(cache.fetch(&key, counting_fetch(&calls, 1)), async {
            sleep(Duration::from_millis(5)).await;
            cache.invalidate(&QueryKey::user_with_plan());
            cache.fetch(&key, counting_fetch(&calls, 2)).await
        });

        assert_eq!(*first.unwrap(), 1);
        assert_eq!(*second.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // the older request settled first but no longer owns the entry
        assert_eq!(cache.status(&key), Some(QueryStatus::Fresh));
        assert_eq!(cache.get::<u32>(&key).as_deref(), Some(&2));
    }

    #[tokio::test]
    async fn test_zero_stale_time_always_refetches() {
        let cache = QueryCache::new(Some(Duration::ZERO));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::user_with_plan();

        cache.fetch(&key, counting_fetch(&calls, 1)).await.unwrap();
        cache.fetch(&key, counting_fetch(&calls, 2)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_an_error() {
        let cache = QueryCache::default();
        let key = QueryKey::user_with_plan();
        cache.set_query_data(&key, "text".to_string());

        let calls = Arc::new(AtomicUsize::new(0));
        assert!(cache.fetch(&key, counting_fetch(&calls, 1)).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mutation_status_is_recorded() {
        let cache = QueryCache::default();
        let key = QueryKey::user_with_plan();
        cache.set_query_data(&key, 1u32);

        assert!(matches!(cache.mutation_status("weight"), MutationStatus::Idle));

        let result: Result<(), Error> = cache
            .mutate("workout", &[key.clone()], async { Err(Error::api(503, "down")) })
            .await;
        assert!(result.is_err());
        assert!(cache.mutation_status("workout").is_error());
        assert_eq!(cache.status(&key), Some(QueryStatus::Fresh));

        cache
            .mutate("weight", &[key.clone()], async { Ok::<_, Error>(()) })
            .await
            .unwrap();
        assert!(matches!(cache.mutation_status("weight"), MutationStatus::Success));
        assert_eq!(cache.status(&key), Some(QueryStatus::Stale));

        cache.clear();
        assert!(cache.is_empty());
        assert!(matches!(cache.mutation_status("workout"), MutationStatus::Idle));
    }
}
