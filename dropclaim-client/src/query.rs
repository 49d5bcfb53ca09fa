//! Query cache and per-operation caching policy.
//!
//! A single [`QueryCache`] holds the last successful result of every query,
//! keyed by operation name and parameters. [`Query`] handles read through it
//! according to a [`QueryPolicy`] and expose a [`QueryState`] with the flags a
//! front-end renders from.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use lru::LruCache;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use dropclaim_core::{ClassifiedError, ErrorKind, Result, RetryConfig};

/// Kinds that are never retried by a query, whatever the retry budget.
pub const NEVER_RETRY: &[ErrorKind] = &[ErrorKind::WalletNotConnected, ErrorKind::InvalidPublicKey];

/// Caching, refresh and retry settings for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPolicy {
    /// Age after which cached data is stale and refetched on next read.
    pub stale_time: Duration,
    /// Background refresh period, if any.
    pub refetch_interval: Option<Duration>,
    /// Refetch stale data when the window regains focus.
    pub refetch_on_window_focus: bool,
    /// Retry budget and back-off between attempts.
    pub retry: RetryConfig,
    /// Keep the last good data when a refetch fails.
    pub keep_previous_data: bool,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(30),
            refetch_interval: Some(Duration::from_secs(60)),
            refetch_on_window_focus: false,
            retry: RetryConfig::default(),
            keep_previous_data: false,
        }
    }
}

impl QueryPolicy {
    pub fn campaign_list() -> Self {
        Self::default()
    }

    pub fn campaign_detail() -> Self {
        Self::default()
    }

    pub fn user_allocation() -> Self {
        Self {
            stale_time: Duration::from_secs(10),
            refetch_interval: Some(Duration::from_secs(30)),
            ..Self::default()
        }
    }

    /// Batches surface partial data rather than dropping it on a failed
    /// refresh.
    pub fn batch_allocations() -> Self {
        Self {
            keep_previous_data: true,
            ..Self::user_allocation()
        }
    }

    /// Whether to try again after `failure_count` consecutive failures, the
    /// latest being `error`.
    pub fn should_retry(&self, failure_count: u32, error: &ClassifiedError) -> bool {
        if NEVER_RETRY.contains(&error.kind()) {
            return false;
        }
        error.is_retryable() && failure_count <= self.retry.max_retries
    }
}

/// Cache key: operation name plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    operation: &'static str,
    params: Vec<String>,
}

impl QueryKey {
    pub fn new<I, P>(operation: &'static str, params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            operation,
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.operation, self.params.join(","))
    }
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
}

/// A cached value and when it was fetched.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub value: T,
    pub fetched_at: Instant,
}

/// Process-wide LRU cache of query results.
pub struct QueryCache {
    entries: Mutex<LruCache<QueryKey, CacheEntry>>,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<QueryKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached value under `key`, if present and of type `T`.
    pub fn get<T>(&self, key: &QueryKey) -> Option<Cached<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut entries = self.lock();
        let entry = entries.get(key)?;
        let value = entry.value.downcast_ref::<T>()?.clone();
        Some(Cached {
            value,
            fetched_at: entry.fetched_at,
        })
    }

    pub fn insert<T>(&self, key: QueryKey, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.lock().put(
            key,
            CacheEntry {
                value: Arc::new(value),
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop one entry. Returns whether it existed.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        self.lock().pop(key).is_some()
    }

    /// Drop every entry of `operation`. Returns how many were dropped.
    pub fn invalidate_operation(&self, operation: &str) -> usize {
        let mut entries = self.lock();
        let keys: Vec<QueryKey> = entries
            .iter()
            .filter(|(k, _)| k.operation == operation)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            entries.pop(key);
        }
        keys.len()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CACHE_SIZE)
    }
}

/// What a front-end renders for one query.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub error: Option<ClassifiedError>,
    /// Fetching with nothing to show yet.
    pub is_loading: bool,
    /// Any fetch in flight, including background refreshes.
    pub is_fetching: bool,
    /// Consecutive failures of the latest fetch.
    pub failure_count: u32,
    pub updated_at: Option<Instant>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
            is_fetching: false,
            failure_count: 0,
            updated_at: None,
        }
    }
}

impl<T> QueryState<T> {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.data.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_network_error(&self) -> bool {
        self.error.as_ref().map_or(false, |e| e.kind().is_network())
    }

    pub fn is_wallet_error(&self) -> bool {
        self.error.as_ref().map_or(false, |e| e.kind().is_wallet())
    }

    pub fn is_retryable(&self) -> bool {
        self.error.as_ref().map_or(false, |e| e.is_retryable())
    }

    /// Whether to offer a retry affordance.
    pub fn can_retry(&self) -> bool {
        self.is_retryable() && !self.is_fetching
    }
}

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// A cached, retrying view over one data-fetching operation.
pub struct Query<T> {
    key: QueryKey,
    policy: QueryPolicy,
    cache: Arc<QueryCache>,
    fetcher: Fetcher<T>,
    state: Arc<Mutex<QueryState<T>>>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            policy: self.policy.clone(),
            cache: self.cache.clone(),
            fetcher: self.fetcher.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T> Query<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(key: QueryKey, policy: QueryPolicy, cache: Arc<QueryCache>, fetcher: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            key,
            policy,
            cache,
            fetcher: Arc::new(move || fetcher().boxed()),
            state: Arc::new(Mutex::new(QueryState::default())),
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn policy(&self) -> &QueryPolicy {
        &self.policy
    }

    fn lock_state(&self) -> MutexGuard<'_, QueryState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> QueryState<T> {
        self.lock_state().clone()
    }

    /// Whether the cached data is missing or older than the stale time.
    pub fn is_stale(&self) -> bool {
        match self.cache.get::<T>(&self.key) {
            Some(cached) => cached.fetched_at.elapsed() >= self.policy.stale_time,
            None => true,
        }
    }

    /// Read through the cache: fresh data is served without a fetch.
    pub async fn fetch(&self) -> QueryState<T> {
        if let Some(cached) = self.cache.get::<T>(&self.key) {
            if cached.fetched_at.elapsed() < self.policy.stale_time {
                debug!(query = %self.key, "serving fresh cached data");
                let mut state = self.lock_state();
                state.data = Some(cached.value);
                state.error = None;
                state.updated_at = Some(cached.fetched_at);
                return state.clone();
            }
        }
        self.execute().await
    }

    /// Fetch regardless of freshness.
    pub async fn refetch(&self) -> QueryState<T> {
        self.execute().await
    }

    /// Manual retry trigger. Starts a fresh retry budget.
    pub async fn retry(&self) -> QueryState<T> {
        self.lock_state().failure_count = 0;
        self.execute().await
    }

    /// Refetch on window focus, when the policy allows it and data is stale.
    pub async fn window_focused(&self) -> Option<QueryState<T>> {
        if !self.policy.refetch_on_window_focus || !self.is_stale() {
            return None;
        }
        Some(self.execute().await)
    }

    /// Drop the cached result so the next [`Query::fetch`] goes to the source.
    pub fn invalidate(&self) {
        self.cache.invalidate(&self.key);
    }

    /// Refetch every `refetch_interval` on a background task. `None` when
    /// the policy has no interval.
    pub fn spawn_background_refresh(&self) -> Option<JoinHandle<()>> {
        let period = self.policy.refetch_interval?;
        let query = self.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                debug!(query = %query.key, "background refresh");
                query.execute().await;
            }
        }))
    }

    async fn execute(&self) -> QueryState<T> {
        {
            let mut state = self.lock_state();
            state.is_fetching = true;
            state.is_loading = state.data.is_none();
        }

        let mut failures: u32 = 0;
        loop {
            match (self.fetcher)().await {
                Ok(data) => {
                    self.cache.insert(self.key.clone(), data.clone());
                    let mut state = self.lock_state();
                    state.data = Some(data);
                    state.error = None;
                    state.failure_count = 0;
                    state.updated_at = Some(Instant::now());
                    state.is_loading = false;
                    state.is_fetching = false;
                    return state.clone();
                }
                Err(err) => {
                    failures += 1;
                    if self.policy.should_retry(failures, &err) {
                        let delay = self.policy.retry.delay_for_attempt(failures - 1);
                        debug!(query = %self.key, failures, delay_ms = delay.as_millis() as u64, "query failed, retrying");
                        sleep(delay).await;
                        continue;
                    }

                    warn!(query = %self.key, failures, kind = %err.kind(), "query failed");
                    let mut state = self.lock_state();
                    if !self.policy.keep_previous_data {
                        state.data = None;
                    }
                    state.error = Some(err);
                    state.failure_count = failures;
                    state.is_loading = false;
                    state.is_fetching = false;
                    return state.clone();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_query(
        cache: Arc<QueryCache>,
        policy: QueryPolicy,
        outcomes: Vec<Result<u32>>,
    ) -> (Query<u32>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let outcomes = Arc::new(outcomes);
        let query = Query::new(QueryKey::new("test", ["p"]), policy, cache, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) as usize;
            let outcome = outcomes[n.min(outcomes.len() - 1)].clone();
            async move { outcome }
        });
        (query, calls)
    }

    #[test]
    fn test_policy_never_retries_wallet_or_key_errors() {
        let policy = QueryPolicy::default();
        // retryable flag forced on, still excluded
        let err = ClassifiedError::with_retryable(ErrorKind::WalletNotConnected, "x", true);
        assert!(!policy.should_retry(1, &err));
        let err = ClassifiedError::with_retryable(ErrorKind::InvalidPublicKey, "x", true);
        assert!(!policy.should_retry(1, &err));

        let err = ClassifiedError::of_kind(ErrorKind::NetworkError);
        assert!(policy.should_retry(3, &err));
        assert!(!policy.should_retry(4, &err));
    }

    #[test]
    fn test_presets() {
        assert!(QueryPolicy::batch_allocations().keep_previous_data);
        assert!(!QueryPolicy::campaign_list().refetch_on_window_focus);
        assert!(QueryPolicy::user_allocation().stale_time < QueryPolicy::campaign_list().stale_time);
    }

    #[test]
    fn test_cache_typed_get_and_invalidate() {
        let cache = QueryCache::new(4);
        let key = QueryKey::new("get_campaign_detail", ["abc"]);
        cache.insert(key.clone(), 7u64);

        assert_eq!(cache.get::<u64>(&key).unwrap().value, 7);
        assert!(cache.get::<String>(&key).is_none());

        cache.insert(QueryKey::new("get_campaign_detail", ["def"]), 8u64);
        cache.insert(QueryKey::new("get_campaign_list", Vec::<String>::new()), 9u64);
        assert_eq!(cache.invalidate_operation("get_campaign_detail"), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_lru_eviction() {
        let cache = QueryCache::new(2);
        for i in 0..3u32 {
            cache.insert(QueryKey::new("op", [i.to_string()]), i);
        }
        assert!(!cache.contains(&QueryKey::new("op", ["0"])));
        assert!(cache.contains(&QueryKey::new("op", ["2"])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_data_is_served_from_cache() {
        let cache = Arc::new(QueryCache::new(8));
        let (query, calls) = counting_query(cache, QueryPolicy::default(), vec![Ok(1)]);

        assert_eq!(query.fetch().await.data, Some(1));
        assert_eq!(query.fetch().await.data, Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(query.is_stale());
        query.fetch().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_surfaces_error() {
        let cache = Arc::new(QueryCache::new(8));
        let policy = QueryPolicy {
            retry: RetryConfig {
                max_retries: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        let (query, calls) = counting_query(
            cache,
            policy,
            vec![Err(ClassifiedError::of_kind(ErrorKind::NetworkError))],
        );

        let state = query.fetch().await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(state.failure_count, 3);
        assert!(state.is_network_error());
        assert!(state.can_retry());
        assert!(!state.is_wallet_error());
        assert!(state.data.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_error_is_not_retried() {
        let cache = Arc::new(QueryCache::new(8));
        let (query, calls) = counting_query(
            cache,
            QueryPolicy::default(),
            vec![Err(ClassifiedError::wallet_not_connected())],
        );

        let state = query.fetch().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(state.is_wallet_error());
        assert!(!state.can_retry());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_previous_data_on_failed_refetch() {
        let cache = Arc::new(QueryCache::new(8));
        let policy = QueryPolicy {
            retry: RetryConfig::none(),
            ..QueryPolicy::batch_allocations()
        };
        let (query, _) = counting_query(
            cache,
            policy,
            vec![Ok(5), Err(ClassifiedError::of_kind(ErrorKind::RpcError))],
        );

        query.fetch().await;
        let state = query.refetch().await;
        assert_eq!(state.data, Some(5));
        assert!(state.is_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_retry_recovers() {
        let cache = Arc::new(QueryCache::new(8));
        let policy = QueryPolicy {
            retry: RetryConfig::none(),
            ..Default::default()
        };
        let (query, _) = counting_query(
            cache,
            policy,
            vec![Err(ClassifiedError::of_kind(ErrorKind::ConnectionTimeout)), Ok(9)],
        );

        assert!(query.fetch().await.is_error());
        let state = query.retry().await;
        assert!(state.is_success());
        assert_eq!(state.data, Some(9));
        assert_eq!(state.failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_focus_is_disabled_by_default() {
        let cache = Arc::new(QueryCache::new(8));
        let (query, calls) = counting_query(cache, QueryPolicy::default(), vec![Ok(1)]);
        assert!(query.window_focused().await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_refresh() {
        let cache = Arc::new(QueryCache::new(8));
        let policy = QueryPolicy {
            refetch_interval: Some(Duration::from_secs(10)),
            ..Default::default()
        };
        let (query, calls) = counting_query(cache, policy, vec![Ok(1)]);

        let handle = query.spawn_background_refresh().unwrap();
        tokio::time::sleep(Duration::from_secs(25)).await;
        handle.abort();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
