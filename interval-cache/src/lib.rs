//! Interval cache
//!
//! Memoizes an async computation per key and per recurring time window.
//! Indicator data for a 15m strategy only changes once every 15 minutes, so
//! every tick inside the same window can reuse one computation.
//!
//! Guarantees:
//! - at most one underlying computation per (key, window), no matter how many
//!   callers arrive while it is running
//! - values from a past window are never returned
//! - failures reach every waiting caller and are not cached
//! - a computation runs to completion even if every caller gives up on it

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use common::Timeframe;
use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Error surfaced to callers of [`IntervalCache::call`]
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("computation for key '{key}' failed: {reason}")]
    ComputationFailed {
        key: String,
        reason: Arc<anyhow::Error>,
    },

    #[error("computation for key '{key}' panicked")]
    Panicked { key: String },

    #[error("computation for key '{key}' was aborted")]
    Aborted { key: String },
}

impl CacheError {
    pub fn key(&self) -> &str {
        match self {
            CacheError::ComputationFailed { key, .. }
            | CacheError::Panicked { key }
            | CacheError::Aborted { key } => key,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Window length as a timeframe token ("1m", "15m", "4h", ...)
    #[serde(default = "default_interval")]
    pub interval: Timeframe,

    /// Upper bound on cached keys, least recently used evicted first.
    /// 0 means unbounded.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn new(interval: Timeframe) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_interval() -> Timeframe {
    Timeframe::minutes(15)
}

fn default_max_entries() -> usize {
    1024
}


/// Counters for observability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Served from a resolved value in the current window
    pub hits: u64,
    /// Attached to a computation already in flight
    pub joins: u64,
    /// Started a new computation
    pub misses: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    joins: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

type SharedComputation<V> = Shared<BoxFuture<'static, Result<V, CacheError>>>;
type SharedEntries<V> = Arc<Mutex<Entries<V>>>;

struct Ready<V> {
    window: i64,
    value: V,
}

struct InFlight<V> {
    window: i64,
    generation: u64,
    computation: SharedComputation<V>,
}

/// Resolved values are bounded by `max_entries`. Running computations live
/// outside the LRU and are never evicted, so a key has at most one per window.
struct Entries<V> {
    ready: LruCache<String, Ready<V>>,
    in_flight: HashMap<String, InFlight<V>>,
}

impl<V> Entries<V> {
    fn new(max_entries: usize) -> Self {
        let ready = match NonZeroUsize::new(max_entries) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            ready,
            in_flight: HashMap::new(),
        }
    }

    /// Drop the in-flight marker for `key` if `generation` still owns it
    fn release(&mut self, key: &str, generation: u64) -> bool {
        match self.in_flight.get(key) {
            Some(slot) if slot.generation == generation => {
                self.in_flight.remove(key);
                true
            }
            _ => false,
        }
    }

    fn len(&self) -> usize {
        let pending = self
            .in_flight
            .keys()
            .filter(|key| !self.ready.contains(key.as_str()))
            .count();
        self.ready.len() + pending
    }

    fn clear(&mut self) {
        self.ready.clear();
        self.in_flight.clear();
    }
}

enum Lookup<V> {
    Hit(V),
    Join(SharedComputation<V>),
    Miss,
}

type KeyFn<A> = Box<dyn Fn(&A) -> String + Send + Sync>;
type ComputeFn<A, V> = Box<dyn Fn(A) -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync>;

struct Inner<A, V> {
    interval: Timeframe,
    key_fn: KeyFn<A>,
    compute: ComputeFn<A, V>,
    entries: SharedEntries<V>,
    clock: Arc<dyn Clock>,
    generation: AtomicU64,
    counters: Arc<Counters>,
}

/// Memoized async function, windowed by a fixed interval.
///
/// Cheap to clone; clones share entries. Must be called from within a tokio
/// runtime since computations run on their own task.
pub struct IntervalCache<A, V> {
    inner: Arc<Inner<A, V>>,
}

impl<A, V> Clone for IntervalCache<A, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Wrap `compute` so that calls sharing a key within one window reuse a
/// single computation.
pub fn memoize<A, V, F, Fut, K>(compute: F, config: &CacheConfig, key_fn: K) -> IntervalCache<A, V>
where
    A: Send + 'static,
    V: Clone + Send + Sync + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    K: Fn(&A) -> String + Send + Sync + 'static,
{
    memoize_with_clock(compute, config, key_fn, Arc::new(SystemClock))
}

/// [`memoize`] with an explicit clock
pub fn memoize_with_clock<A, V, F, Fut, K>(
    compute: F,
    config: &CacheConfig,
    key_fn: K,
    clock: Arc<dyn Clock>,
) -> IntervalCache<A, V>
where
    A: Send + 'static,
    V: Clone + Send + Sync + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    K: Fn(&A) -> String + Send + Sync + 'static,
{
    IntervalCache {
        inner: Arc::new(Inner {
            interval: config.interval.clone(),
            key_fn: Box::new(key_fn),
            compute: Box::new(move |args| compute(args).boxed()),
            entries: Arc::new(Mutex::new(Entries::new(config.max_entries))),
            clock,
            generation: AtomicU64::new(0),
            counters: Arc::new(Counters::default()),
        }),
    }
}

impl<A, V> IntervalCache<A, V>
where
    A: Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Return the value for `args` in the current window, computing it if no
    /// caller has done so yet.
    pub async fn call(&self, args: A) -> Result<V, CacheError> {
        let key = (self.inner.key_fn)(&args);
        let window = self.current_window();

        let computation = {
            let mut guard = self.inner.entries.lock().await;
            let entries = &mut *guard;

            let lookup = match entries.ready.get(&key) {
                Some(ready) if ready.window == window => Lookup::Hit(ready.value.clone()),
                _ => match entries.in_flight.get(&key) {
                    Some(slot) if slot.window == window => Lookup::Join(slot.computation.clone()),
                    _ => Lookup::Miss,
                },
            };

            match lookup {
                Lookup::Hit(value) => {
                    self.inner.counters.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, window, "Interval cache hit");
                    return Ok(value);
                }
                Lookup::Join(computation) => {
                    self.inner.counters.joins.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, window, "Joining in-flight computation");
                    computation
                }
                Lookup::Miss => {
                    self.inner.counters.misses.fetch_add(1, Ordering::Relaxed);
                    let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, window, generation, "Starting computation");

                    // anything left under this key belongs to a past window
                    entries.ready.pop(key.as_str());

                    let computation = self.spawn_computation(key.clone(), window, generation, args);
                    entries.in_flight.insert(
                        key,
                        InFlight {
                            window,
                            generation,
                            computation: computation.clone(),
                        },
                    );
                    computation
                }
            }
        };

        computation.await
    }

    /// Run the computation on its own task. Whoever finishes it (the task,
    /// or a caller observing the task was aborted) clears the in-flight
    /// marker, but only if it is still the one registered for the key.
    fn spawn_computation(
        &self,
        key: String,
        window: i64,
        generation: u64,
        args: A,
    ) -> SharedComputation<V> {
        let computation = (self.inner.compute)(args);
        let entries = Arc::clone(&self.inner.entries);
        let counters = Arc::clone(&self.inner.counters);
        let task_key = key.clone();

        let task = async move {
            let result = match AssertUnwindSafe(computation).catch_unwind().await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(CacheError::ComputationFailed {
                    key: task_key.clone(),
                    reason: Arc::new(err),
                }),
                Err(_) => Err(CacheError::Panicked {
                    key: task_key.clone(),
                }),
            };

            let mut entries = entries.lock().await;
            let owns_slot = entries.release(&task_key, generation);

            match &result {
                Ok(value) => {
                    if owns_slot {
                        entries.ready.put(
                            task_key,
                            Ready {
                                window,
                                value: value.clone(),
                            },
                        );
                    } else {
                        debug!(key = %task_key, generation, "Discarding superseded result");
                    }
                }
                Err(err) => {
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(key = %task_key, window, error = %err, "Interval cache computation failed");
                }
            }

            result
        };

        let handle = tokio::spawn(execution_context::propagate(
            execution_context::snapshot(),
            task,
        ));
        let entries = Arc::clone(&self.inner.entries);

        async move {
            match handle.await {
                Ok(result) => result,
                Err(err) => {
                    if entries.lock().await.release(&key, generation) {
                        warn!(key = %key, generation, error = %err, "Computation task aborted");
                    }
                    Err(CacheError::Aborted { key })
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Start of the window the clock is currently in (epoch millis)
    pub fn current_window(&self) -> i64 {
        self.inner
            .interval
            .window_start(self.inner.clock.now_millis())
    }

    pub fn interval(&self) -> &Timeframe {
        &self.inner.interval
    }

    /// Drop every entry that belongs to a past window. Returns the number of
    /// entries removed.
    pub async fn purge_stale(&self) -> usize {
        let window = self.current_window();
        let mut entries = self.inner.entries.lock().await;

        let stale: Vec<String> = entries
            .ready
            .iter()
            .filter(|(_, ready)| ready.window < window)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.ready.pop(key);
        }

        let before = entries.in_flight.len();
        entries.in_flight.retain(|_, slot| slot.window >= window);
        let removed = stale.len() + before - entries.in_flight.len();

        if removed > 0 {
            debug!(removed, window, "Purged stale cache entries");
        }
        removed
    }

    /// Number of keys holding a value or a running computation
    pub async fn len(&self) -> usize {
        self.inner.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.entries.lock().await.len() == 0
    }

    /// Forget every entry. Computations already running still resolve for
    /// their callers but are not stored.
    pub async fn clear(&self) {
        self.inner.entries.lock().await.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let counters = &self.inner.counters;
        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            joins: counters.joins.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use execution_context::ExecutionFrame;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    // 15m aligned
    const T0: i64 = 1_699_999_200_000;
    const FIFTEEN_MIN: i64 = 900_000;

    fn counting_cache(
        clock: Arc<ManualClock>,
        calls: Arc<AtomicUsize>,
        delay_ms: u64,
        config: CacheConfig,
    ) -> IntervalCache<String, String> {
        memoize_with_clock(
            move |symbol: String| {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                    Ok::<_, anyhow::Error>(format!("{}#{}", symbol, n))
                }
            },
            &config,
            |symbol: &String| symbol.clone(),
            clock,
        )
    }

    fn fifteen_minutes() -> CacheConfig {
        CacheConfig::new("15m".parse().unwrap())
    }

    #[tokio::test]
    async fn test_same_window_computes_once() {
        let clock = Arc::new(ManualClock::new(T0));
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(clock.clone(), calls.clone(), 0, fifteen_minutes());

        let first = cache.call("BTCUSDT".to_string()).await.unwrap();
        clock.set(T0 + FIFTEEN_MIN - 1);
        let second = cache.call("BTCUSDT".to_string()).await.unwrap();

        assert_eq!(first, "BTCUSDT#1");
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_new_window_recomputes() {
        let clock = Arc::new(ManualClock::new(T0 + 60_000));
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(clock.clone(), calls.clone(), 0, fifteen_minutes());

        let first = cache.call("BTCUSDT".to_string()).await.unwrap();
        clock.set(T0 + FIFTEEN_MIN);
        let second = cache.call("BTCUSDT".to_string()).await.unwrap();

        assert_eq!(first, "BTCUSDT#1");
        assert_eq!(second, "BTCUSDT#2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // previous window's value was replaced, not kept alongside
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let clock = Arc::new(ManualClock::new(T0));
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(clock, calls.clone(), 0, fifteen_minutes());

        let btc = cache.call("BTCUSDT".to_string()).await.unwrap();
        let eth = cache.call("ETHUSDT".to_string()).await.unwrap();

        assert_eq!(btc, "BTCUSDT#1");
        assert_eq!(eth, "ETHUSDT#2");
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let clock = Arc::new(ManualClock::new(T0));
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(clock, calls.clone(), 30, fifteen_minutes());

        let results =
            futures::future::join_all((0..10).map(|_| cache.call("ETHUSDT".to_string()))).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(results.len(), 10);
        for result in results {
            assert_eq!(result.unwrap(), "ETHUSDT#1");
        }

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.joins, 9);
    }

    #[tokio::test]
    async fn test_failure_reaches_all_callers_and_is_not_cached() {
        let clock = Arc::new(ManualClock::new(T0));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let cache: IntervalCache<String, f64> = memoize_with_clock(
            move |_symbol: String| {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    if n == 1 {
                        anyhow::bail!("exchange timeout");
                    }
                    Ok(42.0)
                }
            },
            &fifteen_minutes(),
            |symbol: &String| symbol.clone(),
            clock,
        );

        let results =
            futures::future::join_all((0..3).map(|_| cache.call("BTCUSDT".to_string()))).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in &results {
            match result {
                Err(CacheError::ComputationFailed { key, reason }) => {
                    assert_eq!(key, "BTCUSDT");
                    assert!(reason.to_string().contains("exchange timeout"));
                }
                other => panic!("expected failure, got {:?}", other),
            }
        }
        assert!(cache.is_empty().await);
        assert_eq!(cache.stats().failures, 1);

        let retried = cache.call("BTCUSDT".to_string()).await.unwrap();
        assert_eq!(retried, 42.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_caller_does_not_cancel_computation() {
        let clock = Arc::new(ManualClock::new(T0));
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(clock, calls.clone(), 40, fifteen_minutes());

        let gave_up =
            tokio::time::timeout(Duration::from_millis(5), cache.call("SOLUSDT".to_string())).await;
        assert!(gave_up.is_err());

        let value = cache.call("SOLUSDT".to_string()).await.unwrap();
        assert_eq!(value, "SOLUSDT#1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_superseded_computation_does_not_overwrite_newer_window() {
        let clock = Arc::new(ManualClock::new(T0));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let cache: IntervalCache<String, String> = memoize_with_clock(
            move |symbol: String| {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n == 1 {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                    Ok::<_, anyhow::Error>(format!("{}#{}", symbol, n))
                }
            },
            &fifteen_minutes(),
            |symbol: &String| symbol.clone(),
            clock.clone(),
        );

        let slow = tokio::spawn({
            let cache = cache.clone();
            async move { cache.call("BTCUSDT".to_string()).await }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;

        clock.set(T0 + FIFTEEN_MIN);
        let fresh = cache.call("BTCUSDT".to_string()).await.unwrap();
        assert_eq!(fresh, "BTCUSDT#2");

        let stale = slow.await.unwrap().unwrap();
        assert_eq!(stale, "BTCUSDT#1");

        let again = cache.call("BTCUSDT".to_string()).await.unwrap();
        assert_eq!(again, "BTCUSDT#2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_panicking_computation_is_reported_and_retried() {
        let clock = Arc::new(ManualClock::new(T0));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let cache: IntervalCache<String, u32> = memoize_with_clock(
            move |_symbol: String| {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n == 1 {
                        panic!("division by zero in indicator");
                    }
                    Ok::<_, anyhow::Error>(7)
                }
            },
            &fifteen_minutes(),
            |symbol: &String| symbol.clone(),
            clock,
        );

        let first = cache.call("BTCUSDT".to_string()).await;
        assert!(matches!(first, Err(CacheError::Panicked { .. })));
        assert_eq!(first.unwrap_err().key(), "BTCUSDT");

        assert_eq!(cache.call("BTCUSDT".to_string()).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_computation_sees_callers_frame() {
        let clock = Arc::new(ManualClock::new(T0));
        let cache: IntervalCache<String, String> = memoize_with_clock(
            |_symbol: String| async move {
                Ok::<_, anyhow::Error>(execution_context::current_frame().strategy_name)
            },
            &fifteen_minutes(),
            |symbol: &String| symbol.clone(),
            clock,
        );

        let frame = ExecutionFrame::new("sma-cross", "binance", "live");
        let seen = execution_context::scope(frame, cache.call("BTCUSDT".to_string()))
            .await
            .unwrap();
        assert_eq!(seen, "sma-cross");
    }

    #[tokio::test]
    async fn test_max_entries_evicts_least_recently_used() {
        let clock = Arc::new(ManualClock::new(T0));
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(
            clock,
            calls.clone(),
            0,
            fifteen_minutes().with_max_entries(2),
        );

        for symbol in ["A", "B", "C"] {
            cache.call(symbol.to_string()).await.unwrap();
        }
        assert_eq!(cache.len().await, 2);

        // "A" was evicted by "C"
        let again = cache.call("A".to_string()).await.unwrap();
        assert_eq!(again, "A#4");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_purge_stale_and_clear() {
        let clock = Arc::new(ManualClock::new(T0));
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(clock.clone(), calls, 0, fifteen_minutes());

        cache.call("A".to_string()).await.unwrap();
        clock.set(T0 + FIFTEEN_MIN);
        cache.call("B".to_string()).await.unwrap();

        assert_eq!(cache.purge_stale().await, 1);
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_capacity_never_evicts_running_computation() {
        let clock = Arc::new(ManualClock::new(T0));
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(
            clock,
            calls.clone(),
            30,
            fifteen_minutes().with_max_entries(2),
        );

        // three keys in flight at once with room for two values
        let (a, b, c, a_again) = tokio::join!(
            cache.call("A".to_string()),
            cache.call("B".to_string()),
            cache.call("C".to_string()),
            cache.call("A".to_string()),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(a.unwrap(), a_again.unwrap());
        assert!(b.is_ok() && c.is_ok());

        let stats = cache.stats();
        assert_eq!(stats.misses, 3);
        assert_eq!(stats.joins, 1);
        assert_eq!(cache.len().await, 2);
    }

    #[test]
    fn test_aborted_computation_is_retried_in_same_window() {
        let clock = Arc::new(ManualClock::new(T0));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let cache: IntervalCache<String, String> = memoize_with_clock(
            move |symbol: String| {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n == 1 {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    }
                    Ok::<_, anyhow::Error>(format!("{}#{}", symbol, n))
                }
            },
            &fifteen_minutes(),
            |symbol: &String| symbol.clone(),
            clock,
        );

        // start the computation on a runtime that shuts down underneath it
        let doomed = tokio::runtime::Runtime::new().unwrap();
        let gave_up = doomed.block_on(async {
            tokio::time::timeout(Duration::from_millis(10), cache.call("BTCUSDT".to_string())).await
        });
        assert!(gave_up.is_err());
        drop(doomed);

        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let aborted = cache.call("BTCUSDT".to_string()).await;
            assert!(matches!(aborted, Err(CacheError::Aborted { .. })));

            let retried = cache.call("BTCUSDT".to_string()).await.unwrap();
            assert_eq!(retried, "BTCUSDT#2");
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_purge_stale_drops_abandoned_computation() {
        let clock = Arc::new(ManualClock::new(T0));
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(clock.clone(), calls, 50, fifteen_minutes());

        let gave_up =
            tokio::time::timeout(Duration::from_millis(5), cache.call("A".to_string())).await;
        assert!(gave_up.is_err());
        assert_eq!(cache.len().await, 1);

        clock.set(T0 + FIFTEEN_MIN);
        assert_eq!(cache.purge_stale().await, 1);
        assert!(cache.is_empty().await);

        // the old computation finishes without a slot to write into
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.is_empty().await);
    }

    #[test]
    fn test_config_defaults() {
        let config: CacheConfig = serde_json::from_str(r#"{"interval": "1h"}"#).unwrap();
        assert_eq!(config.interval.as_millis(), 3_600_000);
        assert_eq!(config.max_entries, 1024);

        let config = CacheConfig::default();
        assert_eq!(config.interval.token(), "15m");
    }
}
