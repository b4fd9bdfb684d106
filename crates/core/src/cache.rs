use crate::config::EngineConfig;
use crate::domain::period::Period;
use crate::domain::recommendation::AssetMetrics;
use crate::market::FetchError;
use crate::metrics::MetricsFetcher;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub ticker: String,
    pub period: Period,
}

impl CacheKey {
    pub fn new(ticker: &str, period: Period) -> Self {
        Self {
            ticker: ticker.to_string(),
            period,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CacheEntry {
    pub value: AssetMetrics,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<AssetMetrics, FetchError>>>;

/// One provider fetch that every concurrent caller for the same key awaits.
struct InFlight {
    id: u64,
    fetch: SharedFetch,
}

/// Process-wide metrics cache keyed by (ticker, period).
///
/// Fresh entries are served without touching the provider. Misses and stale entries go through
/// the [`MetricsFetcher`]; only successful fetches are stored, so an absent result is retried on
/// the next call. Concurrent misses on one key join a single in-flight fetch and all receive its
/// outcome, success or failure, so they wait at most one fetch timeout between them.
pub struct MetricsCache {
    fetcher: MetricsFetcher,
    store: Arc<EntryStore>,
    in_flight: Mutex<HashMap<CacheKey, InFlight>>,
    next_fetch_id: AtomicU64,
}

struct EntryStore {
    ttl: chrono::Duration,
    max_entries: Option<usize>,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MetricsCache {
    /// `config` is expected to have passed [`EngineConfig::validate`], which rejects a TTL too
    /// large to represent; such a TTL is treated as never expiring.
    pub fn new(fetcher: MetricsFetcher, config: &EngineConfig) -> Self {
        let ttl = chrono::Duration::from_std(config.cache_ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            fetcher,
            store: Arc::new(EntryStore {
                ttl,
                max_entries: config.cache_max_entries,
                entries: RwLock::new(HashMap::new()),
            }),
            in_flight: Mutex::new(HashMap::new()),
            next_fetch_id: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.store.ttl
    }

    pub async fn get_metrics(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<AssetMetrics, FetchError> {
        self.get_metrics_at(ticker, period, Utc::now()).await
    }

    /// Same as [`get_metrics`](Self::get_metrics) with an explicit clock reading.
    pub async fn get_metrics_at(
        &self,
        ticker: &str,
        period: Period,
        now: DateTime<Utc>,
    ) -> Result<AssetMetrics, FetchError> {
        let key = CacheKey::new(ticker, period);

        if let Some(value) = self.store.lookup_fresh(&key, now).await {
            tracing::debug!(%ticker, %period, "metrics cache hit");
            return Ok(value);
        }

        let (id, fetch) = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(&key) {
                Some(pending) => {
                    tracing::debug!(%ticker, %period, "joining in-flight metrics fetch");
                    (pending.id, pending.fetch.clone())
                }
                None => {
                    let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let fetch = self.shared_fetch(key.clone(), now);
                    in_flight.insert(
                        key.clone(),
                        InFlight {
                            id,
                            fetch: fetch.clone(),
                        },
                    );
                    (id, fetch)
                }
            }
        };

        let mut waiter = Waiter {
            in_flight: &self.in_flight,
            key,
            id,
            fetch,
            finished: false,
        };
        let res = (&mut waiter.fetch).await;
        waiter.finished = true;
        res
    }

    /// Builds the shared fetch for `key`. It re-checks the cache first: an earlier fetch for the
    /// key may have landed between our miss and registering this one.
    fn shared_fetch(&self, key: CacheKey, now: DateTime<Utc>) -> SharedFetch {
        let fetcher = self.fetcher.clone();
        let store = self.store.clone();
        async move {
            if let Some(value) = store.lookup_fresh(&key, now).await {
                tracing::debug!(ticker = %key.ticker, period = %key.period, "metrics cache filled by concurrent fetch");
                return Ok(value);
            }

            tracing::debug!(ticker = %key.ticker, period = %key.period, "metrics cache miss");
            let res = fetcher.fetch(&key.ticker, key.period).await;
            if let Ok(value) = &res {
                store.insert(key, *value, now).await;
            }
            res
        }
        .boxed()
        .shared()
    }

    /// Stores an entry as if it had been fetched at `fetched_at`, replacing any previous one.
    pub async fn insert_at(
        &self,
        ticker: &str,
        period: Period,
        value: AssetMetrics,
        fetched_at: DateTime<Utc>,
    ) {
        self.store
            .insert(CacheKey::new(ticker, period), value, fetched_at)
            .await;
    }

    /// Returns a stored entry regardless of freshness.
    pub async fn peek(&self, ticker: &str, period: Period) -> Option<CacheEntry> {
        self.store
            .entries
            .read()
            .await
            .get(&CacheKey::new(ticker, period))
            .copied()
    }

    pub async fn len(&self) -> usize {
        self.store.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.store.entries.write().await.clear();
    }
}

impl EntryStore {
    async fn lookup_fresh(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<AssetMetrics> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.is_fresh(now, self.ttl))
            .map(|e| e.value)
    }

    async fn insert(&self, key: CacheKey, value: AssetMetrics, fetched_at: DateTime<Utc>) {
        let mut entries = self.entries.write().await;

        if let Some(max) = self.max_entries {
            if !entries.contains_key(&key) && entries.len() >= max {
                let ttl = self.ttl;
                entries.retain(|_, e| e.is_fresh(fetched_at, ttl));
            }
            while !entries.contains_key(&key) && entries.len() >= max {
                let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.fetched_at)
                    .map(|(k, _)| k.clone())
                else {
                    break;
                };
                tracing::debug!(ticker = %oldest.ticker, period = %oldest.period, "evicting metrics cache entry");
                entries.remove(&oldest);
            }
        }

        entries.insert(key, CacheEntry { value, fetched_at });
    }
}

/// A caller's hold on an in-flight fetch. Dropping it, whether the fetch finished or the caller
/// was cancelled, unregisters the fetch once nobody else is waiting on it.
struct Waiter<'a> {
    in_flight: &'a Mutex<HashMap<CacheKey, InFlight>>,
    key: CacheKey,
    id: u64,
    fetch: SharedFetch,
    finished: bool,
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        let mut in_flight = lock(self.in_flight);
        let Some(pending) = in_flight.get(&self.key) else {
            return;
        };
        if pending.id != self.id {
            return;
        }
        // The map holds one handle and this waiter holds another; more means other waiters.
        let others_waiting = self.fetch.strong_count().is_some_and(|n| n > 2);
        if self.finished || !others_waiting {
            in_flight.remove(&self.key);
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
