//! Cache layer that orchestrates freshness checks and coalesced fetching.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::traits::{CacheResult, CacheStats};
use crate::schedule::{FetchError, FetchOutcome};

/// A stored payload. Replaced wholesale on refresh, never mutated.
struct CacheEntry<V> {
  payload: Arc<V>,
  /// Monotonic store time, drives staleness
  fetched_at: Instant,
  /// Wall-clock store time, for reporting
  cached_at: DateTime<Utc>,
}

type InFlight<V> = Shared<BoxFuture<'static, FetchOutcome<Arc<V>>>>;

struct CacheState<K, V> {
  entries: HashMap<K, CacheEntry<V>>,
  in_flight: HashMap<K, InFlight<V>>,
}

/// Cache layer that manages TTL freshness and single-flight fetching.
///
/// This layer sits between callers and the fetch path. The state lock only
/// covers bookkeeping (check entry, register fetch, install result); the
/// fetch itself runs in its own task, so one slow key never holds up another.
pub struct CacheLayer<K, V> {
  state: Arc<Mutex<CacheState<K, V>>>,
  /// How long a stored entry stays fresh
  ttl: Duration,
}

impl<K, V> CacheLayer<K, V>
where
  K: Eq + Hash + Clone + Send + std::fmt::Display + 'static,
  V: Send + Sync + 'static,
{
  /// Create an empty cache with the given TTL.
  pub fn new(ttl: Duration) -> Self {
    Self {
      state: Arc::new(Mutex::new(CacheState {
        entries: HashMap::new(),
        in_flight: HashMap::new(),
      })),
      ttl,
    }
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  fn is_fresh(&self, entry: &CacheEntry<V>) -> bool {
    entry.fetched_at.elapsed() < self.ttl
  }

  /// Fetch with cache-first, single-flight strategy.
  ///
  /// 1. Fresh entry - return it, no suspension
  /// 2. Fetch already in flight for `key` - wait for its outcome
  /// 3. Otherwise start `fetcher` in a background task and wait for it
  ///
  /// Dropping the returned future detaches this caller only; the fetch keeps
  /// running for the other waiters and its result is still stored.
  pub async fn fetch<F, Fut>(&self, key: &K, fetcher: F) -> FetchOutcome<CacheResult<Arc<V>>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = FetchOutcome<V>> + Send + 'static,
  {
    let (pending, started_here) = {
      let mut state = lock(&self.state);

      if let Some(entry) = state.entries.get(key) {
        if self.is_fresh(entry) {
          debug!(%key, "cache hit");
          return Ok(CacheResult::from_cache(
            Arc::clone(&entry.payload),
            entry.cached_at,
          ));
        }
      }

      match state.in_flight.get(key) {
        Some(pending) => {
          debug!(%key, "joining in-flight fetch");
          (pending.clone(), false)
        }
        None => {
          debug!(%key, "cache miss, starting fetch");
          let pending = self.spawn_fetch(key.clone(), fetcher());
          state.in_flight.insert(key.clone(), pending.clone());
          (pending, true)
        }
      }
    };

    let payload = pending.await?;
    if started_here {
      Ok(CacheResult::from_network(payload))
    } else {
      Ok(CacheResult::coalesced(payload))
    }
  }

  /// Run `fetch` in its own task. The task installs the outcome itself, so
  /// it completes even when every waiter has gone away.
  fn spawn_fetch<Fut>(&self, key: K, fetch: Fut) -> InFlight<V>
  where
    Fut: Future<Output = FetchOutcome<V>> + Send + 'static,
  {
    let state = Arc::clone(&self.state);

    let handle = tokio::spawn(async move {
      let outcome = match AssertUnwindSafe(fetch).catch_unwind().await {
        Ok(outcome) => outcome.map(Arc::new),
        Err(_) => Err(FetchError::Crashed(format!("fetch for {} panicked", key))),
      };

      let mut guard = lock(&state);
      guard.in_flight.remove(&key);
      match &outcome {
        Ok(payload) => {
          debug!(%key, "storing fetched payload");
          guard.entries.insert(
            key,
            CacheEntry {
              payload: Arc::clone(payload),
              fetched_at: Instant::now(),
              cached_at: Utc::now(),
            },
          );
        }
        Err(e) => warn!(%key, error = %e, "fetch failed, nothing cached"),
      }

      outcome
    });

    async move {
      handle
        .await
        .unwrap_or_else(|e| Err(FetchError::Crashed(e.to_string())))
    }
    .boxed()
    .shared()
  }

  /// Current entry and in-flight counts.
  pub fn stats(&self) -> CacheStats {
    let state = lock(&self.state);
    CacheStats {
      entries: state.entries.len(),
      fresh: state.entries.values().filter(|e| self.is_fresh(e)).count(),
      in_flight: state.in_flight.len(),
    }
  }
}

impl<K, V> Clone for CacheLayer<K, V> {
  fn clone(&self) -> Self {
    Self {
      state: Arc::clone(&self.state),
      ttl: self.ttl,
    }
  }
}

/// Bookkeeping never panics while holding the lock, but stay usable if it did.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
