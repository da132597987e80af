//! Result types reported by the cache layer.

use chrono::{DateTime, Utc};

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Result of a fetch this caller started.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Result of a fetch some other caller had already started.
  pub fn coalesced(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Coalesced,
      cached_at: None,
    }
  }

  /// Fresh cached data, no fetch involved.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// This caller started the upstream fetch
  Network,
  /// Joined an upstream fetch already in flight for the same key
  Coalesced,
  /// Served from cache, still within its TTL
  CacheFresh,
}

/// Point-in-time counts for the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
  /// Keys with a stored entry, fresh or stale
  pub entries: usize,
  /// Stored entries still within their TTL
  pub fresh: usize,
  /// Keys with an upstream fetch in progress
  pub in_flight: usize,
}
