//! Cached schedule client that wraps a raw source with pooling and caching.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::cache::{CacheLayer, CacheResult, CacheStats};

use super::error::FetchOutcome;
use super::format;
use super::pool::FetchPool;
use super::source::RawScheduleSource;
use super::types::{GroupKey, SchedulePayload};

/// Schedule client with transparent caching and bounded fetch concurrency.
///
/// Cache hits never touch the pool. Misses for the same group share one
/// pooled fetch; different groups fetch independently.
#[derive(Clone)]
pub struct ScheduleClient {
  source: Arc<dyn RawScheduleSource>,
  pool: FetchPool,
  cache: CacheLayer<GroupKey, SchedulePayload>,
}

impl ScheduleClient {
  pub fn new(source: Arc<dyn RawScheduleSource>, pool: FetchPool, ttl: Duration) -> Self {
    info!(
      source = %source.describe(),
      workers = pool.workers(),
      ttl_secs = ttl.as_secs(),
      "schedule client ready"
    );
    Self {
      source,
      pool,
      cache: CacheLayer::new(ttl),
    }
  }

  /// Full calendar for `group`, from cache when fresh.
  pub async fn payload(&self, group: &GroupKey) -> FetchOutcome<CacheResult<Arc<SchedulePayload>>> {
    self
      .cache
      .fetch(group, || {
        let source = Arc::clone(&self.source);
        let pool = self.pool.clone();
        let group = group.clone();
        async move {
          info!(%group, "fetching calendar");
          pool.run(move || source.fetch(&group)).await
        }
      })
      .await
  }

  /// Rendered report for `group` on `date`.
  pub async fn schedule_text(&self, group: &GroupKey, date: NaiveDate) -> FetchOutcome<String> {
    let result = self.payload(group).await?;
    debug!(%group, %date, source = ?result.source, cached_at = ?result.cached_at, "rendering schedule");
    Ok(format::render(&result.data, date))
  }

  pub fn stats(&self) -> CacheStats {
    self.cache.stats()
  }

  pub fn pool(&self) -> &FetchPool {
    &self.pool
  }

  pub fn ttl(&self) -> Duration {
    self.cache.ttl()
  }
}
