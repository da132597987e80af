//! Bounded pool for blocking schedule fetches.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::error::{FetchError, FetchOutcome};

/// Runs blocking fetch tasks on the blocking thread pool, at most `workers`
/// at a time. Waiting submissions are admitted in FIFO order.
///
/// A worker slot is released when the blocking call actually returns, not
/// when its caller stops waiting, so a hung fetch that timed out still
/// counts against the limit.
#[derive(Clone)]
pub struct FetchPool {
  permits: Arc<Semaphore>,
  workers: usize,
  timeout: Duration,
}

impl FetchPool {
  pub fn new(workers: usize, timeout: Duration) -> Self {
    let workers = workers.max(1);
    Self {
      permits: Arc::new(Semaphore::new(workers)),
      workers,
      timeout,
    }
  }

  pub fn workers(&self) -> usize {
    self.workers
  }

  /// Number of idle worker slots.
  pub fn available(&self) -> usize {
    self.permits.available_permits()
  }

  /// Run `task` once a worker slot is free and wait for its outcome.
  ///
  /// The timeout covers only the execution, not the time spent queued.
  pub async fn run<T, F>(&self, task: F) -> FetchOutcome<T>
  where
    F: FnOnce() -> FetchOutcome<T> + Send + 'static,
    T: Send + 'static,
  {
    let permit = Arc::clone(&self.permits)
      .acquire_owned()
      .await
      .map_err(|e| FetchError::Crashed(format!("fetch pool closed: {}", e)))?;
    debug!(available = self.permits.available_permits(), "fetch admitted");

    let handle = tokio::task::spawn_blocking(move || {
      let _permit = permit;
      task()
    });

    match tokio::time::timeout(self.timeout, handle).await {
      Ok(Ok(outcome)) => outcome,
      Ok(Err(e)) => {
        warn!(error = %e, "fetch task crashed");
        Err(FetchError::Crashed(e.to_string()))
      }
      Err(_) => {
        warn!(timeout = ?self.timeout, "fetch timed out");
        Err(FetchError::Timeout(self.timeout))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::future::join_all;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn test_concurrency_is_bounded() {
    let pool = FetchPool::new(2, Duration::from_secs(10));
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks = (0..6).map(|i| {
      let running = Arc::clone(&running);
      let peak = Arc::clone(&peak);
      pool.run(move || {
        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        running.fetch_sub(1, Ordering::SeqCst);
        Ok(i)
      })
    });

    let results: Vec<_> = join_all(tasks).await.into_iter().map(Result::unwrap).collect();
    assert_eq!(results, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(peak.load(Ordering::SeqCst), 2);
    assert_eq!(pool.available(), 2);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn test_queued_tasks_run_in_submission_order() {
    let pool = FetchPool::new(1, Duration::from_secs(10));
    let order = Arc::new(Mutex::new(Vec::new()));

    let tasks = (0..4).map(|i| {
      let order = Arc::clone(&order);
      pool.run(move || {
        order.lock().unwrap().push(i);
        std::thread::sleep(Duration::from_millis(10));
        Ok(())
      })
    });
    join_all(tasks).await;

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
  }

  #[tokio::test]
  async fn test_panicking_task_is_a_failure() {
    let pool = FetchPool::new(1, Duration::from_secs(10));

    let err = pool
      .run(|| -> FetchOutcome<()> { panic!("browser crashed") })
      .await
      .unwrap_err();
    assert!(matches!(err, FetchError::Crashed(_)));

    let ok = pool.run(|| Ok(7)).await.unwrap();
    assert_eq!(ok, 7);
  }

  #[tokio::test]
  async fn test_task_error_is_passed_through() {
    let pool = FetchPool::new(1, Duration::from_secs(10));

    let err = pool
      .run(|| -> FetchOutcome<()> {
        Err(FetchError::NotFound {
          group: "ИСТ-24-1".to_string(),
        })
      })
      .await
      .unwrap_err();
    assert!(matches!(err, FetchError::NotFound { .. }));
  }

  #[tokio::test]
  async fn test_hung_task_times_out_but_keeps_its_slot() {
    let pool = FetchPool::new(1, Duration::from_millis(50));

    let err = pool
      .run(|| {
        std::thread::sleep(Duration::from_millis(300));
        Ok(())
      })
      .await
      .unwrap_err();
    assert_eq!(err, FetchError::Timeout(Duration::from_millis(50)));
    assert_eq!(pool.available(), 0);

    // Next task waits for the hung one, then runs normally
    let ok = tokio::time::timeout(Duration::from_secs(5), pool.run(|| Ok("next")))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(ok, "next");
  }
}
