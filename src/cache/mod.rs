//! In-memory TTL cache with single-flight fetching.
//!
//! This module provides a key-agnostic caching mechanism that:
//! - Serves entries younger than the TTL without touching the fetcher
//! - Coalesces concurrent misses for one key into a single upstream fetch
//! - Never stores failures, so the next call after an error fetches again
//! - Keeps fetches for different keys independent of each other

mod layer;
mod traits;

pub use layer::CacheLayer;
pub use traits::{CacheResult, CacheSource, CacheStats};
