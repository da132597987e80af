//! Schedule retrieval: upstream sources, the fetch pool, the cached client
//! and the report formatter.

pub mod api_types;
pub mod client;
pub mod error;
pub mod format;
pub mod pool;
pub mod source;
pub mod types;

pub use client::ScheduleClient;
pub use error::{FetchError, FetchOutcome};
pub use pool::FetchPool;
pub use source::{CommandSource, FileSource, HttpSource, RawScheduleSource};
pub use types::GroupKey;
