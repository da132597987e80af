use std::time::Duration;

use thiserror::Error;

/// Why an upstream fetch did not produce a payload.
///
/// Cloneable so a single outcome can be handed to every caller that joined
/// the same in-flight fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
  /// The source does not know this group.
  #[error("group {group} not found")]
  NotFound { group: String },

  #[error("fetch timed out after {0:?}")]
  Timeout(Duration),

  #[error("schedule source unavailable: {0}")]
  SourceUnavailable(String),

  /// The source answered, but not with a calendar we can read.
  #[error("unexpected schedule data: {0}")]
  UnexpectedShape(String),

  /// The fetch task panicked or was aborted before producing a result.
  #[error("fetch task crashed: {0}")]
  Crashed(String),
}

/// Result of one upstream fetch.
pub type FetchOutcome<T> = Result<T, FetchError>;

impl FetchError {
  /// Short message suitable for showing to the person who asked.
  pub fn user_message(&self) -> &'static str {
    match self {
      Self::NotFound { .. } => "❌ Группа не найдена, введите другую через /start",
      Self::Timeout(_) => "⏳ Сайт расписания не ответил вовремя, попробуйте позже.",
      Self::SourceUnavailable(_) => "⚠️ Сайт расписания недоступен, попробуйте позже.",
      Self::UnexpectedShape(_) => "⚠️ Сайт расписания вернул непонятные данные, попробуйте позже.",
      Self::Crashed(_) => "⚠️ Внутренняя ошибка при получении расписания.",
    }
  }
}
