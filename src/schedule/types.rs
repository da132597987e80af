use std::fmt;

use chrono::NaiveDate;

/// Normalized class group identifier, used as the cache key.
///
/// Normalization trims surrounding whitespace and upper-cases, so
/// `" ист-24-1 "` and `"ИСТ-24-1"` are the same group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(String);

impl GroupKey {
  /// Normalize raw user input. Returns `None` for blank input.
  pub fn parse(raw: &str) -> Option<Self> {
    let normalized = raw.trim().to_uppercase();
    if normalized.is_empty() {
      None
    } else {
      Some(Self(normalized))
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for GroupKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// The full, unfiltered calendar fetched for one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulePayload {
  pub days: Vec<DayEntry>,
}

impl SchedulePayload {
  /// First day entry for the given date, if the calendar has one.
  pub fn day(&self, date: NaiveDate) -> Option<&DayEntry> {
    self.days.iter().find(|day| day.date == date)
  }
}

/// One calendar day. Empty `pairs` is an explicit day without classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayEntry {
  pub date: NaiveDate,
  pub pairs: Vec<Pair>,
}

/// A class period within a day, in calendar order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
  /// Ordinal as the source labels it ("1", "2", ...)
  pub number: String,
  pub lessons: Vec<Lesson>,
}

/// A single scheduled class. Upstream data is unreliable, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lesson {
  pub subgroup_numbers: Option<String>,
  pub time_range: Option<String>,
  pub discipline: Option<String>,
  pub teacher_name: Option<String>,
  pub cabinet: Option<String>,
  pub building_address: Option<String>,
  pub lesson_type_code: Option<String>,
}
