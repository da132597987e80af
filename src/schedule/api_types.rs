//! Serde-deserializable types matching the upstream calendar document.
//!
//! The scraped site exposes its calendar as a loosely-typed JSON array. These
//! types absorb that looseness so the domain types in `types` stay strict.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use super::error::{FetchError, FetchOutcome};
use super::types::{DayEntry, GroupKey, Lesson, Pair, SchedulePayload};

/// Accept a string or a number; anything else (or a blank string) is absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(value.as_ref().and_then(value_to_string))
}

/// Decode a nested object; anything that is not an object is the default.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned + Default,
{
  let value = Value::deserialize(deserializer)?;
  if !value.is_object() {
    return Ok(T::default());
  }
  Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Decode a list of objects, skipping items that do not fit. A non-list is empty.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  match Value::deserialize(deserializer)? {
    Value::Array(items) => Ok(
      items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect(),
    ),
    _ => Ok(Vec::new()),
  }
}

fn value_to_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

// ============================================================================
// Nested lesson fields
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiCouple {
  #[serde(deserialize_with = "lenient_string")]
  pub time: Option<String>,
  #[serde(deserialize_with = "lenient_string")]
  pub couple_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiTeacher {
  #[serde(deserialize_with = "lenient_string")]
  pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiHousing {
  #[serde(deserialize_with = "lenient_string")]
  pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiPlace {
  #[serde(deserialize_with = "lenient_string")]
  pub cabinet: Option<String>,
  #[serde(deserialize_with = "lenient")]
  pub housing: Option<ApiHousing>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiLesson {
  // Sometimes an object with subgroup_numbers, sometimes a bare string or null
  pub subgroup: Option<Value>,
  #[serde(deserialize_with = "lenient")]
  pub couple: Option<ApiCouple>,
  #[serde(deserialize_with = "lenient_string")]
  pub discipline: Option<String>,
  #[serde(deserialize_with = "lenient")]
  pub teacher: Option<ApiTeacher>,
  #[serde(deserialize_with = "lenient")]
  pub place: Option<ApiPlace>,
}

impl ApiLesson {
  pub fn into_lesson(self) -> Lesson {
    let subgroup_numbers = self
      .subgroup
      .as_ref()
      .and_then(Value::as_object)
      .and_then(|s| s.get("subgroup_numbers"))
      .and_then(value_to_string);
    let couple = self.couple.unwrap_or_default();
    let place = self.place.unwrap_or_default();

    Lesson {
      subgroup_numbers,
      time_range: couple.time,
      discipline: self.discipline,
      teacher_name: self.teacher.and_then(|t| t.name),
      cabinet: place.cabinet,
      building_address: place.housing.and_then(|h| h.address),
      lesson_type_code: couple.couple_type,
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiPair {
  #[serde(deserialize_with = "lenient_list")]
  pub lessons: Vec<ApiLesson>,
}

// ============================================================================
// Calendar days
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiDay {
  #[serde(default, deserialize_with = "lenient_string")]
  pub date: Option<String>,
  /// Pair number -> pair. The site emits `null`, `[]` or `{}` for free days.
  #[serde(default)]
  pub title: Option<Value>,
}

impl ApiDay {
  pub fn into_day(self) -> FetchOutcome<DayEntry> {
    let raw_date = self
      .date
      .ok_or_else(|| FetchError::UnexpectedShape("calendar day without a date".to_string()))?;
    let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d").map_err(|e| {
      FetchError::UnexpectedShape(format!("invalid calendar date '{}': {}", raw_date, e))
    })?;

    let entries: Vec<(String, Value)> = match self.title {
      None | Some(Value::Null) | Some(Value::Bool(false)) => Vec::new(),
      Some(Value::Object(map)) => map.into_iter().collect(),
      // Positional pairs are numbered from 1
      Some(Value::Array(items)) => items
        .into_iter()
        .enumerate()
        .map(|(i, v)| ((i + 1).to_string(), v))
        .collect(),
      Some(other) => {
        return Err(FetchError::UnexpectedShape(format!(
          "pairs for {} are neither a map nor a list: {}",
          raw_date, other
        )))
      }
    };

    let pairs = entries
      .into_iter()
      .map(|(number, value)| {
        let pair = match value {
          Value::Object(_) => serde_json::from_value::<ApiPair>(value).unwrap_or_default(),
          other => {
            debug!(pair = %number, date = %raw_date, value = %other, "malformed pair has no lessons");
            ApiPair::default()
          }
        };
        Pair {
          number,
          lessons: pair.lessons.into_iter().map(ApiLesson::into_lesson).collect(),
        }
      })
      .collect();

    Ok(DayEntry { date, pairs })
  }
}

/// Decode a raw calendar document for `group`.
///
/// A JSON `null` document is how the site says it has no calendar for the group.
pub fn parse_payload(bytes: &[u8], group: &GroupKey) -> FetchOutcome<SchedulePayload> {
  let document: Value = serde_json::from_slice(bytes)
    .map_err(|e| FetchError::UnexpectedShape(format!("invalid JSON: {}", e)))?;
  parse_document(document, group)
}

/// Decode an already-parsed calendar document for `group`.
pub fn parse_document(document: Value, group: &GroupKey) -> FetchOutcome<SchedulePayload> {
  match document {
    Value::Null => Err(FetchError::NotFound {
      group: group.to_string(),
    }),
    Value::Array(items) => {
      let days = items
        .into_iter()
        .map(|item| {
          let day: ApiDay = serde_json::from_value(item)
            .map_err(|e| FetchError::UnexpectedShape(format!("calendar day: {}", e)))?;
          day.into_day()
        })
        .collect::<FetchOutcome<Vec<DayEntry>>>()?;
      Ok(SchedulePayload { days })
    }
    other => Err(FetchError::UnexpectedShape(format!(
      "expected an array of days, got {}",
      json_kind(&other)
    ))),
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn group() -> GroupKey {
    GroupKey::parse("ИСТ-24-1").unwrap()
  }

  #[test]
  fn test_full_lesson_decodes() {
    let doc = json!([{
      "date": "2025-03-10",
      "title": {
        "1": {
          "lessons": [{
            "subgroup": { "subgroup_numbers": 2 },
            "couple": { "time": "08:30-10:00", "couple_type": "лек." },
            "discipline": "Математика",
            "teacher": { "name": "Иванов И.И." },
            "place": { "cabinet": "101", "housing": { "address": "ул. Ульянова, 1" } }
          }]
        }
      }
    }]);

    let payload = parse_document(doc, &group()).unwrap();
    let lesson = &payload.days[0].pairs[0].lessons[0];
    assert_eq!(lesson.subgroup_numbers.as_deref(), Some("2"));
    assert_eq!(lesson.time_range.as_deref(), Some("08:30-10:00"));
    assert_eq!(lesson.lesson_type_code.as_deref(), Some("лек."));
    assert_eq!(lesson.teacher_name.as_deref(), Some("Иванов И.И."));
    assert_eq!(lesson.building_address.as_deref(), Some("ул. Ульянова, 1"));
  }

  #[test]
  fn test_pair_order_follows_document() {
    let doc = json!([{
      "date": "2025-03-10",
      "title": { "3": { "lessons": [] }, "10": { "lessons": [] }, "2": { "lessons": [] } }
    }]);

    let payload = parse_document(doc, &group()).unwrap();
    let numbers: Vec<&str> = payload.days[0].pairs.iter().map(|p| p.number.as_str()).collect();
    assert_eq!(numbers, vec!["3", "10", "2"]);
  }

  #[test]
  fn test_free_day_variants() {
    let doc = json!([
      { "date": "2025-03-10", "title": null },
      { "date": "2025-03-11", "title": [] },
      { "date": "2025-03-12", "title": {} },
      { "date": "2025-03-13" }
    ]);

    let payload = parse_document(doc, &group()).unwrap();
    assert_eq!(payload.days.len(), 4);
    assert!(payload.days.iter().all(|d| d.pairs.is_empty()));
  }

  #[test]
  fn test_non_object_subgroup_is_unspecified() {
    let doc = json!([{
      "date": "2025-03-10",
      "title": { "1": { "lessons": [{ "subgroup": "все", "discipline": "Физика" }] } }
    }]);

    let payload = parse_document(doc, &group()).unwrap();
    let lesson = &payload.days[0].pairs[0].lessons[0];
    assert!(lesson.subgroup_numbers.is_none());
    assert_eq!(lesson.discipline.as_deref(), Some("Физика"));
  }

  #[test]
  fn test_null_document_is_not_found() {
    let err = parse_payload(b"null", &group()).unwrap_err();
    assert_eq!(
      err,
      FetchError::NotFound {
        group: "ИСТ-24-1".to_string()
      }
    );
  }

  #[test]
  fn test_bad_shapes_are_rejected() {
    assert!(matches!(
      parse_payload(b"{\"days\": []}", &group()),
      Err(FetchError::UnexpectedShape(_))
    ));
    assert!(matches!(
      parse_payload(b"<html>", &group()),
      Err(FetchError::UnexpectedShape(_))
    ));
    assert!(matches!(
      parse_document(json!([{ "date": "10.03.2025" }]), &group()),
      Err(FetchError::UnexpectedShape(_))
    ));
  }

  #[test]
  fn test_wrong_typed_lesson_fields_are_unspecified() {
    let doc = json!([
      {
        "date": "2025-03-10",
        "title": { "1": { "lessons": [{ "discipline": "Алгебра", "teacher": { "name": "Петров П.П." } }] } }
      },
      {
        "date": "2025-03-11",
        "title": {
          "1": {
            "lessons": [{
              "couple": "08:30",
              "discipline": "Физика",
              "teacher": "Иванов И.И.",
              "place": { "cabinet": 12, "housing": "главный" }
            }]
          },
          "2": { "lessons": [{ "discipline": "Химия", "place": ["101"] }] }
        }
      }
    ]);

    let payload = parse_document(doc, &group()).unwrap();

    let monday = &payload.days[0].pairs[0].lessons[0];
    assert_eq!(monday.teacher_name.as_deref(), Some("Петров П.П."));

    let physics = &payload.days[1].pairs[0].lessons[0];
    assert_eq!(physics.discipline.as_deref(), Some("Физика"));
    assert!(physics.time_range.is_none());
    assert!(physics.lesson_type_code.is_none());
    assert!(physics.teacher_name.is_none());
    assert_eq!(physics.cabinet.as_deref(), Some("12"));
    assert!(physics.building_address.is_none());

    let chemistry = &payload.days[1].pairs[1].lessons[0];
    assert_eq!(chemistry.discipline.as_deref(), Some("Химия"));
    assert!(chemistry.cabinet.is_none());
  }

  #[test]
  fn test_malformed_lesson_lists_are_tolerated() {
    let doc = json!([{
      "date": "2025-03-10",
      "title": {
        "1": { "lessons": null },
        "2": { "lessons": "нет" },
        "3": { "lessons": [null, "Физкультура", { "discipline": "История" }] },
        "4": "перенос"
      }
    }]);

    let payload = parse_document(doc, &group()).unwrap();
    let pairs = &payload.days[0].pairs;
    assert_eq!(pairs.len(), 4);
    assert!(pairs[0].lessons.is_empty());
    assert!(pairs[1].lessons.is_empty());
    assert_eq!(pairs[2].lessons.len(), 1);
    assert_eq!(pairs[2].lessons[0].discipline.as_deref(), Some("История"));
    assert!(pairs[3].lessons.is_empty());
  }
}
