//! Rendering a fetched calendar into the text report for one date.

use std::fmt::Write;

use chrono::NaiveDate;

use super::types::{Lesson, SchedulePayload};

pub const SUBGROUP_UNSPECIFIED: &str = "Подгруппа не указана";
pub const TIME_UNKNOWN: &str = "время неизвестно";
pub const DISCIPLINE_UNKNOWN: &str = "предмет неизвестен";
pub const TEACHER_UNKNOWN: &str = "преподаватель неизвестен";
pub const CABINET_UNSPECIFIED: &str = "кабинет не указан";
pub const ADDRESS_UNSPECIFIED: &str = "адрес не указан";
pub const LESSON_TYPE_UNSPECIFIED: &str = "не указано";
pub const NO_CLASSES: &str = "📭 Занятий нет.";

/// Human label for a lesson type code. Unknown codes are shown as-is.
pub fn lesson_type_label(code: &str) -> &str {
  match code {
    "лек." => "🟩 Лекция",
    "прак." => "🟦 Практика",
    "лаб. р." => "🟧 Лабораторная",
    "зач." => "🟧 Зачет",
    "экз." => "🟥 Экзамен",
    "КСР" => "🟦 КСР",
    "кон." => "🟦 Контрольная",
    other => other,
  }
}

/// Message returned when the calendar has no entry at all for `date`.
pub fn not_found_message(date: NaiveDate) -> String {
  format!("📅 На {} занятий не найдено.", date.format("%Y-%m-%d"))
}

/// Render the report for `date`.
///
/// Never fails: missing lesson fields are replaced by placeholders.
pub fn render(payload: &SchedulePayload, date: NaiveDate) -> String {
  let Some(day) = payload.day(date) else {
    return not_found_message(date);
  };

  let mut message = format!("📅 Расписание на {}:\n", date.format("%Y-%m-%d"));

  if day.pairs.is_empty() {
    message.push('\n');
    message.push_str(NO_CLASSES);
    return message;
  }

  for pair in &day.pairs {
    for lesson in &pair.lessons {
      render_lesson(&mut message, &pair.number, lesson);
    }
  }

  message
}

fn render_lesson(out: &mut String, pair_number: &str, lesson: &Lesson) {
  let subgroup = match &lesson.subgroup_numbers {
    Some(n) => format!("Подгруппа: {}", n),
    None => SUBGROUP_UNSPECIFIED.to_string(),
  };
  let lesson_type = lesson
    .lesson_type_code
    .as_deref()
    .map(lesson_type_label)
    .unwrap_or(LESSON_TYPE_UNSPECIFIED);

  let _ = write!(
    out,
    "\n🕒 Пара №{} ({})\n📚 {}\n{}\n👥 {}\n👨‍🏫 {}\n🏫 {}, {}\n",
    pair_number,
    lesson.time_range.as_deref().unwrap_or(TIME_UNKNOWN),
    lesson.discipline.as_deref().unwrap_or(DISCIPLINE_UNKNOWN),
    lesson_type,
    subgroup,
    lesson.teacher_name.as_deref().unwrap_or(TEACHER_UNKNOWN),
    lesson.cabinet.as_deref().unwrap_or(CABINET_UNSPECIFIED),
    lesson
      .building_address
      .as_deref()
      .unwrap_or(ADDRESS_UNSPECIFIED),
  );
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schedule::types::{DayEntry, Pair};

  const PLACEHOLDERS: &[&str] = &[
    SUBGROUP_UNSPECIFIED,
    TIME_UNKNOWN,
    DISCIPLINE_UNKNOWN,
    TEACHER_UNKNOWN,
    CABINET_UNSPECIFIED,
    ADDRESS_UNSPECIFIED,
    LESSON_TYPE_UNSPECIFIED,
  ];

  fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
  }

  fn full_lesson() -> Lesson {
    Lesson {
      subgroup_numbers: Some("1".to_string()),
      time_range: Some("08:30-10:00".to_string()),
      discipline: Some("Математический анализ".to_string()),
      teacher_name: Some("Петрова А.С.".to_string()),
      cabinet: Some("305".to_string()),
      building_address: Some("ул. Ульянова, 1".to_string()),
      lesson_type_code: Some("лек.".to_string()),
    }
  }

  fn payload_with(pairs: Vec<Pair>) -> SchedulePayload {
    SchedulePayload {
      days: vec![DayEntry {
        date: date(10),
        pairs,
      }],
    }
  }

  #[test]
  fn test_fully_populated_lesson() {
    let payload = payload_with(vec![Pair {
      number: "1".to_string(),
      lessons: vec![full_lesson()],
    }]);

    let text = render(&payload, date(10));
    assert!(text.starts_with("📅 Расписание на 2025-03-10:\n"));
    assert!(text.contains("🟩 Лекция"));
    assert!(text.contains("Математический анализ"));
    assert!(text.contains("Петрова А.С."));
    assert!(text.contains("🏫 305, ул. Ульянова, 1"));
    assert!(text.contains("Подгруппа: 1"));
    assert!(text.contains("Пара №1 (08:30-10:00)"));
    for placeholder in PLACEHOLDERS {
      assert!(!text.contains(placeholder), "unexpected {placeholder}");
    }
  }

  #[test]
  fn test_day_without_pairs() {
    let payload = payload_with(Vec::new());

    let text = render(&payload, date(10));
    assert_eq!(text, format!("📅 Расписание на 2025-03-10:\n\n{}", NO_CLASSES));
    assert_ne!(text, not_found_message(date(10)));
  }

  #[test]
  fn test_missing_date_is_sentinel_only() {
    let payload = payload_with(Vec::new());

    let text = render(&payload, date(11));
    assert_eq!(text, "📅 На 2025-03-11 занятий не найдено.");
  }

  #[test]
  fn test_missing_teacher_and_subgroup() {
    let lesson = Lesson {
      teacher_name: None,
      subgroup_numbers: None,
      ..full_lesson()
    };
    let payload = payload_with(vec![Pair {
      number: "2".to_string(),
      lessons: vec![lesson],
    }]);

    let text = render(&payload, date(10));
    assert!(text.contains(TEACHER_UNKNOWN));
    assert!(text.contains(SUBGROUP_UNSPECIFIED));
    assert!(text.contains("Математический анализ"));
    assert!(text.contains("🏫 305, ул. Ульянова, 1"));
    assert!(text.contains("🟩 Лекция"));
  }

  #[test]
  fn test_empty_lesson_renders_all_placeholders() {
    let payload = payload_with(vec![Pair {
      number: "3".to_string(),
      lessons: vec![Lesson::default()],
    }]);

    let text = render(&payload, date(10));
    for placeholder in PLACEHOLDERS {
      assert!(text.contains(placeholder), "missing {placeholder}");
    }
  }

  #[test]
  fn test_unknown_type_code_is_verbatim() {
    assert_eq!(lesson_type_label("сем."), "сем.");
    assert_eq!(lesson_type_label("экз."), "🟥 Экзамен");
  }

  #[test]
  fn test_pairs_keep_given_order() {
    let payload = payload_with(vec![
      Pair {
        number: "4".to_string(),
        lessons: vec![full_lesson()],
      },
      Pair {
        number: "2".to_string(),
        lessons: vec![full_lesson(), full_lesson()],
      },
    ]);

    let text = render(&payload, date(10));
    let fourth = text.find("Пара №4").unwrap();
    let second = text.find("Пара №2").unwrap();
    assert!(fourth < second);
    assert_eq!(text.matches("Пара №2").count(), 2);
  }

  #[test]
  fn test_render_is_pure() {
    let payload = payload_with(vec![Pair {
      number: "1".to_string(),
      lessons: vec![full_lesson()],
    }]);
    let before = payload.clone();

    let first = render(&payload, date(10));
    let second = render(&payload, date(10));
    assert_eq!(first, second);
    assert_eq!(payload, before);
  }
}
