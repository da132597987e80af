//! Conversation state: which group the user picked and what to do with each line.
//!
//! The dialog never fetches anything itself. It turns a line of input into
//! effects, and the app carries out the fetches in the background.

use chrono::{Days, NaiveDate};

use crate::commands::{self, CommandKind};
use crate::schedule::GroupKey;

pub const GREETING: &str = "👋 Привет! Напиши название своей группы (например ИСТ-24-1)";
pub const ENTER_GROUP_MANUALLY: &str =
  "❗️Пожалуйста, введите название группы вручную, например: `ИСТ-24-1`";
pub const GROUP_REQUIRED: &str = "❗️Сначала введите группу через /start.";
pub const PICK_DATE: &str = "📅 Введите дату (ГГГГ-ММ-ДД или ДД.ММ.ГГГГ)";
pub const BAD_DATE: &str = "❗️Не понял дату, нужен формат ГГГГ-ММ-ДД или ДД.ММ.ГГГГ";
pub const NOT_UNDERSTOOD: &str =
  "😳 Я вас не понял. Выбери действие из меню, чтобы получить расписание.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogState {
  AskGroup,
  Ready { group: GroupKey },
  /// `date` was sent without a date; the next line should be one
  AwaitingDate { group: GroupKey },
}

/// Something the app should do in response to a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
  Say(String),
  Fetch { group: GroupKey, date: NaiveDate },
  ShowStatus,
  Quit,
}

#[derive(Debug)]
pub struct Dialog {
  state: DialogState,
}

impl Default for Dialog {
  fn default() -> Self {
    Self::new()
  }
}

impl Dialog {
  pub fn new() -> Self {
    Self {
      state: DialogState::AskGroup,
    }
  }

  /// Dialog that already knows its group.
  pub fn with_group(group: GroupKey) -> Self {
    Self {
      state: DialogState::Ready { group },
    }
  }

  #[cfg(test)]
  pub fn state(&self) -> &DialogState {
    &self.state
  }

  pub fn greeting(&self) -> Vec<Effect> {
    match &self.state {
      DialogState::AskGroup => vec![Effect::Say(GREETING.to_string())],
      DialogState::Ready { group } | DialogState::AwaitingDate { group } => vec![
        Effect::Say(format!("✅ Группа установлена: {}", group)),
        Effect::Say(commands::menu()),
      ],
    }
  }

  /// Handle one line of input. `today` is the caller's local date.
  pub fn handle(&mut self, line: &str, today: NaiveDate) -> Vec<Effect> {
    let line = line.trim();
    if line.is_empty() {
      return Vec::new();
    }

    if let DialogState::AwaitingDate { group } = &self.state {
      if let Some(date) = parse_date(line) {
        let group = group.clone();
        self.state = DialogState::Ready {
          group: group.clone(),
        };
        return fetch_effects(group, date, format!("📡 Загружаю расписание на {}", date));
      }
      if commands::parse(line).is_none() {
        return vec![Effect::Say(BAD_DATE.to_string())];
      }
      // A command abandons the date prompt
      self.state = DialogState::Ready {
        group: group.clone(),
      };
    }

    let invocation = commands::parse(line);

    if self.state == DialogState::AskGroup {
      return match invocation.map(|i| i.kind) {
        Some(CommandKind::Start) | Some(CommandKind::Help) => self.greeting(),
        Some(CommandKind::Quit) => vec![Effect::Quit],
        Some(CommandKind::Group) => {
          let arg = invocation.map(|i| i.arg).unwrap_or_default();
          self.set_group(arg)
        }
        Some(_) => vec![Effect::Say(ENTER_GROUP_MANUALLY.to_string())],
        None => self.set_group(line),
      };
    }

    let Some(invocation) = invocation else {
      let mut reply = NOT_UNDERSTOOD.to_string();
      if let Some(suggestion) = commands::get_suggestions(line).first() {
        reply.push_str(&format!(" Может быть, `{}`?", suggestion.name));
      }
      return vec![Effect::Say(reply), Effect::Say(commands::menu())];
    };

    match invocation.kind {
      CommandKind::Start => {
        self.state = DialogState::AskGroup;
        self.greeting()
      }
      CommandKind::Group => self.set_group(invocation.arg),
      CommandKind::Today => self.fetch_for(today, "📡 Получаю расписание на сегодня".to_string()),
      CommandKind::Tomorrow => {
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
        self.fetch_for(tomorrow, "📡 Получаю расписание на завтра".to_string())
      }
      CommandKind::Date if invocation.arg.is_empty() => match self.current_group() {
        Some(group) => {
          self.state = DialogState::AwaitingDate { group };
          vec![Effect::Say(PICK_DATE.to_string())]
        }
        None => vec![Effect::Say(GROUP_REQUIRED.to_string())],
      },
      CommandKind::Date => match parse_date(invocation.arg) {
        Some(date) => self.fetch_for(date, format!("📡 Загружаю расписание на {}", date)),
        None => vec![Effect::Say(BAD_DATE.to_string())],
      },
      CommandKind::Status => vec![Effect::ShowStatus],
      CommandKind::Help => vec![Effect::Say(commands::menu())],
      CommandKind::Quit => vec![Effect::Quit],
    }
  }

  fn current_group(&self) -> Option<GroupKey> {
    match &self.state {
      DialogState::AskGroup => None,
      DialogState::Ready { group } | DialogState::AwaitingDate { group } => Some(group.clone()),
    }
  }

  fn set_group(&mut self, raw: &str) -> Vec<Effect> {
    match GroupKey::parse(raw) {
      Some(group) => {
        self.state = DialogState::Ready { group };
        self.greeting()
      }
      None => {
        self.state = DialogState::AskGroup;
        self.greeting()
      }
    }
  }

  fn fetch_for(&self, date: NaiveDate, progress: String) -> Vec<Effect> {
    match self.current_group() {
      Some(group) => fetch_effects(group, date, progress),
      None => vec![Effect::Say(GROUP_REQUIRED.to_string())],
    }
  }
}

fn fetch_effects(group: GroupKey, date: NaiveDate, progress: String) -> Vec<Effect> {
  vec![Effect::Say(progress), Effect::Fetch { group, date }]
}

/// Accepts `YYYY-MM-DD` or `DD.MM.YYYY`.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
  let input = input.trim();
  NaiveDate::parse_from_str(input, "%Y-%m-%d")
    .or_else(|_| NaiveDate::parse_from_str(input, "%d.%m.%Y"))
    .ok()
}
