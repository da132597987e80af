/// Available dialog commands and autocomplete logic

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
  Start,
  Today,
  Tomorrow,
  Date,
  Group,
  Status,
  Help,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub kind: CommandKind,
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    kind: CommandKind::Today,
    name: "today",
    aliases: &["t", "сегодня"],
    description: "🗓 Расписание на сегодня",
  },
  Command {
    kind: CommandKind::Tomorrow,
    name: "tomorrow",
    aliases: &["tm", "завтра"],
    description: "🗓 Расписание на завтра",
  },
  Command {
    kind: CommandKind::Date,
    name: "date",
    aliases: &["d", "дата"],
    description: "🗓 Расписание по дате (date 2025-03-10)",
  },
  Command {
    kind: CommandKind::Group,
    name: "group",
    aliases: &["g", "группа"],
    description: "Сменить группу (group ИСТ-24-1)",
  },
  Command {
    kind: CommandKind::Start,
    name: "start",
    aliases: &["restart", "старт"],
    description: "Начать заново",
  },
  Command {
    kind: CommandKind::Status,
    name: "status",
    aliases: &["st", "статус"],
    description: "Состояние кэша",
  },
  Command {
    kind: CommandKind::Help,
    name: "help",
    aliases: &["h", "?", "помощь"],
    description: "Показать меню",
  },
  Command {
    kind: CommandKind::Quit,
    name: "quit",
    aliases: &["q", "exit", "выход"],
    description: "Выйти",
  },
];

/// A recognized command and the rest of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation<'a> {
  pub kind: CommandKind,
  pub arg: &'a str,
}

/// Recognize a command by exact name or alias, with or without a leading `/`.
///
/// Anything else (including group names) is not a command.
pub fn parse(input: &str) -> Option<Invocation<'_>> {
  let input = input.trim();
  let (word, arg) = match input.split_once(char::is_whitespace) {
    Some((word, rest)) => (word, rest.trim()),
    None => (input, ""),
  };
  let word = word.strip_prefix('/').unwrap_or(word).to_lowercase();

  COMMANDS
    .iter()
    .find(|cmd| cmd.name == word || cmd.aliases.contains(&word.as_str()))
    .map(|cmd| Invocation {
      kind: cmd.kind,
      arg,
    })
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().trim_start_matches('/').to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    // Fuzzy match on alias
    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Menu text listing every command.
pub fn menu() -> String {
  COMMANDS
    .iter()
    .map(|cmd| format!("  {:<9} {}", cmd.name, cmd.description))
    .collect::<Vec<_>>()
    .join("\n")
}
