mod app;
mod cache;
mod commands;
mod config;
mod dialog;
mod event;
mod logging;
mod schedule;

use chrono::{Days, Local, NaiveDate};
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::io::BufReader;
use std::path::PathBuf;

use crate::schedule::{FetchPool, GroupKey, ScheduleClient};

#[derive(Parser, Debug)]
#[command(name = "timetable")]
#[command(about = "Class schedules for a student group, cached and coalesced")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./timetable.yaml or $XDG_CONFIG_HOME/timetable/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Group to look up; with this set, print one report and exit
  #[arg(short, long)]
  group: Option<String>,

  /// Date to show (YYYY-MM-DD or DD.MM.YYYY)
  #[arg(short, long, conflicts_with_all = ["today", "tomorrow"])]
  date: Option<String>,

  /// Show today's schedule (default)
  #[arg(long, conflicts_with = "tomorrow")]
  today: bool,

  /// Show tomorrow's schedule
  #[arg(long)]
  tomorrow: bool,

  /// Read calendars from a JSON file instead of the configured source
  #[arg(long)]
  source_file: Option<PathBuf>,

  /// Keep the interactive dialog open after choosing --group
  #[arg(short, long)]
  interactive: bool,
}

impl Args {
  fn target_date(&self) -> Result<NaiveDate> {
    let today = Local::now().date_naive();
    if let Some(raw) = &self.date {
      return dialog::parse_date(raw).ok_or_else(|| eyre!("Invalid date '{}'", raw));
    }
    if self.tomorrow && !self.today {
      return today
        .checked_add_days(Days::new(1))
        .ok_or_else(|| eyre!("Date out of range"));
    }
    Ok(today)
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override source if specified on command line
  let config = if let Some(path) = args.source_file.clone() {
    config::Config {
      source: Some(config::SourceConfig::File { path }),
      ..config
    }
  } else {
    config
  };

  let _log_guard = logging::init(&config.log)?;

  let source = config.build_source()?;
  let pool = FetchPool::new(config.pool.workers, config.fetch_timeout());
  let client = ScheduleClient::new(source, pool, config.ttl());

  let group = match &args.group {
    Some(raw) => Some(GroupKey::parse(raw).ok_or_else(|| eyre!("Group name is empty"))?),
    None => None,
  };

  match group {
    Some(group) if !args.interactive => {
      let date = args.target_date()?;
      match client.schedule_text(&group, date).await {
        Ok(text) => println!("{}", text),
        Err(e) => {
          tracing::error!(%group, error = %e, "schedule request failed");
          return Err(eyre!("{} ({})", e.user_message(), e));
        }
      }
    }
    group => {
      let events = event::EventHandler::new(BufReader::new(std::io::stdin()));
      let mut app = app::App::new(client, tokio::io::stdout());
      if let Some(group) = group {
        app = app.with_group(group);
      }
      app.run(events).await?;
    }
  }

  Ok(())
}
