use crate::dialog::{Dialog, Effect};
use crate::event::{Event, EventHandler};
use crate::schedule::{GroupKey, ScheduleClient};
use chrono::{Local, NaiveDate};
use color_eyre::Result;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Interactive schedule dialog over a line-based terminal.
pub struct App<W> {
  /// Conversation state
  dialog: Dialog,

  /// Cached schedule client shared with background requests
  client: ScheduleClient,

  /// Where replies are written
  out: W,

  /// Fixed "today" for reproducible sessions
  today: Option<NaiveDate>,

  /// Requests still running in the background
  pending: usize,

  /// Whether the input stream has ended
  input_closed: bool,

  /// Whether to quit
  should_quit: bool,
}

impl<W: AsyncWrite + Unpin> App<W> {
  pub fn new(client: ScheduleClient, out: W) -> Self {
    Self {
      dialog: Dialog::new(),
      client,
      out,
      today: None,
      pending: 0,
      input_closed: false,
      should_quit: false,
    }
  }

  /// Start with a group already chosen.
  pub fn with_group(mut self, group: GroupKey) -> Self {
    self.dialog = Dialog::with_group(group);
    self
  }

  #[cfg(test)]
  pub fn with_today(mut self, today: NaiveDate) -> Self {
    self.today = Some(today);
    self
  }

  #[cfg(test)]
  pub fn into_output(self) -> W {
    self.out
  }

  fn today(&self) -> NaiveDate {
    self.today.unwrap_or_else(|| Local::now().date_naive())
  }

  pub async fn run(&mut self, mut events: EventHandler) -> Result<()> {
    let greeting = self.dialog.greeting();
    self.apply(greeting, &events.sender()).await?;

    // Main loop
    while !self.should_quit {
      let Some(event) = events.next().await else {
        break;
      };
      self.handle_event(event, &events.sender()).await?;

      if self.input_closed && self.pending == 0 {
        break;
      }
    }

    self.out.flush().await?;
    Ok(())
  }

  async fn handle_event(&mut self, event: Event, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
    match event {
      Event::Line(line) => {
        let effects = self.dialog.handle(&line, self.today());
        self.apply(effects, tx).await?;
      }
      Event::Reply(text) => {
        self.pending = self.pending.saturating_sub(1);
        self.say(&text).await?;
      }
      Event::InputClosed => {
        info!(pending = self.pending, "input closed");
        self.input_closed = true;
      }
    }
    Ok(())
  }

  async fn apply(&mut self, effects: Vec<Effect>, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
    for effect in effects {
      match effect {
        Effect::Say(text) => self.say(&text).await?,
        Effect::Fetch { group, date } => self.spawn_request(group, date, tx.clone()),
        Effect::ShowStatus => {
          let status = self.status_text();
          self.say(&status).await?;
        }
        Effect::Quit => self.should_quit = true,
      }
    }
    Ok(())
  }

  /// Run a schedule request in the background; its reply arrives as an event.
  fn spawn_request(&mut self, group: GroupKey, date: NaiveDate, tx: mpsc::UnboundedSender<Event>) {
    let client = self.client.clone();
    self.pending += 1;

    tokio::spawn(async move {
      let reply = match client.schedule_text(&group, date).await {
        Ok(text) => text,
        Err(e) => {
          warn!(%group, %date, error = %e, "schedule request failed");
          e.user_message().to_string()
        }
      };
      let _ = tx.send(Event::Reply(reply));
    });
  }

  fn status_text(&self) -> String {
    let stats = self.client.stats();
    let pool = self.client.pool();
    format!(
      "📦 В кэше групп: {} (свежих: {}), загружается: {}\n⚙️ Свободных потоков: {}/{}, TTL: {} с",
      stats.entries,
      stats.fresh,
      stats.in_flight,
      pool.available(),
      pool.workers(),
      self.client.ttl().as_secs()
    )
  }

  async fn say(&mut self, text: &str) -> Result<()> {
    self.out.write_all(text.as_bytes()).await?;
    self.out.write_all(b"\n").await?;
    self.out.flush().await?;
    Ok(())
  }
}
