use std::io::BufRead;
use tokio::sync::mpsc;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// A line typed by the user
  Line(String),
  /// Input stream ended
  InputClosed,
  /// A background schedule request finished with this reply
  Reply(String),
}

/// Event handler that merges user input with replies from background tasks
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler reading lines from `input`
  pub fn new<R>(input: R) -> Self
  where
    R: BufRead + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();

    let input_tx = tx.clone();
    std::thread::spawn(move || {
      for line in input.lines() {
        match line {
          Ok(line) => {
            if input_tx.send(Event::Line(line)).is_err() {
              return;
            }
          }
          Err(_) => break,
        }
      }
      let _ = input_tx.send(Event::InputClosed);
    });

    Self { tx, rx }
  }

  /// Sender for background tasks
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
