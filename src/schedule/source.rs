//! Blocking sources of raw calendar data.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::api_types::{parse_document, parse_payload};
use super::error::{FetchError, FetchOutcome};
use super::types::{GroupKey, SchedulePayload};

/// Placeholder replaced by the group key in command arguments.
pub const GROUP_PLACEHOLDER: &str = "{group}";

/// How often a running scraper is checked for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// One blocking fetch of the full calendar for a group.
///
/// Every call is independent; implementations must not share mutable
/// session state between calls.
pub trait RawScheduleSource: Send + Sync + 'static {
  fn fetch(&self, group: &GroupKey) -> FetchOutcome<SchedulePayload>;

  /// Short label for logs.
  fn describe(&self) -> String;
}

// ============================================================================
// External scraper program
// ============================================================================

/// Runs an external scraper (e.g. a headless browser script) per fetch and
/// reads the calendar JSON from its stdout.
///
/// A scraper still running after `timeout` is killed and the fetch fails
/// with `FetchError::Timeout`.
#[derive(Debug, Clone)]
pub struct CommandSource {
  program: String,
  args: Vec<String>,
  timeout: Duration,
}

impl CommandSource {
  pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
    Self {
      program: program.into(),
      args,
      timeout,
    }
  }

  fn args_for(&self, group: &GroupKey) -> Vec<String> {
    let mut args: Vec<String> = self
      .args
      .iter()
      .map(|a| a.replace(GROUP_PLACEHOLDER, group.as_str()))
      .collect();
    if !self.args.iter().any(|a| a.contains(GROUP_PLACEHOLDER)) {
      args.push(group.to_string());
    }
    args
  }

  fn wait_with_deadline(&self, child: &mut Child) -> FetchOutcome<ExitStatus> {
    let deadline = Instant::now() + self.timeout;
    loop {
      match child.try_wait() {
        Ok(Some(status)) => return Ok(status),
        Ok(None) if Instant::now() >= deadline => {
          warn!(program = %self.program, timeout = ?self.timeout, "scraper timed out, killing it");
          let _ = child.kill();
          let _ = child.wait();
          return Err(FetchError::Timeout(self.timeout));
        }
        Ok(None) => std::thread::sleep(POLL_INTERVAL),
        Err(e) => {
          let _ = child.kill();
          return Err(FetchError::SourceUnavailable(format!(
            "failed to wait for {}: {}",
            self.program, e
          )));
        }
      }
    }
  }
}

/// Read a child pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
  pipe.map(|mut pipe| {
    std::thread::spawn(move || {
      let mut buf = Vec::new();
      let _ = pipe.read_to_end(&mut buf);
      buf
    })
  })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
  reader.and_then(|r| r.join().ok()).unwrap_or_default()
}

impl RawScheduleSource for CommandSource {
  fn fetch(&self, group: &GroupKey) -> FetchOutcome<SchedulePayload> {
    let args = self.args_for(group);
    debug!(program = %self.program, ?args, "running scraper");

    let mut child = Command::new(&self.program)
      .args(&args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|e| {
        FetchError::SourceUnavailable(format!("failed to run {}: {}", self.program, e))
      })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    // On timeout the readers are left behind; they end once the pipes close
    let status = self.wait_with_deadline(&mut child)?;
    let stdout = collect(stdout);

    if !status.success() {
      let stderr = collect(stderr);
      let stderr = String::from_utf8_lossy(&stderr);
      let excerpt: String = stderr.trim().chars().take(200).collect();
      return Err(FetchError::SourceUnavailable(format!(
        "{} exited with {}: {}",
        self.program, status, excerpt
      )));
    }

    if stdout.iter().all(u8::is_ascii_whitespace) {
      return Err(FetchError::NotFound {
        group: group.to_string(),
      });
    }

    parse_payload(&stdout, group)
  }

  fn describe(&self) -> String {
    format!("command {}", self.program)
  }
}

// ============================================================================
// HTTP scraping sidecar
// ============================================================================

/// Fetches calendar JSON from an HTTP endpoint, passing the group as a query
/// parameter.
#[derive(Debug, Clone)]
pub struct HttpSource {
  url: url::Url,
  query_param: String,
  timeout: Duration,
}

impl HttpSource {
  pub fn new(url: &str, query_param: impl Into<String>, timeout: Duration) -> FetchOutcome<Self> {
    let url = url::Url::parse(url)
      .map_err(|e| FetchError::SourceUnavailable(format!("invalid source url '{}': {}", url, e)))?;
    Ok(Self {
      url,
      query_param: query_param.into(),
      timeout,
    })
  }
}

impl RawScheduleSource for HttpSource {
  fn fetch(&self, group: &GroupKey) -> FetchOutcome<SchedulePayload> {
    // A fresh client per call keeps fetches free of shared connection state
    let client = reqwest::blocking::Client::builder()
      .timeout(self.timeout)
      .build()
      .map_err(|e| FetchError::SourceUnavailable(format!("failed to build client: {}", e)))?;

    let response = client
      .get(self.url.clone())
      .query(&[(self.query_param.as_str(), group.as_str())])
      .send()
      .map_err(|e| {
        if e.is_timeout() {
          FetchError::Timeout(self.timeout)
        } else {
          FetchError::SourceUnavailable(e.to_string())
        }
      })?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
      return Err(FetchError::NotFound {
        group: group.to_string(),
      });
    }
    if !status.is_success() {
      return Err(FetchError::SourceUnavailable(format!(
        "{} answered {}",
        self.url, status
      )));
    }

    let body = response.bytes().map_err(|e| {
      if e.is_timeout() {
        FetchError::Timeout(self.timeout)
      } else {
        FetchError::SourceUnavailable(format!("failed to read response: {}", e))
      }
    })?;

    parse_payload(&body, group)
  }

  fn describe(&self) -> String {
    format!("http {}", self.url)
  }
}

// ============================================================================
// Local fixture file
// ============================================================================

/// Reads calendars from a JSON file shaped `{ "<GROUP>": <calendar> }`.
///
/// The file is re-read on every fetch so edits show up after the TTL.
#[derive(Debug, Clone)]
pub struct FileSource {
  path: PathBuf,
}

impl FileSource {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

impl RawScheduleSource for FileSource {
  fn fetch(&self, group: &GroupKey) -> FetchOutcome<SchedulePayload> {
    let contents = std::fs::read(&self.path).map_err(|e| {
      FetchError::SourceUnavailable(format!("failed to read {}: {}", self.path.display(), e))
    })?;

    let calendars: Map<String, Value> = serde_json::from_slice(&contents)
      .map_err(|e| FetchError::UnexpectedShape(format!("{}: {}", self.path.display(), e)))?;

    // Fixture keys are normalized the same way as user input; the first match wins
    let document = calendars
      .into_iter()
      .find(|(name, _)| GroupKey::parse(name).as_ref() == Some(group))
      .map(|(_, document)| document)
      .ok_or_else(|| FetchError::NotFound {
        group: group.to_string(),
      })?;

    info!(%group, path = %self.path.display(), "loaded calendar from file");
    parse_document(document, group)
  }

  fn describe(&self) -> String {
    format!("file {}", self.path.display())
  }
}
