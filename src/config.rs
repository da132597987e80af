use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::schedule::{CommandSource, FileSource, HttpSource, RawScheduleSource};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub pool: PoolConfig,
  pub source: Option<SourceConfig>,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds a fetched calendar stays fresh
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_secs: default_ttl_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
  /// Concurrent upstream fetches (browser sessions)
  #[serde(default = "default_workers")]
  pub workers: usize,
  /// Upper bound on a single upstream fetch
  #[serde(default = "default_fetch_timeout_secs")]
  pub fetch_timeout_secs: u64,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      workers: default_workers(),
      fetch_timeout_secs: default_fetch_timeout_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
  /// External scraper program; `{group}` in args is replaced by the group
  Command {
    program: String,
    #[serde(default)]
    args: Vec<String>,
  },
  /// HTTP endpoint returning calendar JSON
  Http {
    url: String,
    #[serde(default = "default_query_param")]
    query_param: String,
    #[serde(default = "default_fetch_timeout_secs")]
    timeout_secs: u64,
  },
  /// JSON file of calendars keyed by group
  File { path: PathBuf },
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Default filter when TIMETABLE_LOG is unset
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Log directory (defaults to the user data directory)
  pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      dir: None,
    }
  }
}

fn default_ttl_secs() -> u64 {
  1200
}

fn default_workers() -> usize {
  2
}

fn default_fetch_timeout_secs() -> u64 {
  60
}

fn default_query_param() -> String {
  "group".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./timetable.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/timetable/config.yaml
  ///
  /// Without any file the defaults apply.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };
    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("timetable.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("timetable").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.cache.ttl_secs == 0 {
      return Err(eyre!("cache.ttl_secs must be at least 1"));
    }
    if self.pool.workers == 0 {
      return Err(eyre!("pool.workers must be at least 1"));
    }
    if self.pool.fetch_timeout_secs == 0 {
      return Err(eyre!("pool.fetch_timeout_secs must be at least 1"));
    }
    Ok(())
  }

  pub fn ttl(&self) -> Duration {
    Duration::from_secs(self.cache.ttl_secs)
  }

  pub fn fetch_timeout(&self) -> Duration {
    Duration::from_secs(self.pool.fetch_timeout_secs)
  }

  /// Build the configured schedule source.
  pub fn build_source(&self) -> Result<Arc<dyn RawScheduleSource>> {
    let source: Arc<dyn RawScheduleSource> = match &self.source {
      Some(SourceConfig::Command { program, args }) => {
        Arc::new(CommandSource::new(
          program.clone(),
          args.clone(),
          self.fetch_timeout(),
        ))
      }
      Some(SourceConfig::Http {
        url,
        query_param,
        timeout_secs,
      }) => Arc::new(
        HttpSource::new(url, query_param.clone(), Duration::from_secs(*timeout_secs))
          .map_err(|e| eyre!("Invalid http source: {}", e))?,
      ),
      Some(SourceConfig::File { path }) => Arc::new(FileSource::new(path.clone())),
      None => {
        return Err(eyre!(
          "No schedule source configured. Add a `source` section to timetable.yaml\n\
                 or pass --source-file <calendars.json>."
        ))
      }
    };
    Ok(source)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::from_yaml("{}").unwrap();
    assert_eq!(config.cache.ttl_secs, 1200);
    assert_eq!(config.pool.workers, 2);
    assert_eq!(config.pool.fetch_timeout_secs, 60);
    assert_eq!(config.log.level, "info");
    assert!(config.source.is_none());
    assert!(config.build_source().is_err());
  }

  #[test]
  fn test_command_source_section() {
    let config = Config::from_yaml(
      r#"
cache:
  ttl_secs: 600
pool:
  workers: 3
  fetch_timeout_secs: 45
source:
  kind: command
  program: python3
  args: ["scrape.py", "--group", "{group}"]
"#,
    )
    .unwrap();

    assert_eq!(config.ttl(), Duration::from_secs(600));
    assert_eq!(config.pool.workers, 3);
    assert_eq!(config.fetch_timeout(), Duration::from_secs(45));
    assert_eq!(
      config.source,
      Some(SourceConfig::Command {
        program: "python3".to_string(),
        args: vec![
          "scrape.py".to_string(),
          "--group".to_string(),
          "{group}".to_string()
        ],
      })
    );
    assert!(config.build_source().is_ok());
  }

  #[test]
  fn test_http_source_defaults() {
    let config = Config::from_yaml(
      r#"
source:
  kind: http
  url: http://localhost:8080/calendar
"#,
    )
    .unwrap();

    assert_eq!(
      config.source,
      Some(SourceConfig::Http {
        url: "http://localhost:8080/calendar".to_string(),
        query_param: "group".to_string(),
        timeout_secs: 60,
      })
    );
    assert!(config.build_source().is_ok());
  }

  #[test]
  fn test_invalid_http_url_is_rejected() {
    let config = Config::from_yaml(
      r#"
source:
  kind: http
  url: "not a url"
"#,
    )
    .unwrap();
    assert!(config.build_source().is_err());
  }

  #[test]
  fn test_zero_workers_is_invalid() {
    let config = Config::from_yaml("pool:\n  workers: 0\n").unwrap();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_unknown_source_kind_fails_to_parse() {
    assert!(Config::from_yaml("source:\n  kind: selenium\n").is_err());
  }
}
