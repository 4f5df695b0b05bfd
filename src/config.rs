use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::retry::{Backoff, RetryPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub access: AccessConfig,
  #[serde(default)]
  pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
  /// How long a successful response may be served from memory
  #[serde(default = "default_cache_duration_ms")]
  pub cache_duration_ms: u64,
  /// Per-attempt request timeout
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  #[serde(default)]
  pub retry: RetryConfig,
  /// Send the identity assertion as a bearer token with every request
  #[serde(default)]
  pub send_identity: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
  /// Same delay between every attempt
  #[default]
  Fixed,
  /// Delay doubles per attempt, capped at max_delay_ms
  Exponential,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  #[serde(default = "default_retry_delay_ms")]
  pub delay_ms: u64,
  #[serde(default)]
  pub backoff: BackoffKind,
  #[serde(default = "default_max_delay_ms")]
  pub max_delay_ms: u64,
  #[serde(default)]
  pub jitter: bool,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_retries: default_max_retries(),
      delay_ms: default_retry_delay_ms(),
      backoff: BackoffKind::Fixed,
      max_delay_ms: default_max_delay_ms(),
      jitter: false,
    }
  }
}

impl RetryConfig {
  pub fn policy(&self) -> RetryPolicy {
    let backoff = match self.backoff {
      BackoffKind::Fixed => Backoff::Fixed,
      BackoffKind::Exponential => Backoff::Exponential {
        max_delay: Duration::from_millis(self.max_delay_ms),
        jitter: self.jitter,
      },
    };
    RetryPolicy {
      max_retries: self.max_retries,
      delay: Duration::from_millis(self.delay_ms),
      backoff,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessConfig {
  /// Expected audience of identity assertions (the OAuth client id)
  pub client_id: Option<String>,
  /// Emails allowed to sign in (case-insensitive)
  #[serde(default, deserialize_with = "deserialize_lowercase_set")]
  pub allowed_emails: BTreeSet<String>,
  /// Emails that also see the financial tabs
  #[serde(default, deserialize_with = "deserialize_lowercase_set")]
  pub admin_emails: BTreeSet<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default = "default_month_names")]
  pub month_names: Vec<String>,
  /// Fixed colors per employee name, as "#RRGGBB"
  #[serde(default)]
  pub employee_colors: BTreeMap<String, String>,
  /// Fallback colors for series without a fixed color
  #[serde(default = "default_palette")]
  pub palette: Vec<String>,
  #[serde(default = "default_toast_duration_ms")]
  pub toast_duration_ms: u64,
}

impl Default for DisplayConfig {
  fn default() -> Self {
    Self {
      title: None,
      month_names: default_month_names(),
      employee_colors: BTreeMap::new(),
      palette: default_palette(),
      toast_duration_ms: default_toast_duration_ms(),
    }
  }
}

impl DisplayConfig {
  /// Month name for a 1-based month number
  pub fn month_name(&self, month: u32) -> &str {
    month
      .checked_sub(1)
      .and_then(|i| self.month_names.get(i as usize))
      .map(String::as_str)
      .unwrap_or("?")
  }
}

fn deserialize_lowercase_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let v: Vec<String> = Vec::deserialize(deserializer)?;
  Ok(v.into_iter().map(|s| s.trim().to_lowercase()).collect())
}

fn default_cache_duration_ms() -> u64 {
  300_000
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_max_retries() -> u32 {
  3
}

fn default_retry_delay_ms() -> u64 {
  1_000
}

fn default_max_delay_ms() -> u64 {
  8_000
}

fn default_toast_duration_ms() -> u64 {
  3_000
}

fn default_month_names() -> Vec<String> {
  [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

fn default_palette() -> Vec<String> {
  [
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899", "#14b8a6", "#f97316",
    "#6366f1", "#84cc16",
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./tally.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/tally/config.yaml
  /// 4. ~/.config/tally/config.yaml
  ///
  /// `TALLY_API_URL` overrides `api.url` after loading.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => {
        return Err(eyre!(
          "No configuration file found. Create one at ~/.config/tally/config.yaml\n\
                 See config.example.yaml for the format."
        ))
      }
    };

    if let Ok(url) = std::env::var("TALLY_API_URL") {
      config.api.url = url;
    }
    config.validate()?;

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("tally.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("tally").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    // Check ~/.config explicitly (for macOS where config_dir differs)
    if let Some(home) = dirs::home_dir() {
      let home_path = home.join(".config").join("tally").join("config.yaml");
      if home_path.exists() {
        return Some(home_path);
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

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    url::Url::parse(&self.api.url)
      .map_err(|e| eyre!("Invalid api.url '{}': {}", self.api.url, e))?;
    if self.display.month_names.len() != 12 {
      return Err(eyre!(
        "display.month_names must list 12 months, got {}",
        self.display.month_names.len()
      ));
    }
    Ok(())
  }

  pub fn cache_duration(&self) -> Duration {
    Duration::from_millis(self.api.cache_duration_ms)
  }

  pub fn toast_duration(&self) -> Duration {
    Duration::from_millis(self.display.toast_duration_ms)
  }

  /// Get the identity assertion from the environment.
  pub fn id_token_from_env() -> Option<String> {
    std::env::var("TALLY_ID_TOKEN")
      .ok()
      .map(|t| t.trim().to_string())
      .filter(|t| !t.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const MINIMAL: &str = "api:\n  url: https://metrics.example.com\n";

  #[test]
  fn test_defaults_from_minimal_config() {
    let config = Config::from_yaml(MINIMAL).unwrap();
    assert_eq!(config.api.cache_duration_ms, 300_000);
    assert_eq!(config.api.retry.max_retries, 3);
    assert_eq!(config.api.retry.delay_ms, 1_000);
    assert_eq!(config.api.retry.backoff, BackoffKind::Fixed);
    assert_eq!(config.display.toast_duration_ms, 3_000);
    assert_eq!(config.display.month_names.len(), 12);
    assert!(config.access.allowed_emails.is_empty());
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_emails_are_lowercased() {
    let yaml = r#"
api:
  url: https://metrics.example.com
access:
  allowed_emails: ["Ada@Example.com ", "bob@example.com"]
  admin_emails: ["ADA@example.com"]
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert!(config.access.allowed_emails.contains("ada@example.com"));
    assert!(config.access.admin_emails.contains("ada@example.com"));
  }

  #[test]
  fn test_retry_policy_from_config() {
    let yaml = r#"
api:
  url: https://metrics.example.com
  retry:
    max_retries: 5
    delay_ms: 200
    backoff: exponential
    max_delay_ms: 1000
    jitter: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    let policy = config.api.retry.policy();
    assert_eq!(policy.max_retries, 5);
    assert_eq!(policy.delay, Duration::from_millis(200));
    assert_eq!(
      policy.backoff,
      Backoff::Exponential {
        max_delay: Duration::from_millis(1000),
        jitter: true
      }
    );
  }

  #[test]
  fn test_invalid_url_rejected() {
    let config = Config::from_yaml("api:\n  url: not a url\n").unwrap();
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_month_name_lookup() {
    let config = Config::from_yaml(MINIMAL).unwrap();
    assert_eq!(config.display.month_name(1), "January");
    assert_eq!(config.display.month_name(12), "December");
    assert_eq!(config.display.month_name(13), "?");
  }
}
