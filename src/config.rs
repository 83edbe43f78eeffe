//! Configuration file handling.
//!
//! Settings are read from a TOML file; every field has a default, so the
//! file may be absent or partial. Command-line flags override it.
//!
//! # Configuration Location
//!
//! - Linux: `~/.config/artifact-audit/config.toml`
//! - macOS: `~/Library/Application Support/artifact-audit/config.toml`
//! - Windows: `%APPDATA%\artifact-audit\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! feed_url = "https://feeds.example.com/compromised-npm.csv"
//! token_env = "ARTIFACTORY_TOKEN"
//! concurrency = 8
//! timeout_secs = 30
//! max_attempts = 4
//! auth_failure_threshold = 5
//!
//! [ignore]
//! packages = ["@internal/*"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatch::{DispatchOptions, RetryPolicy};

/// Application configuration.
///
/// # Example
///
/// ```no_run
/// use artifact_audit::Config;
///
/// let config = Config::load().unwrap();
/// println!("Concurrency: {}", config.concurrency);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where to download the threat feed from when `--feed-url` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_url: Option<String>,

    /// Environment variable holding the repository bearer token.
    ///
    /// Default: `ARTIFACTORY_TOKEN`
    pub token_env: String,

    /// Maximum number of repository queries in flight.
    ///
    /// Default: 8
    pub concurrency: usize,

    /// Per-query timeout in seconds.
    ///
    /// Default: 30
    pub timeout_secs: u64,

    /// Attempts per query, including the first, for transient failures.
    ///
    /// Default: 4
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each further retry.
    ///
    /// Default: 500
    pub initial_backoff_ms: u64,

    /// Upper bound on the retry delay.
    ///
    /// Default: 8000
    pub max_backoff_ms: u64,

    /// Consecutive authorization failures that abort the audit. 0 disables.
    ///
    /// Default: 5
    pub auth_failure_threshold: usize,

    /// How long a downloaded feed snapshot stays fresh, in hours.
    ///
    /// Default: 1
    pub feed_cache_ttl_hours: u64,

    /// Timeout for downloading the threat feed, in seconds.
    ///
    /// Default: 60
    pub feed_timeout_secs: u64,

    /// Report file format: "csv" or "json".
    pub default_format: String,

    /// Report file written when `--output` is not given.
    pub output_path: String,

    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// Packages to leave out of the audit, e.g. internal forks that share a
/// name with a compromised package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Package identifiers; supports `*` wildcards (e.g. `@internal/*`).
    pub packages: Vec<String>,
}

impl IgnoreConfig {
    pub fn should_ignore_package(&self, package: &str) -> bool {
        self.packages.iter().any(|pattern| {
            if pattern.contains('*') {
                glob_match(pattern, package)
            } else {
                pattern == package
            }
        })
    }
}

/// Simple glob matching (supports * as wildcard).
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut remaining = text;

    let first = parts[0];
    if !remaining.starts_with(first) {
        return false;
    }
    remaining = &remaining[first.len()..];

    let last = parts[parts.len() - 1];
    if !remaining.ends_with(last) {
        return false;
    }
    remaining = &remaining[..remaining.len() - last.len()];

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }

    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: None,
            token_env: "ARTIFACTORY_TOKEN".to_string(),
            concurrency: 8,
            timeout_secs: 30,
            max_attempts: 4,
            initial_backoff_ms: 500,
            max_backoff_ms: 8000,
            auth_failure_threshold: 5,
            feed_cache_ttl_hours: 1,
            feed_timeout_secs: 60,
            default_format: "csv".to_string(),
            output_path: "artifact_audit_report.csv".to_string(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads the config file, or defaults if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Saves the configuration, creating the parent directory if needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("artifact-audit")
            .join("config.toml")
    }

    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Dispatcher settings derived from this config.
    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            concurrency: self.concurrency.max(1),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            retry: RetryPolicy {
                max_attempts: self.max_attempts.max(1),
                initial_backoff: Duration::from_millis(self.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.max_backoff_ms),
            },
        }
    }
}
