//! Configuration structures for the route monitor.
//!
//! - [`MonitorConfig`] - Analysis scheduling (debounce, caching, readiness polling)
//! - [`WatchConfig`] - File watcher settings (notify debouncing, extensions, ignores)
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a config file only needs the fields it overrides.

use std::time::Duration;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Readiness polling performed by the monitor during `start()`.
///
/// The monitor repeatedly fetches the program and checks that every file
/// the watcher knows about has been ingested. Attempt `n` (0-based) waits
/// `base_delay_ms + n * step_ms` before retrying.
///
/// # Examples
///
/// ```
/// use sa_core::ReadinessConfig;
/// use std::time::Duration;
///
/// let config = ReadinessConfig::default();
/// assert_eq!(config.max_retries, 5);
/// assert_eq!(config.delay_for(0), Duration::from_millis(100));
/// assert_eq!(config.delay_for(3), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Number of retries before giving up (the monitor still starts).
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,

    /// Added to the delay for every subsequent retry, in milliseconds.
    pub step_ms: u64,
}

impl ReadinessConfig {
    /// Returns the delay to wait after the given (0-based) failed attempt.
    #[must_use]
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        Duration::from_millis(
            self.base_delay_ms
                .saturating_add(self.step_ms.saturating_mul(u64::from(retry_count))),
        )
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 100,
            step_ms: 100,
        }
    }
}

/// Configuration for the routes monitor.
///
/// # Examples
///
/// ```
/// use sa_core::MonitorConfig;
///
/// let config = MonitorConfig::default();
/// assert_eq!(config.debounce_ms, 50);
/// assert!(config.auto_create_result);
/// assert!(config.aggressive_caching);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Window in milliseconds used to coalesce file events into one analysis.
    pub debounce_ms: u64,

    /// Whether file events automatically schedule a re-analysis.
    pub auto_create_result: bool,

    /// Whether host lookups prefer the in-memory file map and existence caches.
    pub aggressive_caching: bool,

    /// Readiness polling performed during start-up.
    pub readiness: ReadinessConfig,
}

impl MonitorConfig {
    /// Returns the debounce window as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            auto_create_result: true,
            aggressive_caching: true,
            readiness: ReadinessConfig::default(),
        }
    }
}

/// Configuration for the file watcher.
///
/// # Examples
///
/// ```
/// use sa_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 100);
/// assert!(config.recursive);
/// assert!(config.extensions.iter().any(|e| e == "ts"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Debounce window of the underlying notify watcher, in milliseconds.
    pub debounce_ms: u64,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,

    /// Source file extensions to track (without the leading dot).
    pub extensions: Vec<String>,

    /// Directory names that are never walked or watched.
    pub ignore_dirs: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            recursive: true,
            extensions: ["ts", "tsx", "js", "jsx", "mts", "cts", "mjs", "cjs"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            ignore_dirs: ["node_modules", ".git", "dist", "build", ".wrangler", ".turbo"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}

/// Root configuration for the route monitor.
///
/// # Examples
///
/// ```
/// use sa_core::Config;
///
/// let config = Config::default();
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// assert!(json.contains("debounce_ms"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Routes monitor configuration.
    pub monitor: MonitorConfig,

    /// File watcher configuration.
    pub watch: WatchConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// Fields missing from the file keep their default values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid JSON.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}
