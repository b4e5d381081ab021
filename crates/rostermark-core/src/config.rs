//! Configuration management for Rostermark.
//!
//! Provides TOML-based configuration loaded from the dataset folder with
//! environment variable overrides.

use crate::error::ConfigResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the per-folder configuration file.
pub const CONFIG_FILE_NAME: &str = "rostermark.toml";

/// Main application configuration.
///
/// Loaded from `rostermark.toml` inside the dataset folder. If the file
/// doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scraping and worker-pool settings
    pub scraping: ScrapingConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Backfill pass settings
    pub backfill: BackfillConfig,
}

impl AppConfig {
    /// Load configuration from a dataset folder, falling back to defaults
    /// if no config file is present.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or is not valid
    /// TOML.
    pub fn load(folder: &Path) -> ConfigResult<Self> {
        let config_path = folder.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `ROSTERMARK_HEADLESS`: Override browser headless mode (true/false)
    /// - `ROSTERMARK_MAX_WORKERS`: Override the worker-count ceiling
    /// - `ROSTERMARK_CHECKPOINT_EVERY`: Override the checkpoint interval
    pub fn load_with_env(folder: &Path) -> ConfigResult<Self> {
        let mut config = Self::load(folder)?;

        if let Ok(val) = std::env::var("ROSTERMARK_HEADLESS") {
            if let Ok(headless) = val.parse() {
                config.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("ROSTERMARK_MAX_WORKERS") {
            if let Ok(workers) = val.parse() {
                config.scraping.max_workers = workers;
                tracing::debug!("Override scraping.max_workers from env: {}", workers);
            }
        }

        if let Ok(val) = std::env::var("ROSTERMARK_CHECKPOINT_EVERY") {
            if let Ok(every) = val.parse() {
                config.scraping.checkpoint_every = every;
                tracing::debug!("Override scraping.checkpoint_every from env: {}", every);
            }
        }

        Ok(config)
    }
}

/// Scraping and worker-pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Ceiling on the number of parallel workers
    pub max_workers: usize,
    /// Flush the result table every N collected results (0 disables
    /// periodic checkpoints; a final save still always happens)
    pub checkpoint_every: usize,
    /// Flush after every single collected result
    pub write_every_row: bool,
    /// Log a progress line every N collected results
    pub progress_log_every: usize,
    /// How long the collector waits for a result before checking whether
    /// the workers are still alive, in seconds
    pub results_timeout_secs: u64,
    /// HTTP search request timeout in seconds
    pub http_timeout_secs: u64,
    /// User agent sent with HTTP search requests
    pub user_agent: String,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            max_workers: 6,
            checkpoint_every: 20,
            write_every_row: false,
            progress_log_every: 25,
            results_timeout_secs: 90,
            http_timeout_secs: 6,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string(),
        }
    }
}

impl ScrapingConfig {
    /// HTTP search request timeout as a `Duration`.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Collector results timeout as a `Duration`.
    #[must_use]
    pub fn results_timeout(&self) -> Duration {
        Duration::from_secs(self.results_timeout_secs)
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run the browser in headless mode
    pub headless: bool,
    /// Page navigation timeout in seconds
    pub page_load_timeout_secs: u64,
    /// How long each consent-dismissal attempt may wait, in milliseconds
    pub consent_wait_ms: u64,
    /// Explicit browser binary path (system default when unset)
    pub chrome_binary: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            page_load_timeout_secs: 12,
            consent_wait_ms: 1000,
            chrome_binary: None,
        }
    }
}

impl BrowserConfig {
    /// Page navigation timeout as a `Duration`.
    #[must_use]
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    /// Per-attempt consent wait as a `Duration`.
    #[must_use]
    pub fn consent_wait(&self) -> Duration {
        Duration::from_millis(self.consent_wait_ms)
    }
}

/// Backfill pass settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackfillConfig {
    /// How many rows before the selected start row the backfill scan
    /// begins at
    pub behind_rows: usize,
    /// Delay between backfill resolutions in milliseconds
    pub delay_ms: u64,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            behind_rows: 5,
            delay_ms: 800,
        }
    }
}

impl BackfillConfig {
    /// Inter-row backfill delay as a `Duration`.
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.scraping.max_workers, 6);
        assert_eq!(config.scraping.checkpoint_every, 20);
        assert!(!config.scraping.write_every_row);
        assert!(config.browser.headless);
        assert_eq!(config.backfill.behind_rows, 5);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[scraping]"));
        assert!(toml_str.contains("[browser]"));
        assert!(toml_str.contains("[backfill]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.scraping.max_workers, config.scraping.max_workers);
    }

    #[test]
    fn test_load_from_folder() {
        let tmp = TempDir::new().expect("create temp dir");
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[scraping]\nmax_workers = 3\n",
        )
        .expect("write config file");

        let config = AppConfig::load(tmp.path()).expect("load config");
        assert_eq!(config.scraping.max_workers, 3);
        // Untouched sections keep their defaults.
        assert!(config.browser.headless);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let config = AppConfig::load(tmp.path()).expect("load config");
        assert_eq!(config.scraping.checkpoint_every, 20);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[browser]
headless = false
page_load_timeout_secs = 30
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert!(!config.browser.headless);
        assert_eq!(config.browser.page_load_timeout_secs, 30);
        // These should be defaults
        assert_eq!(config.scraping.max_workers, 6);
        assert_eq!(config.backfill.delay_ms, 800);
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.scraping.http_timeout(), Duration::from_secs(6));
        assert_eq!(config.browser.page_load_timeout(), Duration::from_secs(12));
        assert_eq!(config.backfill.delay(), Duration::from_millis(800));
    }
}
