//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::paginator::PaginationSettings;
use crate::retry::RetryPolicy;
use crate::site::{PageFormat, Region};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Page layout to scrape
    #[serde(default)]
    pub site: PageFormat,

    /// Amazon region (ignored by other layouts)
    #[serde(default)]
    pub region: Region,

    /// Overrides the layout's default base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Base delay between requests in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Random jitter added to delay (0 to this value)
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,

    /// Whole-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Attempts per page, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound for a single retry delay
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    /// Backoff factor applied when rate limited
    #[serde(default = "default_rate_limit_multiplier")]
    pub rate_limit_multiplier: u32,

    /// Consecutive failed pages that abort a run
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Hard ceiling on product pages per run
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// SQLite file for storing datasets; nothing is stored when unset
    #[serde(default)]
    pub database: Option<PathBuf>,
}

fn default_delay_ms() -> u64 {
    2000
}

fn default_delay_jitter_ms() -> u64 {
    3000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_backoff_cap_ms() -> u64 {
    30_000
}

fn default_rate_limit_multiplier() -> u32 {
    4
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_max_pages() -> u32 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: PageFormat::Amazon,
            region: Region::Us,
            base_url: None,
            proxy: None,
            delay_ms: default_delay_ms(),
            delay_jitter_ms: default_delay_jitter_ms(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            rate_limit_multiplier: default_rate_limit_multiplier(),
            max_consecutive_failures: default_max_consecutive_failures(),
            max_pages: default_max_pages(),
            format: OutputFormat::Table,
            database: None,
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("review-crawler").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides. Unparseable values are ignored.
    pub fn with_env(mut self) -> Self {
        if let Ok(site) = std::env::var("REVIEWS_SITE") {
            if let Ok(s) = site.parse() {
                self.site = s;
            }
        }

        if let Ok(region) = std::env::var("REVIEWS_REGION") {
            if let Ok(r) = region.parse() {
                self.region = r;
            }
        }

        if let Ok(proxy) = std::env::var("REVIEWS_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Ok(delay) = std::env::var("REVIEWS_DELAY") {
            if let Ok(d) = delay.parse() {
                self.delay_ms = d;
            }
        }

        if let Ok(db) = std::env::var("REVIEWS_DB") {
            if !db.is_empty() {
                self.database = Some(PathBuf::from(db));
            }
        }

        self
    }

    /// Base URL of the configured site.
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => self.site.default_base_url(self.region),
        }
    }

    /// Backoff schedule for the fetcher.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.backoff_base_ms),
            max_delay: Duration::from_millis(self.backoff_cap_ms),
            rate_limit_multiplier: self.rate_limit_multiplier,
        }
    }

    /// Limits for the paginator.
    pub fn pagination_settings(&self) -> PaginationSettings {
        PaginationSettings {
            attempt_budget: self.max_attempts.max(1),
            max_consecutive_failures: self.max_consecutive_failures.max(1),
            max_pages: self.max_pages.max(1),
        }
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.site, PageFormat::Amazon);
        assert_eq!(config.region, Region::Us);
        assert_eq!(config.delay_ms, 2000);
        assert_eq!(config.delay_jitter_ms, 3000);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.max_consecutive_failures, 3);
        assert_eq!(config.max_pages, 10);
        assert_eq!(config.format, OutputFormat::Table);
        assert!(config.proxy.is_none());
        assert!(config.database.is_none());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);

        let err = "invalid".parse::<OutputFormat>().unwrap_err();
        assert!(err.contains("Unknown format"));
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Markdown.to_string(), "markdown");
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            site = "flipkart"
            delay_ms = 3000
            max_pages = 4
            database = "reviews.db"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.site, PageFormat::Flipkart);
        assert_eq!(config.delay_ms, 3000);
        assert_eq!(config.max_pages, 4);
        assert_eq!(config.database, Some(PathBuf::from("reviews.db")));
        // Unset fields keep their defaults
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            region = "de"
            base_url = "http://localhost:9000/"
            max_attempts = 5
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.region, Region::De);
        assert_eq!(config.base_url(), "http://localhost:9000");
        assert_eq!(config.retry_policy().max_attempts, 5);
    }

    #[test]
    fn test_config_from_file_not_found() {
        let err = Config::from_file("/nonexistent/path/config.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_config_from_file_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml {{{{").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"site = "flipkart""#).unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.site, PageFormat::Flipkart);
    }

    #[test]
    fn test_base_url_defaults() {
        let config = Config { region: Region::Uk, ..Config::default() };
        assert_eq!(config.base_url(), "https://www.amazon.co.uk");

        let config = Config { site: PageFormat::Flipkart, ..Config::default() };
        assert_eq!(config.base_url(), "https://www.flipkart.com");
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = Config {
            max_attempts: 0,
            backoff_base_ms: 250,
            backoff_cap_ms: 2000,
            rate_limit_multiplier: 2,
            ..Config::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_millis(2000));
        assert_eq!(policy.rate_limit_multiplier, 2);
    }

    #[test]
    fn test_pagination_settings_from_config() {
        let config = Config { max_consecutive_failures: 5, max_pages: 0, ..Config::default() };
        let settings = config.pagination_settings();
        assert_eq!(settings.attempt_budget, 3);
        assert_eq!(settings.max_consecutive_failures, 5);
        assert_eq!(settings.max_pages, 1);
    }

    #[test]
    fn test_config_with_env() {
        let vars = ["REVIEWS_SITE", "REVIEWS_REGION", "REVIEWS_PROXY", "REVIEWS_DELAY", "REVIEWS_DB"];
        let saved: Vec<Option<String>> = vars.iter().map(|v| std::env::var(v).ok()).collect();

        std::env::set_var("REVIEWS_SITE", "flipkart");
        std::env::set_var("REVIEWS_REGION", "au");
        std::env::set_var("REVIEWS_PROXY", "http://proxy:8080");
        std::env::set_var("REVIEWS_DELAY", "5000");
        std::env::set_var("REVIEWS_DB", "/tmp/reviews.db");

        let config = Config::new().with_env();
        assert_eq!(config.site, PageFormat::Flipkart);
        assert_eq!(config.region, Region::Au);
        assert_eq!(config.proxy, Some("http://proxy:8080".to_string()));
        assert_eq!(config.delay_ms, 5000);
        assert_eq!(config.database, Some(PathBuf::from("/tmp/reviews.db")));

        // Invalid values are ignored
        std::env::set_var("REVIEWS_SITE", "ebay");
        std::env::set_var("REVIEWS_DELAY", "soon");
        let config = Config::new().with_env();
        assert_eq!(config.site, PageFormat::Amazon);
        assert_eq!(config.delay_ms, 2000);

        for (var, value) in vars.iter().zip(saved) {
            match value {
                Some(v) => std::env::set_var(var, v),
                None => std::env::remove_var(var),
            }
        }
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = Config {
            site: PageFormat::Flipkart,
            proxy: Some("socks5://localhost:1080".to_string()),
            format: OutputFormat::Json,
            database: Some(PathBuf::from("r.db")),
            ..Config::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.site, config.site);
        assert_eq!(parsed.proxy, config.proxy);
        assert_eq!(parsed.format, config.format);
        assert_eq!(parsed.database, config.database);
    }
}
