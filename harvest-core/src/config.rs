//! Run configuration
//!
//! Limits are fixed per build; only the credential and endpoint come from
//! the environment.

use std::path::PathBuf;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "OTX_API_KEY";

/// Environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "OTX_BASE_URL";

/// Default API endpoint
pub const DEFAULT_BASE_URL: &str = "https://otx.alienvault.com";

/// Maximum unique indicators collected (and exported) per search term
pub const MAX_INDICATORS: usize = 300_000;

/// Maximum pulses fetched per search term
pub const MAX_PULSES: usize = 1000;

/// Pulses requested per search page
pub const PAGE_SIZE: usize = 50;

/// Concurrent detail fetches for the concurrent collector
pub const MAX_WORKERS: usize = 30;

/// Delay between API calls in milliseconds. Carried as a tunable only; no
/// call path sleeps on it.
pub const RATE_LIMIT_DELAY_MS: u64 = 100;

/// Per-request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Configuration shared by the client, collector and exporter
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// API key sent with every request
    pub api_key: String,
    /// API base URL, without trailing slash
    pub base_url: String,
    /// Unique-indicator cap per term
    pub max_indicators: usize,
    /// Pulse cap per search
    pub max_pulses: usize,
    pub page_size: usize,
    pub max_workers: usize,
    /// Not applied; calls are issued back to back
    pub rate_limit_delay_ms: u64,
    pub timeout_secs: u64,
    /// Directory the CSV files are written to
    pub output_dir: PathBuf,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_indicators: MAX_INDICATORS,
            max_pulses: MAX_PULSES,
            page_size: PAGE_SIZE,
            max_workers: MAX_WORKERS,
            rate_limit_delay_ms: RATE_LIMIT_DELAY_MS,
            timeout_secs: REQUEST_TIMEOUT_SECS,
            output_dir: PathBuf::from("."),
        }
    }
}

impl HarvestConfig {
    /// Defaults with the credential and endpoint read from the environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            config.api_key = key;
        }
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            config.base_url = url;
        }
        config
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = key.to_string();
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_max_indicators(mut self, max: usize) -> Self {
        self.max_indicators = max;
        self
    }

    pub fn with_max_pulses(mut self, max: usize) -> Self {
        self.max_pulses = max;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Output file for a search term: `<output_dir>/<term>_indicators.csv`
    pub fn output_path(&self, term: &str) -> PathBuf {
        self.output_dir.join(output_file_name(term))
    }
}

pub fn output_file_name(term: &str) -> String {
    format!("{}_indicators.csv", term)
}
