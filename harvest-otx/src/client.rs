//! OTX REST client
//!
//! Builds an authenticated HTTP client and exposes the two calls the
//! harvest needs: paginated pulse search and pulse details.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use harvest_core::{HarvestConfig, Indicator, Pulse, PulseListing};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-OTX-API-KEY";

const SEARCH_PULSES_PATH: &str = "/api/v1/search/pulses";
const PULSE_DETAILS_PATH: &str = "/api/v1/pulses";

/// Client configuration
#[derive(Debug, Clone)]
pub struct OtxConfig {
    /// API base URL (default: https://otx.alienvault.com)
    pub base_url: String,
    pub api_key: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Pulses requested per search page
    pub page_size: usize,
}

impl Default for OtxConfig {
    fn default() -> Self {
        Self::from(&HarvestConfig::default())
    }
}

impl From<&HarvestConfig> for OtxConfig {
    fn from(config: &HarvestConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
            page_size: config.page_size.max(1),
        }
    }
}

/// Errors from the OTX API
#[derive(Debug, Error)]
pub enum OtxError {
    #[error("Failed to build OTX client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { status: u16, url: String },

    #[error("Pulse has no id")]
    MissingPulseId,
}

/// Create an HTTP client that authenticates every request
pub fn create_otx_client(config: &OtxConfig) -> Result<Client, OtxError> {
    let mut headers = HeaderMap::new();
    let key = HeaderValue::from_str(&config.api_key)
        .map_err(|e| OtxError::ClientBuild(format!("invalid API key: {}", e)))?;
    headers.insert(API_KEY_HEADER, key);

    Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!("pulse-harvest/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| OtxError::ClientBuild(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct PulseDetails {
    #[serde(default)]
    indicators: Option<Vec<Indicator>>,
}

/// Client for the OTX pulse endpoints
#[derive(Debug, Clone)]
pub struct OtxClient {
    config: OtxConfig,
    http: Client,
}

impl OtxClient {
    pub fn new(config: OtxConfig) -> Result<Self, OtxError> {
        let http = create_otx_client(&config)?;
        Ok(Self { config, http })
    }

    /// Search pulses matching `term`, following pages until `max_results`
    /// pulses are gathered or the listing runs out.
    pub async fn search_pulses(
        &self,
        term: &str,
        max_results: usize,
    ) -> Result<PulseListing, OtxError> {
        let url = format!("{}{}", self.config.base_url, SEARCH_PULSES_PATH);
        let mut pulses: Vec<Pulse> = Vec::new();
        let mut page = 1usize;

        while pulses.len() < max_results {
            let query = [
                ("q", term.to_string()),
                ("page", page.to_string()),
                ("limit", self.config.page_size.to_string()),
            ];
            let listing: PulseListing = self.get_json(&url, &query).await?;

            let (results, has_next) = match listing {
                PulseListing::Bare(results) => (results, false),
                PulseListing::Paged(listing_page) => {
                    (listing_page.results, listing_page.next.is_some())
                }
            };

            debug!("Search '{}' page {} returned {} pulses", term, page, results.len());

            if results.is_empty() {
                break;
            }
            pulses.extend(results);

            if !has_next {
                break;
            }
            page += 1;
        }

        pulses.truncate(max_results);
        Ok(PulseListing::Bare(pulses))
    }

    /// Fetch the indicator list of a pulse
    pub async fn pulse_indicators(&self, pulse_id: &str) -> Result<Vec<Indicator>, OtxError> {
        if pulse_id.is_empty() {
            return Err(OtxError::MissingPulseId);
        }

        let url = format!("{}{}/{}", self.config.base_url, PULSE_DETAILS_PATH, pulse_id);
        let details: PulseDetails = self.get_json(&url, &[]).await?;
        let indicators = details.indicators.unwrap_or_default();

        debug!("Pulse {} has {} indicators", pulse_id, indicators.len());
        Ok(indicators)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, OtxError> {
        let response = self.http.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OtxError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json::<T>().await?)
    }
}
