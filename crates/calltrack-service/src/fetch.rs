//! The HTTP fetch underlying every cache entry.

use std::time::Duration;

use calltrack_cache::{CacheEntry, CacheError};
use reqwest::{Client, StatusCode, header};
use url::Url;

use crate::config::Config;
use crate::types::CallTrackingResponse;

/// The user agent sent with vendor requests.
pub const USER_AGENT: &str = concat!("calltrack/", env!("CARGO_PKG_VERSION"));

/// Fetches and decodes call tracking responses from vendor endpoints.
///
/// This is the fetch operation handed to the
/// [`Cacher`](calltrack_cache::Cacher); it performs exactly one HTTP request
/// per invocation and owns the timeout policy for it.
#[derive(Clone, Debug)]
pub struct NumberFetcher {
    client: Client,
    request_timeout: Duration,
    max_response_size: u64,
}

impl NumberFetcher {
    /// Creates a new fetcher with the configured timeouts.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(NumberFetcher {
            client,
            request_timeout: config.request_timeout,
            max_response_size: config.max_response_size,
        })
    }

    /// Fetches the vendor response behind `url` and decodes it.
    pub async fn fetch(&self, url: Url) -> CacheEntry<CallTrackingResponse> {
        tracing::debug!("Fetching call tracking config from `{url}`");

        let request = self
            .client
            .get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/json");

        let response = request.send().await.map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND => CacheError::NotFound,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    CacheError::PermissionDenied(details)
                }
                _ => CacheError::DownloadError(status.to_string()),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.max_response_size {
                return Err(CacheError::Malformed(format!(
                    "response of {length} bytes exceeds the configured maximum"
                )));
            }
        }

        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        if body.len() as u64 > self.max_response_size {
            return Err(CacheError::Malformed(format!(
                "response of {} bytes exceeds the configured maximum",
                body.len()
            )));
        }

        let response: CallTrackingResponse = serde_json::from_slice(&body)
            .map_err(|e| CacheError::Malformed(e.to_string()))?;
        response.validate()?;

        Ok(response)
    }

    fn map_error(&self, error: reqwest::Error) -> CacheError {
        if error.is_timeout() {
            CacheError::Timeout(self.request_timeout)
        } else if error.is_builder() {
            // A builder error means we constructed a bad request ourselves,
            // the vendor was never reached.
            CacheError::from_std_error(error)
        } else {
            CacheError::DownloadError(error.to_string())
        }
    }
}
