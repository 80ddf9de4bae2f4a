use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, redirect};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::HttpConfig;
use crate::errors::{AppError, AppResult, TransportError};
use crate::utils::url::UrlUtils;

/// Maximum redirect hops followed for documents and probes
const MAX_REDIRECTS: usize = 10;

/// Result of a document fetch, returned for every status code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Result of a reachability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub elapsed: Duration,
}

/// Network operations the pipeline depends on.
///
/// Implementations own headers, pooling and TLS; callers only supply a URL
/// and the timeout for that single request.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Fetch a document body
    async fn fetch_text(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<FetchResponse, TransportError>;

    /// Lightweight reachability check; no body is read
    async fn probe(&self, url: &str, timeout: Duration) -> Result<ProbeResponse, TransportError>;
}

/// Default transport backed by a pooled reqwest client
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language).map_err(|e| {
                AppError::configuration(format!("Invalid http.accept_language: {e}"))
            })?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| AppError::configuration(format!("Invalid http.user_agent: {e}")))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()?;

        Ok(Self { client })
    }

    fn map_error(url: &str, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            // reqwest embeds the URL in its message
            let message = UrlUtils::obfuscate_credentials(&err.to_string());
            debug!("Transport failure for {}: {}", UrlUtils::obfuscate_credentials(url), message);
            TransportError::Connection(message)
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn fetch_text(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<FetchResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_error(url, e))?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| Self::map_error(url, e))?;
        debug!(
            "Fetched {} bytes (status {}) from {}",
            bytes.len(),
            status,
            UrlUtils::obfuscate_credentials(url)
        );

        Ok(FetchResponse {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    async fn probe(&self, url: &str, timeout: Duration) -> Result<ProbeResponse, TransportError> {
        let started = Instant::now();
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_error(url, e))?;

        Ok(ProbeResponse {
            status: response.status().as_u16(),
            elapsed: started.elapsed(),
        })
    }
}
