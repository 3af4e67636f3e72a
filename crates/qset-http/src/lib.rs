//! qset-http — `reqwest`-backed [`Transport`] for the qset service.
//!
//! ```ignore
//! let client = qset_http::connect(ClientConfig::from_env())?;
//! let overview = client.dataset_overview("daily_prices").await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue};

use qset_core::error::{QsetError, TransportError};
use qset_core::transport::{Params, Transport};
use qset_core::{ClientConfig, QsetClient};

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "x-api-key";

/// One GET per call against the configured API root.
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Build the transport. Fails with [`QsetError::MissingCredentials`]
    /// before touching the network if no API key is configured.
    pub fn new(config: &ClientConfig) -> Result<Self, QsetError> {
        let key = config.api_key()?;
        let mut key = HeaderValue::from_str(key)
            .map_err(|_| QsetError::Config("API key is not a valid header value".into()))?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| QsetError::Config(e.to_string()))?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            http,
            request_timeout: config.request_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, params: &Params) -> Result<Bytes, TransportError> {
        let resp = self
            .http
            .get(self.url(path))
            .query(params.as_slice())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(path, error = %e, "failed to read error body");
                    String::new()
                }
            };
            tracing::debug!(path, status = status.as_u16(), "non-success response");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.bytes().await.map_err(|e| self.classify(e))
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// A ready-to-use client over HTTP.
pub fn connect(config: ClientConfig) -> Result<QsetClient<HttpTransport>, QsetError> {
    let transport = HttpTransport::new(&config)?;
    tracing::debug!(api_url = %transport.base_url, "qset client configured");
    Ok(QsetClient::new(transport, config.retry))
}
