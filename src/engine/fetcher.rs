use super::traits::SourceFetcher;
use crate::config::FetchConfig;
use crate::error::FetchError;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Fetches list sources over HTTP(S) with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Self::new(Duration::from_millis(config.timeout_ms))
    }
}

#[async_trait::async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, location: &str, headers: &HeaderMap) -> Result<Bytes, FetchError> {
        let http_err = |source: reqwest::Error| {
            if source.is_timeout() {
                FetchError::Timeout {
                    location: location.to_string(),
                    after: self.timeout,
                }
            } else {
                FetchError::Http {
                    location: location.to_string(),
                    source,
                }
            }
        };

        let resp = self
            .client
            .get(location)
            .headers(headers.clone())
            .send()
            .await
            .map_err(http_err)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                location: location.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(http_err)?;
        debug!("Fetched {} bytes from {}", body.len(), location);
        Ok(body)
    }
}
