use crate::error::FetchError;
use bytes::Bytes;
use reqwest::header::HeaderMap;

/// Retrieves the raw contents of one source location.
///
/// Implementations must be cheap to share; the cache calls them from
/// concurrent fetch tasks. `headers` carries the cache's request headers
/// (the configured `User-Agent`).
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, location: &str, headers: &HeaderMap) -> Result<Bytes, FetchError>;
}
