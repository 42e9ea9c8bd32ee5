//! HTTP asset downloads

use crate::RemoteError;
use async_trait::async_trait;
use hueshift_domain::traits::AssetFetcher;
use hueshift_domain::FetchError;
use std::time::Duration;

/// Default timeout for one download
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Downloads remote assets over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`
    ///
    /// # Examples
    ///
    /// ```
    /// use hueshift_remote::HttpFetcher;
    /// use std::time::Duration;
    ///
    /// let fetcher = HttpFetcher::new(Duration::from_secs(10)).unwrap();
    /// assert_eq!(fetcher.timeout(), Duration::from_secs(10));
    /// ```
    pub fn new(timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!("Fetching {}", url);

        let response = self.client.get(url).send().await.map_err(map_request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(map_request_error)?;
        Ok(bytes.to_vec())
    }
}

fn map_request_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_creation() {
        let fetcher = HttpFetcher::new(DEFAULT_FETCH_TIMEOUT).unwrap();
        assert_eq!(fetcher.timeout(), Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_network_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        let result = fetcher.fetch("http://127.0.0.1:9/banner.png").await;
        assert!(matches!(result, Err(FetchError::Network(_)) | Err(FetchError::Timeout)));
    }
}
