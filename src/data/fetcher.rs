//! Remote fetch step for oEmbed requests
//!
//! A single GET with a fixed connect timeout and no retries. Non-200 statuses
//! and empty bodies are returned as ordinary responses; only transport
//! failures become errors.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Connect timeout for provider requests
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when fetching from a provider
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, connect, timeout or body read failure
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Raw provider response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, possibly empty
    pub body: Vec<u8>,
}

/// Performs the outbound request for an oEmbed lookup
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// `Fetcher` backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the 10 second connect timeout
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("antenna/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::ClientBuild)?;
        Ok(Self { client })
    }

    /// Create a fetcher with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!(url, status, bytes = body.len(), "provider responded");
        Ok(FetchResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves a single canned HTTP response on a random local port
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}/oembed", addr)
    }

    /// Bypasses any proxy configured in the environment
    fn local_fetcher() -> HttpFetcher {
        HttpFetcher::with_client(Client::builder().no_proxy().build().unwrap())
    }

    #[test]
    fn test_new_builds_client() {
        assert!(HttpFetcher::new().is_ok());
    }

    #[tokio::test]
    async fn test_fetch_returns_status_and_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 13\r\nConnection: close\r\n\r\n{\"title\":\"T\"}",
        )
        .await;
        let fetcher = local_fetcher();

        let response = fetcher.fetch(&url).await.expect("Fetch should succeed");

        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"{\"title\":\"T\"}".to_vec());
    }

    #[tokio::test]
    async fn test_non_200_status_is_not_an_error() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
        )
        .await;
        let fetcher = local_fetcher();

        let response = fetcher.fetch(&url).await.expect("404 is a response, not an error");

        assert_eq!(response.status, 404);
        assert_eq!(response.body, b"not found".to_vec());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = local_fetcher();
        let result = fetcher.fetch(&format!("http://{}/oembed", addr)).await;

        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
