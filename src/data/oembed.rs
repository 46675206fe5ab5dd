//! oEmbed lookup with disk caching
//!
//! `OembedClient` turns a video URL and embed parameters into `VideoMetadata`:
//! it builds the provider request URL, serves a fresh cache entry if there is
//! one, and otherwise fetches from the provider and caches the response.

use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::fetcher::{FetchError, Fetcher, HttpFetcher};
use super::{EmbedParams, Provider, VideoMetadata};
use crate::cache::{cache_key, CacheConfig, CacheError, CacheManager};

/// Reasons a lookup produced no metadata
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The URL is not from a supported provider
    #[error("Not a YouTube or Vimeo URL: {0}")]
    InvalidSource(String),

    /// The request never got a response
    #[error("Provider request failed: {0}")]
    TransportFailure(#[from] FetchError),

    /// The provider answered with something other than 200
    #[error("Provider returned HTTP {0}")]
    UpstreamError(u16),

    /// The provider answered 200 with no body
    #[error("Provider returned an empty body")]
    EmptyBody,

    /// The body is not a JSON object
    #[error("Failed to decode oEmbed payload: {0}")]
    DecodeFailure(String),
}

/// Client for resolving video URLs to embed code and metadata
///
/// Cheap to clone and safe to share across tasks; the only shared state is the
/// cache directory on disk.
#[derive(Clone)]
pub struct OembedClient {
    fetcher: Arc<dyn Fetcher>,
    cache: Option<CacheManager>,
}

impl OembedClient {
    /// Creates a client that fetches over HTTP and caches per `config`
    pub fn new(config: CacheConfig) -> Result<Self, FetchError> {
        Ok(Self::with_fetcher(
            Arc::new(HttpFetcher::new()?),
            Some(CacheManager::new(config)),
        ))
    }

    /// Creates a client with a custom fetcher and optional cache
    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>, cache: Option<CacheManager>) -> Self {
        Self { fetcher, cache }
    }

    /// Resolves a video URL, returning the empty result on any failure
    ///
    /// Failures are logged, never returned. See `try_resolve` for the reason
    /// behind an empty result.
    pub async fn resolve(&self, video_url: &str, params: &EmbedParams) -> VideoMetadata {
        match self.try_resolve(video_url, params).await {
            Ok(metadata) => metadata,
            Err(ResolveError::InvalidSource(url)) => {
                debug!(video_url = %url, "unsupported video host, skipping lookup");
                VideoMetadata::default()
            }
            Err(e) => {
                warn!(video_url, error = %e, "oEmbed lookup failed");
                VideoMetadata::default()
            }
        }
    }

    /// Resolves only the embed HTML
    pub async fn resolve_embed(&self, video_url: &str, params: &EmbedParams) -> Option<String> {
        self.resolve(video_url, params).await.embed_html
    }

    /// Resolves a video URL, reporting why nothing was found
    ///
    /// # Behavior
    /// - Unsupported hosts fail with `InvalidSource` before any I/O
    /// - A fresh, decodable cache entry is used without contacting the provider
    /// - A missing, expired or undecodable entry triggers a fetch; a response
    ///   that decodes is cached, anything else is not
    /// - An expired entry is never served when the refetch fails
    pub async fn try_resolve(
        &self,
        video_url: &str,
        params: &EmbedParams,
    ) -> Result<VideoMetadata, ResolveError> {
        let video_url = html_escape::decode_html_entities(video_url).into_owned();
        let provider = Provider::detect(&video_url)
            .ok_or_else(|| ResolveError::InvalidSource(video_url.clone()))?;

        let request_url = provider.request_url(&video_url, params);
        let key = cache_key(&request_url);

        if let Some(body) = self.cached_payload(&key).await {
            match decode_metadata(&body) {
                Ok(metadata) => return Ok(metadata),
                Err(e) => warn!(key = %key, error = %e, "cached payload is unusable, refetching"),
            }
        }

        debug!(provider = provider.name(), url = %request_url, "fetching oEmbed payload");
        let body = self.fetch(&request_url).await?;
        let metadata = decode_metadata(&body)?;
        self.store(&key, body).await;
        Ok(metadata)
    }

    /// Returns the cached payload for `key` if present and fresh
    ///
    /// File locking blocks, so the read runs on the blocking thread pool.
    async fn cached_payload(&self, key: &str) -> Option<Vec<u8>> {
        let cache = self.cache.clone()?;
        let lookup_key = key.to_string();
        let lookup = tokio::task::spawn_blocking(move || {
            let entry = cache.get(&lookup_key)?;
            Ok::<_, CacheError>(entry.map(|entry| {
                let stale = cache.is_stale(&entry);
                (entry, stale)
            }))
        })
        .await;

        match lookup {
            Ok(Ok(Some((entry, false)))) => {
                debug!(key, "cache hit");
                Some(entry.payload)
            }
            Ok(Ok(Some((entry, true)))) => {
                debug!(key, written_at = entry.written_at, "cache entry expired");
                None
            }
            Ok(Ok(None)) => {
                debug!(key, "cache miss");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "cache unavailable, fetching live");
                None
            }
            Err(e) => {
                warn!(error = %e, "cache read task failed, fetching live");
                None
            }
        }
    }

    async fn fetch(&self, request_url: &str) -> Result<Vec<u8>, ResolveError> {
        let response = self.fetcher.fetch(request_url).await?;
        if response.status != 200 {
            return Err(ResolveError::UpstreamError(response.status));
        }
        if response.body.is_empty() {
            return Err(ResolveError::EmptyBody);
        }
        Ok(response.body)
    }

    /// Best-effort cache write on the blocking thread pool
    async fn store(&self, key: &str, body: Vec<u8>) {
        let Some(cache) = self.cache.clone() else {
            return;
        };
        let key = key.to_string();
        match tokio::task::spawn_blocking(move || cache.put(&key, &body)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "failed to write cache entry"),
            Err(e) => warn!(error = %e, "cache write task failed"),
        }
    }
}

/// Maps an oEmbed JSON body onto `VideoMetadata`
///
/// Missing and `null` fields stay absent. Non-string scalars are kept as text.
fn decode_metadata(body: &[u8]) -> Result<VideoMetadata, ResolveError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ResolveError::DecodeFailure(e.to_string()))?;
    let fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(ResolveError::DecodeFailure(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };

    Ok(VideoMetadata {
        embed_html: field_text(&fields, "html"),
        title: field_text(&fields, "title"),
        author_name: field_text(&fields, "author_name"),
        author_url: field_text(&fields, "author_url"),
        thumbnail_url: field_text(&fields, "thumbnail_url"),
    })
}

fn field_text(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
