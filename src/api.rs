use thiserror::Error;

use crate::episode::RawEpisode;
use crate::http::{FetchError, RetryPolicy, get_text_with_retries};

pub const DEFAULT_API_URL: &str = "http://localhost:3333";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub retry: RetryPolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Http(#[from] FetchError),
    #[error("unexpected JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Http(err) if err.status() == Some(404))
    }
}

/// Client for the `/episodes` resource.
#[derive(Debug, Clone)]
pub struct EpisodesApi {
    base_url: String,
    retry: RetryPolicy,
}

impl EpisodesApi {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry,
        }
    }

    /// Newest episodes first, used to enumerate pages to pre-generate.
    pub fn latest_episodes(&self, limit: usize) -> Result<Vec<RawEpisode>, ApiError> {
        let url = format!("{}/episodes", self.base_url);
        let query = [
            ("_limit", limit.to_string()),
            ("_sort", "published_at".to_string()),
            ("_order", "desc".to_string()),
        ];
        let body = get_text_with_retries(&url, &query, &self.retry)?;
        decode(&url, &body)
    }

    pub fn episode(&self, id: &str) -> Result<RawEpisode, ApiError> {
        let url = format!("{}/episodes/{}", self.base_url, encode_path_segment(id));
        let body = get_text_with_retries(&url, &[], &self.retry)?;
        decode(&url, &body)
    }
}

fn decode<T: serde::de::DeserializeOwned>(url: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

pub(crate) fn encode_path_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}
