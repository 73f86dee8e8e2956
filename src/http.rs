//! Minimal async HTTP client for backend calls.
//!
//! JSON in, JSON out, with non-2xx statuses surfaced as [`ClientError::Http`]
//! carrying a body snippet. Retries and state live elsewhere.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::errors::{ClientError, Result};

/// Async HTTP client for the transit backend.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL for the API (trailing slash is stripped)
    /// * `timeout_secs` - Request timeout in seconds
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(ClientError::Transport)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert a relative path to an absolute URL.
    fn abs_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Make a GET request and parse the JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.abs_url(path);
        let resp = self.client.get(&url).send().await?;
        Self::parse_json(resp, &url).await
    }

    /// Make a POST request with a JSON body and parse the JSON response.
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let url = self.abs_url(path);
        let resp = self.client.post(&url).json(body).send().await?;
        Self::parse_json(resp, &url).await
    }

    async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response, url: &str) -> Result<T> {
        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(ClientError::http(
                status.as_u16(),
                url,
                if text.trim().is_empty() { None } else { Some(&text) },
            ));
        }

        serde_json::from_slice(&body).map_err(ClientError::Json)
    }
}
