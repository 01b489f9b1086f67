//! Fetch capability used by the directory client
//!
//! The client never talks HTTP directly: it hands a [`FetchRequest`] to a
//! [`Fetcher`] and gets JSON back. [`HttpFetcher`] is the reqwest-backed
//! implementation; tests and embedders (e.g. a privileged proxy process) can
//! supply their own.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HOST};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Default timeout for directory requests (15 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "PMORadio/0.1 (pmoradiobrowser)";

/// One GET request against a mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: Url,
    /// Explicit `Host` header, for mirrors addressed by IP
    pub virtual_host: Option<String>,
    pub timeout: Duration,
}

/// Abstract `request(url, headers, timeout) -> JSON | error`
///
/// Implementations must report HTTP 5xx as an error and parse the body of any
/// other status.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_json(&self, request: &FetchRequest) -> Result<Value>;
}

/// reqwest-backed [`Fetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with its own connection pool
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// Create a fetcher with a custom reqwest::Client
    ///
    /// Useful for sharing HTTP connection pools or custom proxy settings
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_json(&self, request: &FetchRequest) -> Result<Value> {
        let mut builder = self
            .client
            .get(request.url.clone())
            .timeout(request.timeout)
            .header(ACCEPT, "application/json");

        if let Some(host) = &request.virtual_host {
            builder = builder.header(HOST, host.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();

        if status.is_server_error() {
            return Err(Error::ServerError {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
