// # HTTP Feed Source
//
// This crate provides the HTTP + JSON feed source for the flightboard system.
//
// ## Protocol
//
// A plain `GET` of a fixed URL that answers with a JSON array of flight
// records. Anything other than `200 OK` with a non-empty array is an error:
// non-success status, transport failure, invalid JSON, `null`, `[]`.
// Elements of the array that are not valid records are skipped and counted.
//
// ## Resource Lifecycle
//
// The `reqwest::Client` (and with it the connection pool) only exists
// between `connect` and `disconnect`. Fetching outside that window fails.

use flightboard_core::ComponentRegistry;
use flightboard_core::config::FeedConfig;
use flightboard_core::flight::{FeedSnapshot, decode_snapshot};
use flightboard_core::traits::{FeedSource, FeedSourceFactory};
use flightboard_core::{Error, Result};

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, info};

/// Request timeout of the underlying client
///
/// The engine bounds every fetch as well; this only keeps a stuck socket
/// from outliving the tick.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const USER_AGENT: &str = concat!("flightboard/", env!("CARGO_PKG_VERSION"));

/// Feed source fetching the flight board over HTTP
pub struct HttpFeedSource {
    /// URL of the flight board JSON
    url: String,

    /// Per-request timeout
    request_timeout: Duration,

    /// HTTP client, present while connected
    client: Option<reqwest::Client>,
}

impl HttpFeedSource {
    /// Create a new, not yet connected, HTTP feed source
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            client: None,
        }
    }

    /// Whether `connect` succeeded and `disconnect` was not called since
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }
}

#[async_trait::async_trait]
impl FeedSource for HttpFeedSource {
    async fn connect(&mut self) -> Result<()> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        info!("HTTP feed source ready (url={})", self.url);
        self.client = Some(client);
        Ok(())
    }

    async fn fetch(&self) -> Result<FeedSnapshot> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| Error::feed("HTTP feed source is not connected"))?;

        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::feed(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::feed(format!(
                "Unexpected status {} from {}",
                status, self.url
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::feed(format!("Failed to read response body: {}", e)))?;

        let snapshot = decode_snapshot(&body)?;
        debug!(
            "Fetched {} record(s) from {} ({} undecodable)",
            snapshot.records.len(),
            self.url,
            snapshot.undecodable
        );
        Ok(snapshot)
    }

    async fn disconnect(&mut self) {
        if self.client.take().is_some() {
            debug!("HTTP feed source released");
        }
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Factory for creating HTTP feed sources
pub struct HttpFeedFactory;

impl FeedSourceFactory for HttpFeedFactory {
    fn create(&self, config: &FeedConfig) -> Result<Box<dyn FeedSource>> {
        match config {
            FeedConfig::Http { url } => Ok(Box::new(HttpFeedSource::new(url.clone()))),
            _ => Err(Error::config("Invalid config for HTTP feed source")),
        }
    }
}

/// Register the HTTP feed source with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_feed_source("http", Box::new(HttpFeedFactory));
}
