//! Content-fetcher seam for the enrichment worker.
//!
//! The worker talks to the network through this trait so tests can inject a
//! scripted fetcher and the caller owns the real client's lifecycle.

use async_trait::async_trait;
use linkloom_fetch::{FetchError, Fetcher};

/// Fetches the HTML body of a URL, classifying every failure.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[async_trait]
impl ContentFetcher for Fetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        Fetcher::fetch(self, url).await
    }
}
