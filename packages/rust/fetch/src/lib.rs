//! HTTP content fetching with retry, backoff, and error classification.
//!
//! The [`Fetcher`] issues GET requests with a realistic browser identity,
//! follows redirects, and classifies every failure as either terminal
//! (never retried within a run) or retryable. Retryable failures are
//! retried with a fixed linear backoff until the attempt budget is spent.

use std::time::Duration;

use linkloom_shared::FailureKind;
use reqwest::{Client, StatusCode, redirect::Policy};
use tracing::{debug, warn};

/// Browser identity sent with every request. Some sites serve stripped or
/// blocked responses to obvious bot user agents.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// FetchError
// ---------------------------------------------------------------------------

/// A classified fetch failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// HTTP 401/403 — the page wants credentials we don't have.
    #[error("authentication required or access denied")]
    AuthOrAccessDenied,

    /// HTTP 404.
    #[error("URL not found")]
    NotFound,

    /// The fetch itself succeeded but the body is not HTML.
    #[error("not HTML content: {0}")]
    UnsupportedContentType(String),

    /// TLS/certificate problem. Certificate problems will not self-resolve
    /// on retry.
    #[error("SSL certificate error")]
    Tls(String),

    /// Any other HTTP error status (retried before being surfaced).
    #[error("HTTP {0} error")]
    HttpStatus(u16),

    /// Per-attempt timeout elapsed.
    #[error("request timeout")]
    Timeout,

    /// Connection-level failure (refused, reset, DNS).
    #[error("connection error")]
    Connect(String),

    /// Anything else the transport reported.
    #[error("error: {0}")]
    Other(String),
}

impl FetchError {
    /// Whether another attempt within the same run could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpStatus(_) | Self::Timeout | Self::Connect(_) | Self::Other(_) => true,
            Self::AuthOrAccessDenied | Self::NotFound | Self::UnsupportedContentType(_) => false,
            Self::Tls(_) => false,
        }
    }

    /// Failure classification once this error is surfaced to the caller.
    pub fn kind(&self) -> FailureKind {
        if self.is_retryable() {
            // Surfaced retryable errors have exhausted their budget.
            FailureKind::TransientExhausted
        } else {
            FailureKind::Terminal
        }
    }

    /// Whether this failure belongs to the auth/access-denied/not-found
    /// family that still yields a storable placeholder record.
    pub fn is_access_family(&self) -> bool {
        matches!(self, Self::AuthOrAccessDenied | Self::NotFound)
    }
}

/// Map a transport-level `reqwest` error to a [`FetchError`].
fn classify_transport_error(err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::Timeout;
    }

    // reqwest has no TLS predicate; recognize certificate failures from the
    // error chain text.
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(cause) = source {
        let text = cause.to_string().to_lowercase();
        if text.contains("certificate") || text.contains("tls") || text.contains("ssl") {
            return FetchError::Tls(cause.to_string());
        }
        source = cause.source();
    }

    if err.is_connect() {
        return FetchError::Connect(err.to_string());
    }

    FetchError::Other(err.to_string())
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Options controlling per-fetch behavior.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Total attempts for one fetch (first try included).
    pub max_attempts: usize,
    /// Fixed delay between attempts (linear backoff).
    pub retry_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// HTTP fetcher with retry and error classification.
pub struct Fetcher {
    client: Client,
    options: FetchOptions,
}

impl Fetcher {
    /// Create a fetcher with default options.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_options(FetchOptions::default())
    }

    /// Create a fetcher with explicit options.
    pub fn with_options(options: FetchOptions) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(options.timeout)
            .redirect(Policy::limited(10))
            .build()?;

        Ok(Self { client, options })
    }

    /// Fetch the HTML body of `url`.
    ///
    /// Terminal failures return immediately; retryable failures are retried
    /// up to the attempt budget with a fixed delay between attempts, then
    /// surfaced as-is.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut last_err = FetchError::Other("no attempts made".into());

        for attempt in 1..=self.options.max_attempts {
            match self.fetch_once(url).await {
                Ok(body) => {
                    debug!(url, attempt, "fetch succeeded");
                    return Ok(body);
                }
                Err(err) if err.is_retryable() && attempt < self.options.max_attempts => {
                    warn!(
                        url,
                        attempt,
                        max_attempts = self.options.max_attempts,
                        error = %err,
                        "fetch attempt failed, retrying"
                    );
                    last_err = err;
                    tokio::time::sleep(self.options.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err)
    }

    /// One GET attempt with response classification.
    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::AuthOrAccessDenied);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if status.as_u16() >= 400 {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        if !content_type.contains("text/html") {
            return Err(FetchError::UnsupportedContentType(content_type));
        }

        response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e))
    }
}
