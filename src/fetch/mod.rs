//! Resilient fetching of incident analytics.
//!
//! A [`Fetcher`] issues one metrics query, retrying through rate limits,
//! timeouts and connection failures according to a [`RetryPolicy`]. The wire
//! call itself sits behind [`MetricsTransport`] so the retry loop can be driven
//! without a network. In simulated mode no transport is used at all.

mod http;
pub mod retry;
mod simulate;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ApiToken;
use crate::models::{MetricQuery, MetricsResponse};

pub use http::HttpTransport;
pub use retry::{AttemptFailure, RetryPolicy, RetryState, Step};
pub use simulate::simulated_response;

/// Default analytics endpoint for aggregate incident metrics.
pub const DEFAULT_ENDPOINT: &str = "https://api.pagerduty.com/analytics/metrics/incidents/all";

/// Vendor-versioned media type expected by the analytics API.
pub const DEFAULT_ACCEPT: &str = "application/vnd.pagerduty+json;version=2";

/// Errors that end a fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Gave up after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: String },

    #[error("HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header value for {0}")]
    InvalidHeader(String),

    #[error("An API token is required unless running in simulate mode")]
    MissingToken,
}

/// Configuration for the metrics fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Analytics endpoint to POST queries to
    pub endpoint: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Accept header value
    pub accept: String,

    /// Pause before every request, independent of failures
    pub request_delay: Duration,

    /// Verify TLS certificates
    pub verify_tls: bool,

    /// Synthesize responses instead of calling the API
    pub simulate: bool,

    pub retry: RetryPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("mtta-updater/{}", env!("CARGO_PKG_VERSION")),
            accept: DEFAULT_ACCEPT.to_string(),
            request_delay: Duration::from_millis(2500),
            verify_tls: true,
            simulate: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// A single attempt at the analytics endpoint.
#[async_trait]
pub trait MetricsTransport: Send + Sync {
    /// Send `query` once and classify the outcome.
    async fn send(&self, query: &MetricQuery) -> Result<MetricsResponse, AttemptFailure>;
}

enum Source {
    Live(Arc<dyn MetricsTransport>),
    Simulated,
}

/// Metrics fetcher with throttling and retries.
pub struct Fetcher {
    source: Source,
    policy: RetryPolicy,
    request_delay: Duration,
}

impl Fetcher {
    /// Build a fetcher from configuration.
    ///
    /// Live mode needs `token`; simulate mode ignores it.
    pub fn from_config(config: &FetcherConfig, token: Option<&ApiToken>) -> Result<Self, FetchError> {
        if config.simulate {
            return Ok(Self::simulated());
        }

        let token = token.ok_or(FetchError::MissingToken)?;
        let transport = HttpTransport::new(config, token)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            config.retry.clone(),
            config.request_delay,
        ))
    }

    /// Fetcher over an arbitrary transport.
    pub fn with_transport(
        transport: Arc<dyn MetricsTransport>,
        policy: RetryPolicy,
        request_delay: Duration,
    ) -> Self {
        Self {
            source: Source::Live(transport),
            policy,
            request_delay,
        }
    }

    /// Fetcher that never touches the network.
    pub fn simulated() -> Self {
        Self {
            source: Source::Simulated,
            policy: RetryPolicy::default(),
            request_delay: Duration::ZERO,
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.source, Source::Simulated)
    }

    /// Run `query` until it succeeds or the retry policy gives up.
    pub async fn fetch(&self, query: &MetricQuery) -> Result<MetricsResponse, FetchError> {
        let transport = match &self.source {
            Source::Simulated => {
                info!("Using simulated API response");
                return Ok(simulated_response());
            }
            Source::Live(transport) => transport,
        };

        let mut state = RetryState::new(&self.policy);

        loop {
            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            debug!(
                "Request payload: {}",
                serde_json::to_string(query).unwrap_or_default()
            );

            let failure = match transport.send(query).await {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            let jitter = self.policy.sample_jitter();
            match state.next(&self.policy, failure.clone(), jitter) {
                Step::Retry { wait, state: next } => {
                    warn!(
                        "{}. Retrying in {:.2}s (attempt {}/{})",
                        failure,
                        wait.as_secs_f64(),
                        next.attempts,
                        self.policy.max_attempts
                    );
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                    state = next;
                }
                Step::GiveUp(err) => {
                    warn!("All retries failed: {}", err);
                    return Err(err);
                }
            }
        }
    }
}

/// Transport that replays a fixed script of outcomes.
#[cfg(test)]
pub struct ScriptedTransport {
    script: std::sync::Mutex<std::collections::VecDeque<Result<MetricsResponse, AttemptFailure>>>,
    fallback: Result<MetricsResponse, AttemptFailure>,
    calls: std::sync::atomic::AtomicUsize,
    queries: std::sync::Mutex<Vec<MetricQuery>>,
}

#[cfg(test)]
impl ScriptedTransport {
    /// Replays `script`, then answers every further call with `fallback`.
    pub fn new(
        script: Vec<Result<MetricsResponse, AttemptFailure>>,
        fallback: Result<MetricsResponse, AttemptFailure>,
    ) -> Self {
        Self {
            script: std::sync::Mutex::new(script.into()),
            fallback,
            calls: std::sync::atomic::AtomicUsize::new(0),
            queries: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `mean_seconds` for the first record.
    pub fn always_ok(mean_seconds: f64) -> Self {
        Self::new(Vec::new(), Ok(test_response(mean_seconds)))
    }

    /// Always fails to connect.
    pub fn always_failing() -> Self {
        Self::new(
            Vec::new(),
            Err(AttemptFailure::Connect("connection refused".to_string())),
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Every query sent so far, in order.
    pub fn queries(&self) -> Vec<MetricQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl MetricsTransport for ScriptedTransport {
    async fn send(&self, query: &MetricQuery) -> Result<MetricsResponse, AttemptFailure> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Response body with a single record.
#[cfg(test)]
pub fn test_response(mean_seconds: f64) -> MetricsResponse {
    MetricsResponse::new(serde_json::json!({
        "data": [{"mean_seconds_to_first_ack": mean_seconds, "total_incident_count": 3}]
    }))
}
