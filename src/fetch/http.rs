//! reqwest-backed transport for the analytics endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::warn;
use url::Url;

use super::{AttemptFailure, FetchError, FetcherConfig, MetricsTransport};
use crate::config::ApiToken;
use crate::models::{MetricQuery, MetricsResponse};

/// Characters of an error body kept for diagnostics.
const BODY_SNIPPET_CHARS: usize = 200;

/// Sends metric queries over HTTPS.
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Create a transport with auth and content headers preset.
    pub fn new(config: &FetcherConfig, token: &ApiToken) -> Result<Self, FetchError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", config.endpoint, e)))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&token.authorization())
            .map_err(|_| FetchError::InvalidHeader("Authorization".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&config.accept)
                .map_err(|_| FetchError::InvalidHeader("Accept".to_string()))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("mtta-updater/0.1.0")),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl MetricsTransport for HttpTransport {
    async fn send(&self, query: &MetricQuery) -> Result<MetricsResponse, AttemptFailure> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(query)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(AttemptFailure::RateLimited { retry_after });
        }

        if !status.is_success() {
            let headers = format!("{:?}", response.headers());
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(BODY_SNIPPET_CHARS).collect();

            warn!("Non-success response: {}", status);
            warn!("Response headers: {}", headers);
            warn!("Response content: {}...", snippet);

            return Err(AttemptFailure::Status {
                status: status.as_u16(),
                body: snippet,
            });
        }

        let body = response.text().await.map_err(classify)?;
        serde_json::from_str::<Value>(&body)
            .map(MetricsResponse::new)
            .map_err(|e| AttemptFailure::Request(format!("invalid JSON body: {}", e)))
    }
}

fn classify(err: reqwest::Error) -> AttemptFailure {
    if err.is_timeout() {
        AttemptFailure::Timeout(err.to_string())
    } else if err.is_connect() {
        AttemptFailure::Connect(err.to_string())
    } else {
        AttemptFailure::Request(err.to_string())
    }
}
