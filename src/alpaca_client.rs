use crate::config::{self, RetryPolicy};
use crate::credentials::Credentials;
use crate::error::SnapshotError;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;
use tracing::{debug, warn};

/// Anything that can hand back the raw snapshot response for an underlying.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshots(&self, underlying: &str) -> Result<Value, SnapshotError>;
}

// -----------------------------------------------
// CLIENT WRAPPER
// -----------------------------------------------
pub struct AlpacaClient {
    client: Client,
    feed: String,
    limit: u32,
    retry: RetryPolicy,
}

/// Outcome of one failed attempt; only `Retryable` goes around again.
#[derive(Debug)]
enum AttemptError {
    Retryable(String),
    Fatal(String),
}

impl AttemptError {
    fn into_message(self) -> String {
        match self {
            AttemptError::Retryable(msg) | AttemptError::Fatal(msg) => msg,
        }
    }
}

impl AlpacaClient {
    pub fn new(
        credentials: &Credentials,
        feed: &str,
        limit: u32,
        retry: RetryPolicy,
    ) -> Result<Self, SnapshotError> {
        Ok(Self {
            client: build_client(credentials, &retry)?,
            feed: feed.to_string(),
            limit,
            retry,
        })
    }

    /// GET with a fixed retry budget and a fixed pause between attempts.
    async fn fetch_json(&self, url: &str) -> Result<Value, SnapshotError> {
        let retries = self.retry.attempts.saturating_sub(1);
        let strategy = FixedInterval::new(self.retry.backoff).take(retries);
        let counter = AtomicUsize::new(0);
        let attempt = &counter;

        RetryIf::spawn(
            strategy,
            move || async move {
                let n = attempt.fetch_add(1, Ordering::Relaxed) + 1;
                let result = self.try_fetch(url).await;
                if let Err(e) = &result {
                    warn!(attempt = n, url, error = ?e, "Snapshot request failed");
                }
                result
            },
            |e: &AttemptError| matches!(e, AttemptError::Retryable(_)),
        )
        .await
        .map_err(|e| {
            SnapshotError::Transport(format!(
                "{} (after {} attempt(s))",
                e.into_message(),
                counter.load(Ordering::Relaxed)
            ))
        })
    }

    async fn try_fetch(&self, url: &str) -> Result<Value, AttemptError> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(format!("Request send failed: {}", e)))?;

        let status = res.status();
        debug!(url, status = status.as_u16(), "Snapshot response");

        if status.is_success() {
            let text = res
                .text()
                .await
                .map_err(|e| AttemptError::Retryable(format!("Failed to read body: {}", e)))?;

            serde_json::from_str::<Value>(&text).map_err(|e| {
                let preview: String = text.chars().take(200).collect();
                AttemptError::Fatal(format!("Non-JSON response ({}): {}", e, preview))
            })
        } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Err(AttemptError::Retryable(format!("Retryable error: {}", status)))
        } else {
            let body = res.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            Err(AttemptError::Fatal(format!("Client error {}: {}", status, preview)))
        }
    }
}

#[async_trait]
impl SnapshotSource for AlpacaClient {
    async fn fetch_snapshots(&self, underlying: &str) -> Result<Value, SnapshotError> {
        let url = config::alpaca_snapshots_url(underlying, &self.feed, self.limit);
        self.fetch_json(&url).await
    }
}

// -----------------------------------------------
// HTTP CLIENT BUILDER
// -----------------------------------------------
fn build_client(credentials: &Credentials, retry: &RetryPolicy) -> Result<Client, SnapshotError> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

    let mut key = header::HeaderValue::from_str(&credentials.api_key)
        .map_err(|e| SnapshotError::CredentialsMissing(format!("invalid API key: {}", e)))?;
    key.set_sensitive(true);
    headers.insert(config::HEADER_API_KEY, key);

    let mut secret = header::HeaderValue::from_str(&credentials.api_secret)
        .map_err(|e| SnapshotError::CredentialsMissing(format!("invalid API secret: {}", e)))?;
    secret.set_sensitive(true);
    headers.insert(config::HEADER_API_SECRET, secret);

    Client::builder()
        .default_headers(headers)
        .timeout(retry.timeout)
        .build()
        .map_err(SnapshotError::from)
}
