//! Fetching one subscription source.
//!
//! # Responsibilities
//! - GET the source URL once with the configured User-Agent
//! - Parse the body as YAML and pull out its `proxies` sequence
//! - Turn every failure (status, transport, parse, timeout) into an empty
//!   proxy list plus one log event
//!
//! # Design Decisions
//! - No retries: a dead source is skipped for this request only
//! - Transport sits behind [`HttpClient`] so merge logic can be tested
//!   without sockets

use std::future::Future;
use std::time::{Duration, Instant};
use serde_yaml::Value;
use thiserror::Error;

use crate::observability::metrics;
use crate::subscription::document::{parse, PROXIES_KEY};
use crate::subscription::model::Proxy;
use crate::subscription::source::Source;

/// Status and body of a completed GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Request could not be completed at the transport level.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Outbound HTTP used to download subscriptions.
pub trait HttpClient: Send + Sync {
    fn get(
        &self,
        url: &str,
        user_agent: &str,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// Default cap on a subscription body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// [`HttpClient`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Same connection pool, different body cap.
    pub fn with_max_body_bytes(&self, max_body_bytes: usize) -> Self {
        Self {
            client: self.client.clone(),
            max_body_bytes,
        }
    }

    fn too_large(&self) -> TransportError {
        TransportError(format!(
            "response body exceeds {} bytes",
            self.max_body_bytes
        ))
    }
}

impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, user_agent: &str) -> Result<HttpResponse, TransportError> {
        let mut response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(self.too_large());
        }

        let mut buf = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| TransportError(e.to_string()))?
        {
            if buf.len() + chunk.len() > self.max_body_bytes {
                return Err(self.too_large());
            }
            buf.extend_from_slice(&chunk);
        }

        let body = String::from_utf8_lossy(&buf).into_owned();
        Ok(HttpResponse { status, body })
    }
}

/// Why a fetch produced the proxies it did.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched(Vec<Proxy>),
    HttpStatus(u16),
    Transport(String),
    Parse(String),
    TimedOut,
}

impl FetchOutcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Fetched(_) => "ok",
            FetchOutcome::HttpStatus(_) => "http_status",
            FetchOutcome::Transport(_) => "transport",
            FetchOutcome::Parse(_) => "parse",
            FetchOutcome::TimedOut => "timeout",
        }
    }

    /// The fetched proxies, or an empty list for any failure.
    pub fn into_proxies(self) -> Vec<Proxy> {
        match self {
            FetchOutcome::Fetched(proxies) => proxies,
            _ => Vec::new(),
        }
    }
}

/// Downloads and decodes one source at a time.
#[derive(Clone)]
pub struct SourceFetcher<C> {
    client: C,
    user_agent: String,
    timeout: Duration,
}

impl<C: HttpClient> SourceFetcher<C> {
    pub fn new(client: C, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            timeout,
        }
    }

    /// Fetch `source`, never failing: every error degrades to an outcome
    /// whose [`FetchOutcome::into_proxies`] is empty.
    pub async fn fetch(&self, source: &Source) -> FetchOutcome {
        let start = Instant::now();
        tracing::debug!(source = %source.name, url = %source.url, "Fetching subscription");

        let outcome = match tokio::time::timeout(self.timeout, self.fetch_once(source)).await {
            Ok(outcome) => outcome,
            Err(_) => FetchOutcome::TimedOut,
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            FetchOutcome::Fetched(proxies) => tracing::info!(
                source = %source.name,
                proxy_count = proxies.len(),
                duration_ms,
                "Subscription fetched"
            ),
            FetchOutcome::HttpStatus(status) => tracing::error!(
                source = %source.name,
                url = %source.url,
                status,
                duration_ms,
                "Subscription fetch failed"
            ),
            FetchOutcome::Transport(error) | FetchOutcome::Parse(error) => tracing::error!(
                source = %source.name,
                error = %error,
                kind = outcome.label(),
                duration_ms,
                "Subscription fetch failed"
            ),
            FetchOutcome::TimedOut => tracing::error!(
                source = %source.name,
                timeout_secs = self.timeout.as_secs(),
                duration_ms,
                "Subscription fetch timed out"
            ),
        }
        metrics::record_fetch(outcome.label(), start);

        outcome
    }

    async fn fetch_once(&self, source: &Source) -> FetchOutcome {
        let response = match self.client.get(&source.url, &self.user_agent).await {
            Ok(r) => r,
            Err(e) => return FetchOutcome::Transport(e.0),
        };

        if !(200..300).contains(&response.status) {
            return FetchOutcome::HttpStatus(response.status);
        }

        match extract_proxies(&source.name, &response.body) {
            Ok(proxies) => FetchOutcome::Fetched(proxies),
            Err(e) => FetchOutcome::Parse(e),
        }
    }
}

/// Pull the `proxies` sequence out of a subscription document.
///
/// A missing or null `proxies` key is an empty list. Entries without a
/// string `name` are dropped with a warning.
pub fn extract_proxies(source_name: &str, body: &str) -> Result<Vec<Proxy>, String> {
    let document = parse(body).map_err(|e| e.to_string())?;
    let root = match document {
        Value::Mapping(root) => root,
        _ => return Err("subscription document is not a mapping".to_string()),
    };

    let entries = match root.get(PROXIES_KEY) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Sequence(entries)) => entries.clone(),
        Some(_) => return Err("`proxies` is not a sequence".to_string()),
    };

    let mut proxies = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match Proxy::from_value(entry) {
            Some(proxy) => proxies.push(proxy),
            None => tracing::warn!(source = %source_name, index, "Dropping proxy entry without a name"),
        }
    }
    Ok(proxies)
}
