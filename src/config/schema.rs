//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::subscription::Source;

/// Root configuration for the subscription merger.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, request limits).
    pub listener: ListenerConfig,

    /// Persistence store holding the token and subscription sources.
    pub store: StoreConfig,

    /// Outbound subscription fetch settings.
    pub fetch: FetchConfig,

    /// Merge policy: reserved group names and probe settings.
    pub merge: MergeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time allowed for one request, including every upstream fetch.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body (admin uploads).
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 60,
            max_body_size: 256 * 1024,
        }
    }
}

/// Which key-value backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

/// Persistence store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// JSON file path for the `file` backend.
    pub path: Option<String>,

    /// Token written to the store at startup when it has none.
    pub bootstrap_token: Option<String>,

    /// Sources written to the store at startup when it has none.
    pub bootstrap_sources: Vec<Source>,
}

/// Outbound fetch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// User-Agent sent to subscription providers. Many providers pick the
    /// response format based on it.
    pub user_agent: String,

    /// Per-source timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum number of sources fetched at once.
    pub max_concurrency: usize,

    /// Largest subscription body accepted; bigger responses count as failed.
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "clash-verge/v2.2.3".to_string(),
            timeout_secs: 10,
            max_concurrency: 4,
            max_body_bytes: crate::subscription::fetcher::DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Merge policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Name of the top-level manual-select group.
    pub select_group_name: String,

    /// Name of the latency-probe group.
    pub auto_group_name: String,

    /// Connectivity-check endpoint the client probes.
    pub probe_url: String,

    /// Probe interval in seconds.
    pub probe_interval_secs: u64,

    /// Optional YAML base template; the embedded default is used otherwise.
    pub base_template_path: Option<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            select_group_name: "PROXY".to_string(),
            auto_group_name: "AUTO".to_string(),
            probe_url: "http://www.gstatic.com/generate_204".to_string(),
            probe_interval_secs: 300,
            base_template_path: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}
