//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, concurrency > 0)
//! - Check that reserved group names are distinct
//! - Check bootstrap sources the same way the admin API does
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{ServiceConfig, StoreBackend};
use crate::subscription::source::{validate_sources, SourceError};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("group name '{0}' must not be empty")]
    EmptyGroupName(&'static str),

    #[error("select and auto groups share the name '{0}'")]
    GroupNameClash(String),

    #[error("listener.request_timeout_secs ({request}) must exceed fetch.timeout_secs ({fetch})")]
    RequestTimeoutTooShort { request: u64, fetch: u64 },

    #[error("invalid probe url '{0}'")]
    ProbeUrl(String),

    #[error("file store requires store.path")]
    MissingStorePath,

    #[error("bootstrap source: {0}")]
    Source(#[from] SourceError),
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config
        .listener
        .bind_address
        .parse::<std::net::SocketAddr>()
        .is_err()
    {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("listener.request_timeout_secs"));
    }
    if config.fetch.timeout_secs == 0 {
        errors.push(ValidationError::Zero("fetch.timeout_secs"));
    }
    if config.fetch.max_concurrency == 0 {
        errors.push(ValidationError::Zero("fetch.max_concurrency"));
    }
    if config.fetch.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("fetch.max_body_bytes"));
    }
    if config.listener.request_timeout_secs <= config.fetch.timeout_secs {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request: config.listener.request_timeout_secs,
            fetch: config.fetch.timeout_secs,
        });
    }
    if config.merge.probe_interval_secs == 0 {
        errors.push(ValidationError::Zero("merge.probe_interval_secs"));
    }

    let merge = &config.merge;
    if merge.select_group_name.trim().is_empty() {
        errors.push(ValidationError::EmptyGroupName("merge.select_group_name"));
    }
    if merge.auto_group_name.trim().is_empty() {
        errors.push(ValidationError::EmptyGroupName("merge.auto_group_name"));
    }
    if !merge.select_group_name.is_empty() && merge.select_group_name == merge.auto_group_name {
        errors.push(ValidationError::GroupNameClash(
            merge.select_group_name.clone(),
        ));
    }

    match url::Url::parse(&merge.probe_url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::ProbeUrl(merge.probe_url.clone())),
    }

    if config.store.backend == StoreBackend::File && config.store.path.is_none() {
        errors.push(ValidationError::MissingStorePath);
    }

    if let Err(source_errors) = validate_sources(&config.store.bootstrap_sources) {
        errors.extend(source_errors.into_iter().map(ValidationError::from));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
