//! Subscription origins.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// One subscription origin: a display name and the URL to fetch.
///
/// The name doubles as the name of the select group built for this
/// source, so it must be unique within a source list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Problems found in a source list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("source #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("duplicate source name '{0}'")]
    DuplicateName(String),

    #[error("source '{name}' has invalid url '{url}'")]
    InvalidUrl { name: String, url: String },
}

/// Check names are present and unique and URLs are http(s).
pub fn validate_sources(sources: &[Source]) -> Result<(), Vec<SourceError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, source) in sources.iter().enumerate() {
        if source.name.trim().is_empty() {
            errors.push(SourceError::EmptyName { index });
        } else if !seen.insert(source.name.as_str()) {
            errors.push(SourceError::DuplicateName(source.name.clone()));
        }

        let url_ok = url::Url::parse(&source.url)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !url_ok {
            errors.push(SourceError::InvalidUrl {
                name: source.name.clone(),
                url: source.url.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
