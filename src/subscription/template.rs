//! Base template loading.

use serde_yaml::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::subscription::document::parse;

const DEFAULT_TEMPLATE: &str = include_str!("../../assets/base-template.yaml");

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse template: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("template must be a YAML mapping")]
    NotMapping,
}

/// The template compiled into the binary.
pub fn default_template() -> Result<Value, TemplateError> {
    parse_template(DEFAULT_TEMPLATE)
}

/// Load the template at `path`, or the built-in one when `path` is `None`.
pub fn load_template(path: Option<&str>) -> Result<Value, TemplateError> {
    match path {
        None => default_template(),
        Some(path) => {
            let text = fs::read_to_string(Path::new(path)).map_err(|source| TemplateError::Io {
                path: path.to_string(),
                source,
            })?;
            parse_template(&text)
        }
    }
}

fn parse_template(text: &str) -> Result<Value, TemplateError> {
    let value = parse(text)?;
    if value.is_mapping() {
        Ok(value)
    } else {
        Err(TemplateError::NotMapping)
    }
}
