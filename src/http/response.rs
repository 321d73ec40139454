//! Mapping service errors to HTTP responses.
//!
//! # Design Decisions
//! - Every failure is a non-2xx status with a plain-text message
//! - "Some sources down" is a 200 with partial data; "nothing usable" is 502
//! - Store and rendering faults are 500 and logged here

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::store::StoreError;
use crate::subscription::{MergeError, SerializeError, SourceError};

pub const YAML_CONTENT_TYPE: &str = "application/x-yaml; charset=utf-8";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid token")]
    InvalidToken,

    #[error("no subscription sources configured")]
    NoSourcesConfigured,

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error("invalid sources: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    InvalidSources(Vec<SourceError>),

    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::NoSourcesConfigured | AppError::Merge(MergeError::NoSources) => {
                StatusCode::NOT_FOUND
            }
            AppError::Merge(MergeError::NoUsableSubscriptions { .. }) => StatusCode::BAD_GATEWAY,
            AppError::Merge(MergeError::InvalidTemplate)
            | AppError::Store(_)
            | AppError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidSources(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("Failed: {}", self),
        )
            .into_response()
    }
}
