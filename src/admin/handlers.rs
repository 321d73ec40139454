use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::http::response::AppError;
use crate::http::server::AppState;
use crate::subscription::source::{validate_sources, Source};

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub token_configured: bool,
    pub source_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenUpdate {
    pub token: String,
}

pub async fn get_status(State(state): State<AppState>) -> Result<Json<SystemStatus>, AppError> {
    let token_configured = state
        .store
        .token()?
        .map(|t| !t.is_empty())
        .unwrap_or(false);

    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        token_configured,
        source_count: state.store.sources()?.len(),
    }))
}

pub async fn get_subs(State(state): State<AppState>) -> Result<Json<Vec<Source>>, AppError> {
    Ok(Json(state.store.sources()?))
}

pub async fn put_subs(
    State(state): State<AppState>,
    Json(sources): Json<Vec<Source>>,
) -> Result<StatusCode, AppError> {
    validate_sources(&sources).map_err(AppError::InvalidSources)?;
    state.store.set_sources(&sources)?;
    tracing::info!(count = sources.len(), "Subscription sources updated");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn put_token(
    State(state): State<AppState>,
    Json(update): Json<TokenUpdate>,
) -> Result<StatusCode, AppError> {
    let token = update.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("token must not be empty".to_string()));
    }
    if token.contains('/') {
        return Err(AppError::BadRequest("token must not contain '/'".to_string()));
    }
    state.store.set_token(token)?;
    tracing::info!("Access token updated");
    Ok(StatusCode::NO_CONTENT)
}
