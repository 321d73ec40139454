//! Admin API for managing the access token and subscription sources.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/subs", get(get_subs).put(put_subs))
        .route("/admin/token", put(put_token))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
