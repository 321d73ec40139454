//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, timeout)
//! - Serve `GET /subs/{token}`: token check → load sources → merge → YAML
//! - Apply hot-reloaded configuration without dropping connections

use arc_swap::ArcSwap;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_yaml::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::config::ServiceConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::{AppError, YAML_CONTENT_TYPE};
use crate::observability::metrics;
use crate::store::SubscriptionStore;
use crate::subscription::{load_template, ConfigMerger, ReqwestClient, TemplateError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to load base template: {0}")]
    Template(#[from] TemplateError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Everything a request needs that can change on config reload.
pub struct AppInner {
    pub config: ServiceConfig,
    pub template: Value,
    pub merger: ConfigMerger<ReqwestClient>,
}

impl AppInner {
    fn build(config: ServiceConfig, client: ReqwestClient) -> Result<Self, TemplateError> {
        let template = load_template(config.merge.base_template_path.as_deref())?;
        let client = client.with_max_body_bytes(config.fetch.max_body_bytes);
        let merger = ConfigMerger::from_config(client, &config);
        Ok(Self {
            config,
            template,
            merger,
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<AppInner>>,
    pub store: SubscriptionStore,
    client: ReqwestClient,
}

impl AppState {
    pub fn new(config: ServiceConfig, store: SubscriptionStore) -> Result<Self, ServerError> {
        let client = ReqwestClient::new()?;
        let inner = AppInner::build(config, client.clone())?;
        Ok(Self {
            inner: Arc::new(ArcSwap::from_pointee(inner)),
            store,
            client,
        })
    }

    /// Swap in a new configuration. On error the current one stays active.
    pub fn reload(&self, config: ServiceConfig) -> Result<(), TemplateError> {
        let inner = AppInner::build(config, self.client.clone())?;
        self.inner.store(Arc::new(inner));
        Ok(())
    }
}

/// HTTP server for the subscription merger.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: ServiceConfig, store: SubscriptionStore) -> Result<Self, ServerError> {
        let state = AppState::new(config.clone(), store)?;
        let router = Self::build_router(&config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/subs/{token}", get(subscription_handler))
            .route("/health", get(health_handler));

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        // outermost first
        let middleware = ServiceBuilder::new()
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(propagate_request_id_layer())
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )));

        router.fallback(not_found).with_state(state).layer(middleware)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve on `listener` until `shutdown` fires, applying every config
    /// received on `config_updates` along the way.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ServiceConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match state.reload(config) {
                    Ok(()) => tracing::info!("Configuration reloaded"),
                    Err(e) => tracing::error!(error = %e, "Reload rejected; keeping current configuration"),
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// `GET /subs/{token}`: the merged subscription as YAML.
async fn subscription_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();
    let request_id = request_id(&headers);

    let response = match merged_subscription(&state, &token, request_id).await {
        Ok(body) => ([(header::CONTENT_TYPE, YAML_CONTENT_TYPE)], body).into_response(),
        Err(e) => e.into_response(),
    };

    metrics::record_request(response.status().as_u16(), start);
    tracing::info!(
        request_id = %request_id,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Subscription request finished"
    );
    response
}

async fn merged_subscription(
    state: &AppState,
    token: &str,
    request_id: &str,
) -> Result<String, AppError> {
    if !state.store.verify_token(token)? {
        return Err(AppError::InvalidToken);
    }

    let sources = state.store.sources()?;
    if sources.is_empty() {
        return Err(AppError::NoSourcesConfigured);
    }
    tracing::debug!(request_id = %request_id, sources = sources.len(), "Merging subscriptions");

    let inner = state.inner.load_full();
    let document = inner.merger.merge(&sources, &inner.template).await?;
    Ok(document.to_yaml()?)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}
