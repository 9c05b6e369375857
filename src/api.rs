use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::catalog::PageRequest;
use crate::discovery::DiscoveryError;
use crate::rank::RankedItem;
use crate::service::CatalogService;
use crate::worker::{AggregatorWorker, WorkerError};

/// Where page requests are executed: on the request runtime or on the worker thread.
#[derive(Clone)]
enum Backend {
    Inline(CatalogService),
    Offloaded(Arc<AggregatorWorker>),
}

#[derive(Clone)]
pub struct AppState {
    backend: Backend,
}

impl AppState {
    pub fn inline(service: CatalogService) -> Self {
        Self {
            backend: Backend::Inline(service),
        }
    }

    pub fn offloaded(worker: AggregatorWorker) -> Self {
        Self {
            backend: Backend::Offloaded(Arc::new(worker)),
        }
    }

    async fn ranked_page(&self, req: PageRequest) -> Result<Vec<RankedItem>, ApiError> {
        match &self.backend {
            Backend::Inline(service) => Ok(service.ranked_page(&req).await?),
            Backend::Offloaded(worker) => Ok(worker.submit(req).await?),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/get-movies", post(get_movies))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Request-level failure. Partial rating data never ends up here.
#[derive(Debug)]
pub enum ApiError {
    Discovery(DiscoveryError),
    WorkerStopped,
}

impl From<DiscoveryError> for ApiError {
    fn from(e: DiscoveryError) -> Self {
        ApiError::Discovery(e)
    }
}

impl From<WorkerError> for ApiError {
    fn from(e: WorkerError) -> Self {
        match e {
            WorkerError::Discovery(d) => ApiError::Discovery(d),
            WorkerError::Stopped => ApiError::WorkerStopped,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Discovery(e) => {
                // Only propagate error statuses; a stray 2xx/3xx would read as success.
                let status = if e.status.is_client_error() || e.status.is_server_error() {
                    e.status
                } else {
                    StatusCode::BAD_GATEWAY
                };
                (status, format!("Discovery API error: {}", e.message)).into_response()
            }
            ApiError::WorkerStopped => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

async fn get_movies(
    State(state): State<AppState>,
    Json(req): Json<PageRequest>,
) -> Result<Json<Vec<RankedItem>>, ApiError> {
    let page = req.page;
    let ranked = state.ranked_page(req).await?;
    tracing::info!(target: "ratings", page, items = ranked.len(), "page served");
    Ok(Json(ranked))
}
