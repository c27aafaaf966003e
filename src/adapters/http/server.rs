//! REST surface of the ingestion pipeline.
//!
//! - `POST /api/v1` multipart upload (field `file`)
//! - `GET /api/v1/query?query=` grounded answer as text
//! - `GET /api/v1/search?query=&top_k=` ranked chunks as JSON
//! - `GET /api/v1/jobs`, `GET /api/v1/jobs/{id}`, `POST /api/v1/jobs/{id}/retry`
//! - `GET /health`

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    extract::multipart::MultipartRejection,
    extract::rejection::{PathRejection, QueryRejection},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::error::ApiError;
use crate::domain::models::{ChunkMetadata, JobRecord, SearchHit, ServerConfig};
use crate::services::{IngestionQueue, RetrievalService, UploadGate};

/// Response header carrying the id of the job an upload enqueued.
pub const JOB_ID_HEADER: &str = "x-ingestion-job-id";

/// Multipart field holding the uploaded document.
const FILE_FIELD: &str = "file";

/// Shared state for the HTTP handlers.
pub struct AppState {
    pub upload_gate: Arc<UploadGate>,
    pub queue: Arc<IngestionQueue>,
    pub retrieval: Arc<RetrievalService>,
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// One ranked chunk.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchHitResponse {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl From<SearchHit> for SearchHitResponse {
    fn from(hit: SearchHit) -> Self {
        Self {
            id: hit.chunk.id,
            score: hit.score,
            text: hit.chunk.text,
            metadata: hit.chunk.metadata,
        }
    }
}

/// Build the router with tracing and optional CORS.
pub fn build_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let app = Router::new()
        .route("/api/v1", post(upload_document))
        .route("/api/v1/query", get(query))
        .route("/api/v1/search", get(search))
        .route("/api/v1/jobs", get(list_jobs))
        .route("/api/v1/jobs/{id}", get(get_job))
        .route("/api/v1/jobs/{id}/retry", post(retry_job))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(state);

    if config.enable_cors {
        app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
            .layer(TraceLayer::new_for_http())
    } else {
        app.layer(TraceLayer::new_for_http())
    }
}

/// HTTP server for the ingestion and query API.
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    pub fn new(state: Arc<AppState>, config: ServerConfig) -> Self {
        Self { config, state }
    }

    /// Serve until `shutdown` resolves, then finish in-flight requests.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let router = build_router(self.state, &self.config);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "HTTP server listening");
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

// Handler functions

async fn health_check() -> &'static str {
    "OK"
}

async fn upload_document(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        let outcome = state
            .upload_gate
            .submit(&file_name, content_type.as_deref(), &bytes)
            .await?;

        let mut response = outcome.message().into_response();
        if let Some(job_id) = outcome.job_id() {
            if let Ok(value) = HeaderValue::from_str(&job_id.to_string()) {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(JOB_ID_HEADER), value);
            }
        }
        return Ok(response);
    }

    Err(ApiError::bad_request("Invalid file"))
}

async fn query(
    State(state): State<Arc<AppState>>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> Result<String, ApiError> {
    let Query(params) = params?;
    let query = params.query.unwrap_or_default();
    Ok(state.retrieval.answer(&query).await?)
}

async fn search(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<SearchHitResponse>>, ApiError> {
    let Query(params) = params?;
    let query = params.query.unwrap_or_default();
    let hits = state.retrieval.search(&query, params.top_k).await?;
    Ok(Json(hits.into_iter().map(SearchHitResponse::from).collect()))
}

async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobRecord>> {
    Json(state.queue.list().await)
}

async fn get_job(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<JobRecord>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.queue.get(id).await?))
}

async fn retry_job(
    State(state): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<(StatusCode, Json<JobRecord>), ApiError> {
    let Path(id) = id?;
    let new_id = state.queue.retry(id).await?;
    Ok((StatusCode::ACCEPTED, Json(state.queue.get(new_id).await?)))
}
