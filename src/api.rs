use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::executor::CalculiXExecutor;
use crate::model::Deck;
use crate::models::{AnalysisResponse, AnalysisStatus, DeckRequest, NormalizeResponse, ParseResponse};
use crate::reader::{read_str, ReaderOptions};
use crate::summary::summarize;
use crate::validate::{validate, ValidationReport};
use crate::writer::write_deck;

/// Application state
pub struct AppState {
    config: ServiceConfig,
    executor: CalculiXExecutor,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            executor: CalculiXExecutor::new(&config),
            config,
        }
    }

    fn read(&self, request: &DeckRequest) -> Result<Deck, ApiError> {
        let options = ReaderOptions {
            strict: request.strict.unwrap_or(self.config.strict),
        };
        read_str(&request.deck, &options).map_err(|e| ApiError::InvalidDeck(e.to_string()))
    }
}

/// Build the API router
pub fn create_router(config: ServiceConfig) -> Router {
    let state = AppState::new(config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/api/v1/version", get(version_handler))
        .route("/api/v1/parse", post(parse_handler))
        .route("/api/v1/validate", post(validate_handler))
        .route("/api/v1/normalize", post(normalize_handler))
        .route("/api/v1/analyze", post(analyze_handler))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Root endpoint
async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({
        "service": "ccx-deck",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "description": "Reads, validates and normalizes CalculiX/Abaqus input decks, and runs them through ccx",
        "supported_procedures": ["STATIC", "FREQUENCY", "HEAT TRANSFER"]
    }))
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let ccx_available = state.executor.solver_available().await;

    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "calculix_available": ccx_available,
        "calculix_command": state.executor.ccx_path()
    }))
}

/// Version endpoint
async fn version_handler() -> Json<serde_json::Value> {
    Json(json!({
        "service": "ccx-deck",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "solver": "CalculiX (ccx)"
    }))
}

async fn parse_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeckRequest>,
) -> Result<Json<ParseResponse>, ApiError> {
    let deck = state.read(&request)?;
    let summary = summarize(&deck);
    tracing::info!("Parsed deck: {} nodes, {} elements", summary.nodes, summary.elements);
    Ok(Json(ParseResponse { deck, summary }))
}

/// Validate a deck without running it
async fn validate_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeckRequest>,
) -> Result<Json<ValidationReport>, ApiError> {
    let deck = state.read(&request)?;
    let report = validate(&deck);
    tracing::info!(
        "Validated deck: {} errors, {} warnings",
        report.error_count,
        report.warning_count
    );
    Ok(Json(report))
}

async fn normalize_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeckRequest>,
) -> Result<Json<NormalizeResponse>, ApiError> {
    let deck = state.read(&request)?;
    Ok(Json(NormalizeResponse { deck: write_deck(&deck) }))
}

/// Run analysis
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeckRequest>,
) -> Result<(StatusCode, Json<AnalysisResponse>), ApiError> {
    let job_id = Uuid::new_v4().to_string();
    tracing::info!("Received analysis request {}", job_id);

    // 1. Read and validate
    let deck = state.read(&request)?;
    let report = validate(&deck);
    if !report.is_valid() {
        tracing::warn!("Rejecting job {}: {} validation errors", job_id, report.error_count);
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(AnalysisResponse {
                job_id,
                status: AnalysisStatus::Rejected,
                results: None,
                error_message: Some("deck failed validation".to_string()),
                report: Some(report),
                timestamp: chrono::Utc::now().to_rfc3339(),
            }),
        ));
    }

    // 2. Execute analysis
    let results = match state.executor.execute(&deck).await {
        Ok(results) => results,
        Err(e) => {
            tracing::error!("Job {} failed: {}", job_id, e);
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AnalysisResponse {
                    job_id,
                    status: AnalysisStatus::Failed,
                    results: None,
                    error_message: Some(format!("Analysis execution failed: {}", e)),
                    report: Some(report),
                    timestamp: chrono::Utc::now().to_rfc3339(),
                }),
            ));
        }
    };

    Ok((
        StatusCode::OK,
        Json(AnalysisResponse {
            job_id,
            status: AnalysisStatus::Success,
            results: Some(results),
            error_message: None,
            report: Some(report),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    ))
}

/// API Errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid deck: {0}")]
    InvalidDeck(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidDeck(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
