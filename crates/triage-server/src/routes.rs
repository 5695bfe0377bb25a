//! HTTP routes and handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::health::HealthReport;
use crate::service::{ServiceError, TicketService};
use triage_core::Prediction;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: TicketService,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(service: TicketService) -> Self {
        Self {
            service,
            metrics_handle: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

pub fn create_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .route("/predict", post(predict))
        .route("/metrics", get(metrics))
        .fallback(fallback)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    record_request("root", "ok");
    Json(json!({ "message": state.service.describe() }))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    record_request("health", "ok");
    Json(state.service.health())
}

/// Readiness check for orchestrators: 503 until a model is ready
async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.service.health();
    let status = if report.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    record_request("ready", if report.is_ready() { "ok" } else { "unavailable" });
    (status, Json(report))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// Prediction request body
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Prediction response body
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<Prediction>,
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    let Json(req) = payload.map_err(|rejection| {
        debug!("Rejected prediction body: {}", rejection.body_text());
        record_request("predict", "invalid_input");
        AppError::Rejected(rejection.status(), rejection.body_text())
    })?;

    match state.service.predict(req.text.as_deref()).await {
        Ok(result) => {
            record_request("predict", "ok");
            Ok(Json(PredictResponse {
                predictions: result.into_predictions(),
            }))
        }
        Err(e) => {
            let outcome = match e {
                ServiceError::InvalidInput(_) => "invalid_input",
                ServiceError::Unavailable => "unavailable",
                ServiceError::Internal => "error",
            };
            record_request("predict", outcome);
            Err(AppError::Service(e))
        }
    }
}

async fn fallback() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

fn record_request(endpoint: &'static str, outcome: &'static str) {
    metrics::counter!("triage_requests_total", "endpoint" => endpoint, "outcome" => outcome)
        .increment(1);
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    /// Body could not be read or parsed
    Rejected(StatusCode, String),
    Service(ServiceError),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        AppError::Service(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, kind) = match self {
            AppError::Rejected(status, msg) => {
                let status = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    status
                } else {
                    StatusCode::BAD_REQUEST
                };
                (status, msg, "invalid_request_error")
            }
            AppError::Service(err) => {
                let status = match err {
                    ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    ServiceError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                    ServiceError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    warn!("Request failed with {}: {}", status, err);
                }
                (status, err.to_string(), err.kind())
            }
        };

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}
