use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::json;

use crate::monitoring::classification::{ConfigStoreError, Incident, RiskClassificationConfig};

use super::domain::InvestigationId;
use super::repository::RepositoryError;
use super::scheduler::SchedulerError;
use super::service::{InvestigationRequest, MonitoringService, MonitoringServiceError};

/// Router builder exposing HTTP endpoints for classification and
/// investigation lifecycle management.
pub fn monitoring_router(service: Arc<MonitoringService>) -> Router {
    Router::new()
        .route(
            "/api/v1/monitoring/incidents/classify",
            post(classify_handler),
        )
        .route(
            "/api/v1/monitoring/investigations",
            post(open_investigation_handler),
        )
        .route(
            "/api/v1/monitoring/investigations/:investigation_id",
            get(investigation_status_handler).delete(cancel_investigation_handler),
        )
        .route("/api/v1/monitoring/risk-config", put(update_config_handler))
        .with_state(service)
}

pub(crate) async fn classify_handler(
    State(service): State<Arc<MonitoringService>>,
    axum::Json(incident): axum::Json<Incident>,
) -> Response {
    match service.classify(&incident) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn open_investigation_handler(
    State(service): State<Arc<MonitoringService>>,
    axum::Json(request): axum::Json<InvestigationRequest>,
) -> Response {
    match service.open_investigation(request) {
        Ok(investigation) => {
            (StatusCode::ACCEPTED, axum::Json(investigation.status_view())).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn investigation_status_handler(
    State(service): State<Arc<MonitoringService>>,
    Path(investigation_id): Path<String>,
) -> Response {
    let id = InvestigationId(investigation_id);
    match service.get(&id) {
        Ok(investigation) => {
            (StatusCode::OK, axum::Json(investigation.status_view())).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_investigation_handler(
    State(service): State<Arc<MonitoringService>>,
    Path(investigation_id): Path<String>,
) -> Response {
    let id = InvestigationId(investigation_id);
    match service.cancel(&id) {
        Ok(investigation) => {
            (StatusCode::OK, axum::Json(investigation.status_view())).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_config_handler(
    State(service): State<Arc<MonitoringService>>,
    axum::Json(config): axum::Json<RiskClassificationConfig>,
) -> Response {
    match service.update_risk_config(config) {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(json!({ "status": "updated" })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: MonitoringServiceError) -> Response {
    let status = match &error {
        MonitoringServiceError::Repository(RepositoryError::NotFound)
        | MonitoringServiceError::Scheduler(SchedulerError::Repository(
            RepositoryError::NotFound,
        )) => StatusCode::NOT_FOUND,
        MonitoringServiceError::Repository(RepositoryError::Conflict)
        | MonitoringServiceError::Scheduler(SchedulerError::Repository(
            RepositoryError::Conflict,
        )) => StatusCode::CONFLICT,
        MonitoringServiceError::Validation(_)
        | MonitoringServiceError::ConfigStore(ConfigStoreError::Invalid(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
