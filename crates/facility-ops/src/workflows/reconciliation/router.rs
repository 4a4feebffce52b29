use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::change_log::{ChangeLogSink, Sleeper};
use super::domain::{BusinessId, WorkItemId};
use super::service::{ReconciliationError, ReconciliationService};
use super::store::{CostChange, RecordStore, StoreError, WorkItemFilter};

type SharedService<S, L, Z> = Arc<ReconciliationService<S, L, Z>>;

/// Router builder exposing the reconciliation endpoints.
pub fn reconciliation_router<S, L, Z>(service: SharedService<S, L, Z>) -> Router
where
    S: RecordStore + 'static,
    L: ChangeLogSink + 'static,
    Z: Sleeper + 'static,
{
    Router::new()
        .route(
            "/api/v1/work-items/duplicates",
            get(duplicates_handler::<S, L, Z>),
        )
        .route(
            "/api/v1/work-items/duplicates/resolve",
            post(resolve_handler::<S, L, Z>),
        )
        .route(
            "/api/v1/work-items/batch-delete",
            post(batch_delete_handler::<S, L, Z>),
        )
        .route(
            "/api/v1/businesses/:business_id/receivables",
            get(receivable_handler::<S, L, Z>),
        )
        .route(
            "/api/v1/businesses/:business_id/costs",
            post(cost_change_handler::<S, L, Z>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct BatchDeleteRequest {
    pub ids: Vec<WorkItemId>,
}

#[derive(Debug, Deserialize)]
pub struct CostChangeRequest {
    pub change: CostChange,
    pub author: String,
}

pub(crate) async fn duplicates_handler<S, L, Z>(
    State(service): State<SharedService<S, L, Z>>,
    Query(filter): Query<WorkItemFilter>,
) -> Response
where
    S: RecordStore + 'static,
    L: ChangeLogSink + 'static,
    Z: Sleeper + 'static,
{
    match service.duplicates_report(&filter) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn resolve_handler<S, L, Z>(
    State(service): State<SharedService<S, L, Z>>,
    Query(filter): Query<WorkItemFilter>,
) -> Response
where
    S: RecordStore + 'static,
    L: ChangeLogSink + 'static,
    Z: Sleeper + 'static,
{
    match service.resolve_duplicates(&filter) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Partial failures are data: the response stays 200 and carries the per-id errors.
pub(crate) async fn batch_delete_handler<S, L, Z>(
    State(service): State<SharedService<S, L, Z>>,
    axum::Json(request): axum::Json<BatchDeleteRequest>,
) -> Response
where
    S: RecordStore + 'static,
    L: ChangeLogSink + 'static,
    Z: Sleeper + 'static,
{
    match service.soft_delete(&request.ids) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn receivable_handler<S, L, Z>(
    State(service): State<SharedService<S, L, Z>>,
    Path(business_id): Path<String>,
) -> Response
where
    S: RecordStore + 'static,
    L: ChangeLogSink + 'static,
    Z: Sleeper + 'static,
{
    match service.receivable(&BusinessId(business_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn cost_change_handler<S, L, Z>(
    State(service): State<SharedService<S, L, Z>>,
    Path(business_id): Path<String>,
    axum::Json(request): axum::Json<CostChangeRequest>,
) -> Response
where
    S: RecordStore + 'static,
    L: ChangeLogSink + 'static,
    Z: Sleeper + 'static,
{
    let id = BusinessId(business_id);
    // Change recording may back off between retries; keep it off the async workers.
    let outcome = tokio::task::spawn_blocking(move || {
        service.apply_cost_change(&id, request.change, &request.author)
    })
    .await;

    match outcome {
        Ok(Ok(report)) => (StatusCode::OK, axum::Json(report)).into_response(),
        Ok(Err(err)) => error_response(err),
        Err(join_error) => {
            error!(error = %join_error, "cost change task aborted");
            let payload = json!({ "error": "cost change task aborted" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn error_response(err: ReconciliationError) -> Response {
    let status = match &err {
        err if err.is_validation() => StatusCode::BAD_REQUEST,
        ReconciliationError::BusinessNotFound(_) | ReconciliationError::Store(StoreError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        ReconciliationError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
