use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::reconciliation::router::{receivable_handler, reconciliation_router};
use crate::workflows::reconciliation::{ChangeRecorder, ReconciliationService};

fn router_with(store: MemoryStore, sink_failures: u32) -> (axum::Router, Arc<MemoryStore>) {
    let (service, store, _) = build_service(store, sink_failures);
    (reconciliation_router(Arc::new(service)), store)
}

fn duplicated_store() -> MemoryStore {
    let store = MemoryStore::with_items(vec![
        item("t1", "A", "subsidy", "pending", at(1, 9)),
        item("t2", "A", "subsidy", "pending", at(2, 9)),
        item("t3", "A", "subsidy", "pending", at(3, 9)),
    ]);
    store.insert_business(subsidy_business());
    store
}

fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn duplicates_route_returns_report() {
    let (router, _) = router_with(duplicated_store(), 0);

    let response = router
        .oneshot(
            Request::get("/api/v1/work-items/duplicates")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["summary"]["totalGroups"], 1);
    assert_eq!(body["summary"]["toDelete"], 2);
    assert_eq!(body["groups"][0]["members"][0]["id"], "t3");
    assert_eq!(body["groups"][0]["members"][0]["keep"], true);
}

#[tokio::test]
async fn duplicates_route_applies_query_filter() {
    let (router, _) = router_with(duplicated_store(), 0);

    let response = router
        .oneshot(
            Request::get("/api/v1/work-items/duplicates?businessName=B")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["summary"]["totalGroups"], 0);
}

#[tokio::test]
async fn batch_delete_reports_partial_failure_as_success() {
    let (router, store) = router_with(duplicated_store(), 0);

    let response = router
        .oneshot(json_post(
            "/api/v1/work-items/batch-delete",
            json!({ "ids": ["t1", "ghost", "t2"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["success"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["errors"][0]["id"], "ghost");
    assert!(store.get("t1").expect("kept").is_deleted);
}

#[tokio::test]
async fn batch_delete_rejects_empty_ids() {
    let (router, _) = router_with(duplicated_store(), 0);

    let response = router
        .oneshot(json_post(
            "/api/v1/work-items/batch-delete",
            json!({ "ids": [] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("at least one"));
}

#[tokio::test]
async fn resolve_route_soft_deletes_redundant_members() {
    let (router, store) = router_with(duplicated_store(), 0);

    let response = router
        .oneshot(
            Request::post("/api/v1/work-items/duplicates/resolve")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body, json!({ "success": 2, "failed": 0 }));
    assert!(!store.get("t3").expect("kept").is_deleted);
}

#[tokio::test]
async fn receivable_route_returns_view() {
    let (router, _) = router_with(duplicated_store(), 0);

    let response = router
        .oneshot(
            Request::get("/api/v1/businesses/biz-subsidy/receivables")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["receivable"], 500_000);
    assert_eq!(body["totalPayments"], 600_000);
    assert_eq!(body["paymentSeries"], "subsidy");
}

#[tokio::test]
async fn receivable_handler_returns_not_found_for_unknown_business() {
    let (service, _, _) = build_service(MemoryStore::default(), 0);

    let response = receivable_handler(State(Arc::new(service)), Path("ghost".to_string())).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn receivable_handler_returns_internal_error_on_store_outage() {
    let recorder = ChangeRecorder::with_sleeper(
        Arc::new(FlakySink::default()),
        Arc::new(RecordingSleeper::default()),
        retry_policy(),
    );
    let service = ReconciliationService::with_recorder(Arc::new(UnavailableStore), recorder);

    let response =
        receivable_handler(State(Arc::new(service)), Path("biz-subsidy".to_string())).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn cost_route_succeeds_even_when_audit_is_abandoned() {
    let (router, store) = router_with(duplicated_store(), 100);

    let response = router
        .oneshot(json_post(
            "/api/v1/businesses/biz-subsidy/costs",
            json!({
                "change": { "action": "update", "kind": "operating-cost", "amount": 90000 },
                "author": "Lee"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["applied"]["before"], 120_000);
    assert_eq!(body["applied"]["after"], 90_000);
    assert_eq!(body["audit"]["status"], "abandoned");
    assert_eq!(body["audit"]["attempts"], 4);
    assert_eq!(
        store.business("biz-subsidy").expect("business").costs[0].amount,
        90_000
    );
}

#[tokio::test]
async fn cost_route_rejects_duplicate_add() {
    let (router, _) = router_with(duplicated_store(), 0);

    let response = router
        .oneshot(json_post(
            "/api/v1/businesses/biz-subsidy/costs",
            json!({
                "change": { "action": "add", "kind": "operating-cost", "amount": 1 },
                "author": "Lee"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}
