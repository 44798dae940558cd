//! API route definitions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use super::state::AppState;
use super::{ApiError, ApiJson};
use crate::error::StoreError;
use crate::records::{TestDraft, TestPatch, TestRunDraft};
use crate::settings::Settings;

type ApiResult<T> = Result<T, ApiError>;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/tests", get(list_tests).post(create_test))
        .route(
            "/tests/{id}",
            get(get_test).patch(update_test).delete(delete_test),
        )
        .route("/test-runs", get(list_test_runs).post(create_test_run))
        .route("/stats", get(test_stats))
        .route("/settings", get(get_settings).put(put_settings))
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn list_tests(State(state): State<AppState>) -> Json<Value> {
    let tests = state.service.list_tests().await;
    let total = tests.len();
    Json(json!({ "data": tests, "meta": { "total": total } }))
}

async fn get_test(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    match state.service.get_test(&id).await {
        Some(test) => Ok(Json(json!({ "data": test }))),
        None => Err(StoreError::not_found("Test", id).into()),
    }
}

async fn create_test(
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<TestDraft>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let test = state.service.create_test(draft).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": test }))))
}

async fn update_test(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TestPatch>,
) -> ApiResult<Json<Value>> {
    let test = state.service.update_test(&id, &patch).await?;
    Ok(Json(json!({ "data": test })))
}

async fn delete_test(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let deleted = state.service.delete_test(&id).await?;
    Ok(Json(json!({ "data": { "id": id, "deleted": deleted } })))
}

#[derive(Debug, Deserialize)]
struct RunsQuery {
    #[serde(rename = "testId")]
    test_id: Option<String>,
}

async fn list_test_runs(
    State(state): State<AppState>,
    Query(query): Query<RunsQuery>,
) -> Json<Value> {
    let runs = state.service.list_test_runs(query.test_id.as_deref()).await;
    let total = runs.len();
    Json(json!({ "data": runs, "meta": { "total": total } }))
}

async fn create_test_run(
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<TestRunDraft>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let run = state.service.create_test_run(draft).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": run }))))
}

async fn test_stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "data": state.service.test_stats().await }))
}

async fn get_settings(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "data": state.settings.load() }))
}

async fn put_settings(
    State(state): State<AppState>,
    ApiJson(settings): ApiJson<Settings>,
) -> ApiResult<Json<Value>> {
    state.settings.save(&settings)?;
    Ok(Json(json!({ "data": settings })))
}
