use axum::{
    body::Bytes,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::error::{json_body, json_or_default, ApiError, ApiResponse, ApiResult};
use crate::results::finalize_visit;
use crate::store::NewVisit;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct VisitRef {
    pub visit_id: String,
}

pub(crate) async fn create(state: &AppState, payload: NewVisit) -> ApiResult<Response> {
    let visit = state.storage.create_visit(payload).await?;
    Ok(ApiResponse::ok(VisitRef { visit_id: visit.id }).into_response())
}

pub(crate) async fn get(state: &AppState, id: &str) -> ApiResult<Response> {
    match state.storage.get_visit(id).await? {
        Some(visit) => Ok(ApiResponse::ok(visit).into_response()),
        None => Err(ApiError::NotFound("Visit not found")),
    }
}

pub(crate) async fn update_exercises(
    state: &AppState,
    id: &str,
    exercises: Vec<Value>,
) -> ApiResult<Response> {
    state.storage.update_exercises(id, exercises).await?;
    Ok(ApiResponse::success().into_response())
}

pub(crate) async fn finalize(state: &AppState, id: &str) -> ApiResult<Response> {
    let result = finalize_visit(&state.camera, &state.fitter, &state.storage, id).await?;
    Ok(ApiResponse::ok(VisitRef {
        visit_id: result.visit_id,
    })
    .into_response())
}

pub async fn create_handler(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    create(&state, json_or_default(&body)?).await
}

pub async fn get_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    get(&state, &id).await
}

pub async fn update_exercises_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Response> {
    update_exercises(&state, &id, json_body(&body)?).await
}

pub async fn finalize_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    finalize(&state, &id).await
}
