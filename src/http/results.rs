use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::AppState;

pub(crate) async fn get(state: &AppState, id: &str) -> ApiResult<Response> {
    match state.storage.get_result(id).await? {
        Some(result) => Ok(ApiResponse::ok(result).into_response()),
        None => Err(ApiError::NotFound("Results not found")),
    }
}

/// Raw OBJ text; a plain-text 404 when nothing was finalized.
pub(crate) async fn mesh(state: &AppState, id: &str) -> ApiResult<Response> {
    let response = match state.storage.get_mesh(id).await? {
        Some(mesh) => ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], mesh).into_response(),
        None => (StatusCode::NOT_FOUND, "mesh not found").into_response(),
    };
    Ok(response)
}

pub async fn get_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    get(&state, &id).await
}

pub async fn mesh_handler(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    mesh(&state, &id).await
}
