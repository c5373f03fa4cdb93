use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

use crate::error::ApiResponse;
use crate::AppState;

pub(crate) async fn start(state: &AppState) -> Response {
    let outcome = state.camera.start().await;
    ApiResponse::with_message(state.camera.status(), outcome.message()).into_response()
}

pub(crate) async fn stop(state: &AppState) -> Response {
    let outcome = state.camera.stop().await;
    ApiResponse::with_message(state.camera.status(), outcome.message()).into_response()
}

pub(crate) fn status(state: &AppState) -> Response {
    ApiResponse::ok(state.camera.status()).into_response()
}

pub async fn start_handler(State(state): State<AppState>) -> Response {
    start(&state).await
}

pub async fn stop_handler(State(state): State<AppState>) -> Response {
    stop(&state).await
}

pub async fn status_handler(State(state): State<AppState>) -> Response {
    status(&state)
}
