use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

use crate::error::ApiResponse;
use crate::status::backend_status;
use crate::AppState;

pub(crate) fn status(state: &AppState) -> Response {
    ApiResponse::ok(backend_status(state)).into_response()
}

pub async fn status_handler(State(state): State<AppState>) -> Response {
    status(&state)
}
