//! Serverless-style front-end: one endpoint per function, the visit id in
//! `?id=`, and explicit method checks instead of method routing.
//!
//! Mounted under `/functions`. Every operation delegates to the same core
//! calls as the REST front-end.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::Method,
    response::Response,
    routing::any,
    Router,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::http;
use crate::store::NewVisit;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/camera_start", any(camera_start))
        .route("/camera_stop", any(camera_stop))
        .route("/camera_status", any(camera_status))
        .route("/visits_create", any(visits_create))
        .route("/visits_get", any(visits_get))
        .route("/visits_update_exercises", any(visits_update_exercises))
        .route("/visits_finalize", any(visits_finalize))
        .route("/results_get", any(results_get))
        .route("/results_mesh", any(results_mesh))
        .route("/backend_status", any(backend_status))
}

fn require_method(method: &Method, expected: Method) -> ApiResult<()> {
    if *method != expected {
        return Err(ApiError::MethodNotAllowed);
    }
    Ok(())
}

fn require_id(query: IdQuery) -> ApiResult<String> {
    query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing id".into()))
}

/// Unparseable or absent bodies read as the default value.
fn lenient_body<T: DeserializeOwned + Default>(body: &Bytes) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

async fn camera_start(method: Method, State(state): State<AppState>) -> ApiResult<Response> {
    require_method(&method, Method::POST)?;
    Ok(http::camera::start(&state).await)
}

async fn camera_stop(method: Method, State(state): State<AppState>) -> ApiResult<Response> {
    require_method(&method, Method::POST)?;
    Ok(http::camera::stop(&state).await)
}

async fn camera_status(State(state): State<AppState>) -> Response {
    http::camera::status(&state)
}

async fn visits_create(
    method: Method,
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Response> {
    require_method(&method, Method::POST)?;
    let payload: Value = lenient_body(&body);
    http::visits::create(&state, NewVisit::from_lenient(&payload)).await
}

async fn visits_get(State(state): State<AppState>, Query(query): Query<IdQuery>) -> ApiResult<Response> {
    let id = require_id(query)?;
    http::visits::get(&state, &id).await
}

async fn visits_update_exercises(
    method: Method,
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
    body: Bytes,
) -> ApiResult<Response> {
    require_method(&method, Method::PUT)?;
    let id = require_id(query)?;
    http::visits::update_exercises(&state, &id, lenient_body(&body)).await
}

async fn visits_finalize(
    method: Method,
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Response> {
    require_method(&method, Method::POST)?;
    let id = require_id(query)?;
    http::visits::finalize(&state, &id).await
}

async fn results_get(State(state): State<AppState>, Query(query): Query<IdQuery>) -> ApiResult<Response> {
    let id = require_id(query)?;
    http::results::get(&state, &id).await
}

async fn results_mesh(State(state): State<AppState>, Query(query): Query<IdQuery>) -> ApiResult<Response> {
    let id = require_id(query)?;
    http::results::mesh(&state, &id).await
}

async fn backend_status(State(state): State<AppState>) -> Response {
    http::status::status(&state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_counts_as_missing() {
        let err = require_id(IdQuery { id: Some(String::new()) }).unwrap_err();
        assert_eq!(err.to_string(), "Missing id");
        assert_eq!(require_id(IdQuery { id: Some("v1".into()) }).unwrap(), "v1");
    }

    #[test]
    fn method_mismatch_is_rejected() {
        assert!(require_method(&Method::GET, Method::POST).is_err());
        assert!(require_method(&Method::PUT, Method::PUT).is_ok());
    }

    #[test]
    fn lenient_body_swallows_garbage() {
        let exercises: Vec<Value> = lenient_body(&Bytes::from_static(b"not json"));
        assert!(exercises.is_empty());
    }
}
