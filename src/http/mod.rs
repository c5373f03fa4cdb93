//! Long-running server front-end: REST under `/api` plus the pose WebSocket.

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::AppState;

pub mod camera;
pub mod results;
pub mod status;
pub mod visits;
pub mod ws;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/camera/start", post(camera::start_handler))
        .route("/api/camera/stop", post(camera::stop_handler))
        .route("/api/camera/status", get(camera::status_handler))
        .route("/api/visits", post(visits::create_handler))
        .route("/api/visits/:id", get(visits::get_handler))
        .route("/api/visits/:id/exercises", put(visits::update_exercises_handler))
        .route("/api/visits/:id/finalize", post(visits::finalize_handler))
        .route("/api/results/:id", get(results::get_handler))
        .route("/api/results/:id/mesh.obj", get(results::mesh_handler))
        .route("/api/status", get(status::status_handler))
        .route("/ws/pose-stream/:visit_id", get(ws::pose_stream_handler))
}
