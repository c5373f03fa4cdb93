#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use physioplus_lib::camera::{CameraManager, FrameSource, OpenError};
use physioplus_lib::settings::{CameraSettings, Settings};
use physioplus_lib::{build_router, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

fn no_device(_: &CameraSettings) -> Result<Box<dyn FrameSource>, OpenError> {
    Err(OpenError::Unsupported)
}

/// State rooted in a throwaway directory, with a camera that always runs in stub mode.
pub fn test_state() -> (TempDir, AppState) {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = Settings {
        bind_addr: "127.0.0.1:0".into(),
        data_dir: dir.path().join("data"),
        camera: CameraSettings {
            index: 0,
            width: 64,
            height: 48,
            fps: 50,
        },
        stream_interval_ms: 20,
        pose_model_path: dir.path().join("missing.onnx"),
        smpl_model_dir: dir.path().join("no-models"),
    };
    let camera = CameraManager::with_opener(settings.camera.clone(), None, Arc::new(no_device));
    let state = AppState::from_parts(settings, camera).expect("state");
    (dir, state)
}

pub fn test_router() -> (TempDir, AppState, Router) {
    let (dir, state) = test_state();
    let router = build_router(state.clone());
    (dir, state, router)
}

pub async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(router, method, uri, body).await;
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn send_raw(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .expect("request");

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, bytes.to_vec())
}
