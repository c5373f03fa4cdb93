mod common;

use axum::http::StatusCode;
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::Message;

use common::{send, send_raw, test_router};

#[tokio::test]
async fn stream_then_finalize_records_the_streamed_metrics() {
    let (_dir, state, router) = test_router();

    let (status, created) = send(
        &router,
        "POST",
        "/api/visits",
        Some(json!({"patient_id": "p-1", "operator_id": "op-9"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let visit_id = created["data"]["visit_id"].as_str().unwrap().to_string();

    let (_, started) = send(&router, "POST", "/api/camera/start", None).await;
    assert_eq!(started["success"], true);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router.clone();
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let url = format!("ws://{addr}/ws/pose-stream/{visit_id}");
    let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    let message = timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("stream message in time")
        .unwrap()
        .unwrap();
    let Message::Text(text) = message else {
        panic!("expected a text frame, got {message:?}");
    };
    let streamed: Value = serde_json::from_str(&text).unwrap();
    socket.close(None).await.ok();

    assert!(streamed["frame"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
    assert!(streamed["analysis"]["keypoints"].is_object());
    assert!(streamed["analysis"]["angles"].is_object());
    assert!(streamed["timestamp"].is_string());
    assert_eq!(streamed["visit_id"], visit_id.as_str());

    let (status, finalized) =
        send(&router, "POST", &format!("/api/visits/{visit_id}/finalize"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finalized["data"]["visit_id"], visit_id.as_str());

    let (_, results) = send(&router, "GET", &format!("/api/results/{visit_id}"), None).await;
    assert_eq!(results["success"], true);
    let data = &results["data"];
    assert_eq!(data["metrics"]["angles"], streamed["analysis"]["angles"]);
    assert_eq!(data["metrics"]["symmetry"], streamed["analysis"]["symmetry"]);
    assert_eq!(data["smpl"]["betas"].as_array().unwrap().len(), 10);
    assert_eq!(data["smpl"]["pose"].as_array().unwrap().len(), 72);
    assert_eq!(
        data["assets"]["mesh_url"],
        format!("/api/results/{visit_id}/mesh.obj")
    );

    let (status, mesh) =
        send_raw(&router, "GET", &format!("/api/results/{visit_id}/mesh.obj"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(mesh).unwrap().starts_with("# simple cube"));

    server.abort();
    state.shutdown().await;
}

#[tokio::test]
async fn second_finalize_overwrites_first() {
    let (_dir, state, router) = test_router();

    send(&router, "POST", "/api/visits/v-7/finalize", None).await;
    let (_, first) = send(&router, "GET", "/api/results/v-7", None).await;

    tokio::time::sleep(Duration::from_millis(5)).await;
    send(&router, "POST", "/api/visits/v-7/finalize", None).await;
    let (_, second) = send(&router, "GET", "/api/results/v-7", None).await;

    assert_eq!(second["success"], true);
    assert_ne!(first["data"]["timestamp"], second["data"]["timestamp"]);

    let stored = state.storage.get_result("v-7").await.unwrap().unwrap();
    assert_eq!(json!(stored.timestamp), second["data"]["timestamp"]);
}

#[tokio::test]
async fn missing_records_report_failure() {
    let (_dir, _state, router) = test_router();

    let (status, body) = send(&router, "GET", "/api/results/never-finalized", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"success": false, "message": "Results not found"}));

    let (status, body) = send(&router, "GET", "/api/visits/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Visit not found");

    let (status, text) = send_raw(&router, "GET", "/api/results/unknown/mesh.obj", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(text, b"mesh not found");
}

#[tokio::test]
async fn camera_start_and_stop_are_idempotent() {
    let (_dir, _state, router) = test_router();

    let (_, stopped) = send(&router, "POST", "/api/camera/stop", None).await;
    assert_eq!(stopped["success"], true);
    assert_eq!(stopped["message"], "Camera already stopped");

    let (_, first) = send(&router, "POST", "/api/camera/start", None).await;
    assert_eq!(first["message"], "Camera started in stub mode");
    assert_eq!(first["data"]["backend"], "stub");

    let (_, second) = send(&router, "POST", "/api/camera/start", None).await;
    assert_eq!(second["success"], true);
    assert_eq!(second["message"], "Camera already running");

    let (_, status) = send(&router, "GET", "/api/camera/status", None).await;
    assert_eq!(
        status["data"],
        json!({"streaming": true, "width": 64, "height": 48, "fps": 50, "backend": "stub"})
    );

    let (_, stopped) = send(&router, "POST", "/api/camera/stop", None).await;
    assert_eq!(stopped["message"], "Camera stopped");
    assert_eq!(stopped["data"]["streaming"], false);
}

#[tokio::test]
async fn visit_lifecycle_over_rest() {
    let (_dir, _state, router) = test_router();

    let (_, created) = send(&router, "POST", "/api/visits", None).await;
    let visit_id = created["data"]["visit_id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &router,
        "PUT",
        &format!("/api/visits/{visit_id}/exercises"),
        Some(json!([{"name": "squat", "reps": 10}])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated, json!({"success": true}));

    let (_, visit) = send(&router, "GET", &format!("/api/visits/{visit_id}"), None).await;
    assert_eq!(visit["data"]["tipo_analisi"], "completa");
    assert_eq!(visit["data"]["status"], "in_progress");
    assert_eq!(visit["data"]["exercises"][0]["name"], "squat");

    let (status, _) = send(
        &router,
        "PUT",
        &format!("/api/visits/{visit_id}/exercises"),
        Some(json!({"not": "an array"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_reports_capabilities() {
    let (_dir, _state, router) = test_router();

    let (_, body) = send(&router, "GET", "/api/status", None).await;
    let data = &body["data"];
    assert_eq!(data["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(data["pose_available"], false);
    assert_eq!(data["smpl_available"], false);
    assert_eq!(data["camera"]["streaming"], false);
    assert_eq!(data["ws_endpoints"]["pose_stream"], "/ws/pose-stream/{visit_id}");
}

#[tokio::test]
async fn path_traversal_is_rejected() {
    let (_dir, _state, router) = test_router();

    let (status, body) = send(&router, "GET", "/api/visits/..%2Fsecret", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid id");
}
