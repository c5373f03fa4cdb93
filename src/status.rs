use std::path::PathBuf;

use serde::Serialize;

use crate::camera::CameraStatus;
use crate::AppState;

pub const POSE_STREAM_ENDPOINT: &str = "/ws/pose-stream/{visit_id}";

#[derive(Debug, Clone, Serialize)]
pub struct WsEndpoints {
    pub pose_stream: &'static str,
}

/// Aggregated capability and camera snapshot for `GET /api/status`.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub version: &'static str,
    pub pose_available: bool,
    pub smpl_available: bool,
    pub smpl_model_dir: PathBuf,
    pub camera: CameraStatus,
    pub ws_endpoints: WsEndpoints,
}

pub fn backend_status(state: &AppState) -> BackendStatus {
    BackendStatus {
        version: env!("CARGO_PKG_VERSION"),
        pose_available: state.camera.pose_available(),
        smpl_available: state.fitter.is_available(),
        smpl_model_dir: state.fitter.model_dir().to_path_buf(),
        camera: state.camera.status(),
        ws_endpoints: WsEndpoints {
            pose_stream: POSE_STREAM_ENDPOINT,
        },
    }
}
