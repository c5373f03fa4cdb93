use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use crate::camera::frame::empty_frame_data_uri;
use crate::camera::CameraManager;
use crate::pose::AnalysisResult;
use crate::AppState;

// Set to false to silence per-session stream logs
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// One pushed stream message.
#[derive(Debug, Serialize)]
pub struct StreamMessage {
    /// `data:image/jpeg;base64,...`
    pub frame: String,
    pub analysis: AnalysisResult,
    pub timestamp: DateTime<Utc>,
    pub visit_id: String,
}

pub async fn pose_stream_handler(
    ws: WebSocketUpgrade,
    Path(visit_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| stream_session(socket, state, visit_id))
}

/// Encoding and inference are CPU-bound, so both happen off the executor.
pub async fn build_message(camera: &CameraManager, visit_id: &str) -> Result<StreamMessage> {
    let camera = camera.clone();
    let (frame, analysis) = tokio::task::spawn_blocking(move || -> Result<(String, AnalysisResult)> {
        let frame = match camera.get_frame() {
            Some(frame) => frame.to_data_uri()?,
            None => empty_frame_data_uri()?,
        };
        Ok((frame, camera.analyze()))
    })
    .await
    .context("stream encoding task failed")??;

    Ok(StreamMessage {
        frame,
        analysis,
        timestamp: Utc::now(),
        visit_id: visit_id.to_string(),
    })
}

async fn stream_session(mut socket: WebSocket, state: AppState, visit_id: String) {
    let mut ticker = tokio::time::interval(state.settings.stream_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sent: u64 = 0;

    log_info!("pose stream opened for visit {visit_id}");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let payload = match build_message(&state.camera, &visit_id).await {
                    Ok(message) => serde_json::to_string(&message),
                    Err(err) => {
                        log_warn!("skipping stream tick for {visit_id}: {err:#}");
                        continue;
                    }
                };
                let payload = match payload {
                    Ok(payload) => payload,
                    Err(err) => {
                        log_warn!("failed to serialize stream message: {err}");
                        continue;
                    }
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
                sent += 1;
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => log_debug!("ignoring client message on pose stream {visit_id}"),
            },
        }
    }

    log_info!("pose stream closed for visit {visit_id} after {sent} messages");
}
