use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::settings::CameraSettings;

use super::frame::{Frame, READ_FAILURE_COLOR};
use super::source::FrameSource;

// Set to false to silence per-frame diagnostics from this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Latest published frame. Writers swap the whole `Arc`, readers clone it.
pub type LatestFrame = Arc<RwLock<Option<Arc<Frame>>>>;

pub fn frame_period(fps: u32) -> Duration {
    Duration::from_millis(1000 / u64::from(fps.max(1)))
}

pub fn publish(latest: &LatestFrame, frame: Frame) {
    let mut guard = latest.write().unwrap_or_else(PoisonError::into_inner);
    *guard = Some(Arc::new(frame));
}

/// Stub acquisition: republish the placeholder frame at the configured rate.
pub async fn stub_loop(settings: CameraSettings, latest: LatestFrame, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(frame_period(settings.fps));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let template = Frame::stub(settings.width, settings.height);
    log_info!(
        "stub acquisition loop started ({}x{} @ {} fps)",
        settings.width,
        settings.height,
        settings.fps
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                publish(&latest, Frame::new(template.image.clone()));
            }
            _ = cancel_token.cancelled() => {
                log_info!("stub acquisition loop shutting down");
                break;
            }
        }
    }
}

/// Device acquisition. Runs on its own thread because device reads block.
///
/// A failed read publishes a solid white frame instead, so readers always see
/// something recent. The source is dropped (device released) on exit.
pub fn device_loop(
    mut source: Box<dyn FrameSource>,
    settings: CameraSettings,
    latest: LatestFrame,
    cancel_token: CancellationToken,
) {
    let period = frame_period(settings.fps);
    let mut failed_reads: u64 = 0;

    log_info!("device acquisition loop started");

    while !cancel_token.is_cancelled() {
        let started = Instant::now();

        let frame = match source.read_frame() {
            Ok(frame) => {
                if failed_reads > 0 {
                    log_info!("camera recovered after {failed_reads} failed reads");
                    failed_reads = 0;
                }
                frame
            }
            Err(err) => {
                if failed_reads == 0 {
                    log_warn!("camera read failed, publishing placeholder: {err:#}");
                } else {
                    log_debug!("camera read failed again ({failed_reads}): {err:#}");
                }
                failed_reads += 1;
                Frame::solid(settings.width, settings.height, READ_FAILURE_COLOR)
            }
        };
        publish(&latest, frame);

        if let Some(remaining) = period.checked_sub(started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    drop(source);
    log_info!("device acquisition loop shutting down");
}
