use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::pose::{AnalysisResult, PoseEstimator};
use crate::settings::CameraSettings;

use super::frame::Frame;
use super::loop_worker::{device_loop, stub_loop, LatestFrame};
use super::source::{default_opener, device_support, DeviceOpener, OpenError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraBackend {
    Device,
    Stub,
}

/// How `start()` resolved. Every variant is a success for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    /// A device backend exists but opening it failed.
    StubFallback { reason: String },
    /// No device backend in this build.
    StubMode,
}

impl StartOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            StartOutcome::Started => "Camera started",
            StartOutcome::AlreadyRunning => "Camera already running",
            StartOutcome::StubFallback { .. } => "Camera fallback to stub (no device)",
            StartOutcome::StubMode => "Camera started in stub mode",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    AlreadyStopped,
}

impl StopOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            StopOutcome::Stopped => "Camera stopped",
            StopOutcome::AlreadyStopped => "Camera already stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraStatus {
    pub streaming: bool,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub backend: CameraBackend,
}

enum Worker {
    Task(JoinHandle<()>),
    Thread(thread::JoinHandle<()>),
}

struct Acquisition {
    worker: Worker,
    cancel_token: CancellationToken,
}

struct Inner {
    settings: CameraSettings,
    opener: DeviceOpener,
    estimator: Option<Mutex<Box<dyn PoseEstimator>>>,
    latest: LatestFrame,
    streaming: AtomicBool,
    backend: Mutex<CameraBackend>,
    // Serializes start/stop; holds the running loop, if any.
    acquisition: tokio::sync::Mutex<Option<Acquisition>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(acquisition) = self.acquisition.get_mut().take() {
            acquisition.cancel_token.cancel();
        }
    }
}

/// Owns the frame source lifecycle and composes estimation + analysis.
///
/// Cheap to clone; all clones share one acquisition loop.
#[derive(Clone)]
pub struct CameraManager {
    inner: Arc<Inner>,
}

impl CameraManager {
    pub fn new(settings: CameraSettings, estimator: Option<Box<dyn PoseEstimator>>) -> Self {
        Self::with_opener(settings, estimator, default_opener())
    }

    pub fn with_opener(
        settings: CameraSettings,
        estimator: Option<Box<dyn PoseEstimator>>,
        opener: DeviceOpener,
    ) -> Self {
        let backend = if device_support() {
            CameraBackend::Device
        } else {
            CameraBackend::Stub
        };
        Self {
            inner: Arc::new(Inner {
                settings,
                opener,
                estimator: estimator.map(Mutex::new),
                latest: LatestFrame::default(),
                streaming: AtomicBool::new(false),
                backend: Mutex::new(backend),
                acquisition: tokio::sync::Mutex::new(None),
            }),
        }
    }

    pub async fn start(&self) -> StartOutcome {
        let mut slot = self.inner.acquisition.lock().await;
        if slot.is_some() {
            return StartOutcome::AlreadyRunning;
        }

        let cancel_token = CancellationToken::new();
        let (worker, backend, outcome) = match self.spawn_device(cancel_token.clone()).await {
            Ok(handle) => (Worker::Thread(handle), CameraBackend::Device, StartOutcome::Started),
            Err(err) => {
                let outcome = match err {
                    OpenError::Unsupported => StartOutcome::StubMode,
                    OpenError::Failed(reason) => {
                        warn!("Camera open failed, using stub stream: {reason:#}");
                        StartOutcome::StubFallback {
                            reason: format!("{reason:#}"),
                        }
                    }
                };
                let handle = tokio::spawn(stub_loop(
                    self.inner.settings.clone(),
                    self.inner.latest.clone(),
                    cancel_token.clone(),
                ));
                (Worker::Task(handle), CameraBackend::Stub, outcome)
            }
        };

        *slot = Some(Acquisition {
            worker,
            cancel_token,
        });
        *self.inner.backend.lock().unwrap_or_else(PoisonError::into_inner) = backend;
        self.inner.streaming.store(true, Ordering::SeqCst);

        info!("{}", outcome.message());
        outcome
    }

    /// Opens the device on a dedicated thread and waits for it to report in.
    async fn spawn_device(
        &self,
        cancel_token: CancellationToken,
    ) -> Result<thread::JoinHandle<()>, OpenError> {
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), OpenError>>();
        let opener = self.inner.opener.clone();
        let settings = self.inner.settings.clone();
        let latest = self.inner.latest.clone();

        let handle = thread::Builder::new()
            .name("camera-acquisition".into())
            .spawn(move || match opener(&settings) {
                Ok(source) => {
                    let _ = ready_tx.send(Ok(()));
                    device_loop(source, settings, latest, cancel_token);
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("failed to spawn camera thread")
            .map_err(OpenError::Failed)?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(handle),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(OpenError::Failed(anyhow!(
                "camera thread exited before reporting readiness"
            ))),
        }
    }

    pub async fn stop(&self) -> StopOutcome {
        let mut slot = self.inner.acquisition.lock().await;
        let Some(acquisition) = slot.take() else {
            return StopOutcome::AlreadyStopped;
        };

        acquisition.cancel_token.cancel();
        match acquisition.worker {
            Worker::Task(handle) => {
                if let Err(err) = handle.await {
                    warn!("Stub acquisition task failed to join: {err}");
                }
            }
            Worker::Thread(handle) => match tokio::task::spawn_blocking(move || handle.join()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => warn!("Camera thread panicked"),
                Err(err) => warn!("Failed to join camera thread: {err}"),
            },
        }

        self.inner.streaming.store(false, Ordering::SeqCst);
        info!("Camera stopped");
        StopOutcome::Stopped
    }

    pub fn status(&self) -> CameraStatus {
        let settings = &self.inner.settings;
        CameraStatus {
            streaming: self.is_streaming(),
            width: settings.width,
            height: settings.height,
            fps: settings.fps,
            backend: *self.inner.backend.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.inner.streaming.load(Ordering::SeqCst)
    }

    /// Latest produced frame, if any. Never waits.
    pub fn get_frame(&self) -> Option<Arc<Frame>> {
        self.inner
            .latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn pose_available(&self) -> bool {
        self.inner.estimator.is_some()
    }

    /// Runs estimation on the latest frame. Never fails: any problem yields
    /// the fallback analysis.
    pub fn analyze(&self) -> AnalysisResult {
        match self.try_analyze() {
            Ok(Some(result)) => result,
            Ok(None) => AnalysisResult::fallback(),
            Err(err) => {
                warn!("Pose analysis failed, using fallback: {err:#}");
                AnalysisResult::fallback()
            }
        }
    }

    /// `analyze()` off the async executor; inference is CPU-bound.
    pub async fn analyze_async(&self) -> AnalysisResult {
        let manager = self.clone();
        match tokio::task::spawn_blocking(move || manager.analyze()).await {
            Ok(result) => result,
            Err(err) => {
                warn!("Pose analysis task failed, using fallback: {err}");
                AnalysisResult::fallback()
            }
        }
    }

    fn try_analyze(&self) -> Result<Option<AnalysisResult>> {
        let Some(estimator) = &self.inner.estimator else {
            return Ok(None);
        };
        let Some(frame) = self.get_frame() else {
            return Ok(None);
        };

        let mut estimator = estimator
            .lock()
            .map_err(|_| anyhow!("pose estimator lock poisoned"))?;
        let (keypoints, quality) = estimator
            .process(&frame)
            .with_context(|| format!("{} failed on latest frame", estimator.name()))?;
        Ok(Some(AnalysisResult::estimated(keypoints, quality)))
    }
}
