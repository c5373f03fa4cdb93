pub mod camera;
pub mod error;
pub mod functions;
pub mod http;
pub mod mesh;
pub mod pose;
pub mod results;
pub mod settings;
pub mod status;
pub mod store;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use log::{info, warn};
use tower_http::cors::CorsLayer;

use camera::CameraManager;
use mesh::MeshFitter;
use settings::Settings;
use store::Storage;

/// Process-wide services, built once at startup and shared by both front-ends.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub camera: CameraManager,
    pub storage: Storage,
    pub fitter: Arc<MeshFitter>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self> {
        let estimator = match pose::load_estimator(&settings.pose_model_path) {
            Ok(estimator) => {
                info!("Pose estimator ready ({})", estimator.name());
                Some(estimator)
            }
            Err(err) => {
                warn!("Pose estimation unavailable, using fallback analysis: {err}");
                None
            }
        };
        let camera = CameraManager::new(settings.camera.clone(), estimator);
        Self::from_parts(settings, camera)
    }

    /// Wires a caller-supplied camera manager; storage and fitter come from `settings`.
    pub fn from_parts(settings: Settings, camera: CameraManager) -> Result<Self> {
        let storage = Storage::new(&settings.data_dir)?;
        let fitter = Arc::new(MeshFitter::new(settings.smpl_model_dir.clone()));
        Ok(Self {
            settings: Arc::new(settings),
            camera,
            storage,
            fitter,
        })
    }

    pub async fn shutdown(&self) {
        let outcome = self.camera.stop().await;
        info!("Shutdown: {}", outcome.message());
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(http::routes())
        .nest("/functions", functions::routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl-C, then stops the camera.
pub async fn serve(settings: Settings) -> Result<()> {
    let bind_addr = settings.bind_addr.clone();
    let state = AppState::new(settings)?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!(
        "Listening on {}",
        listener.local_addr().context("Failed to read bound address")?
    );

    axum::serve(listener, build_router(state.clone()))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {err}");
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
        })
        .await
        .context("HTTP server failed")?;

    state.shutdown().await;
    Ok(())
}

pub fn run() -> Result<()> {
    let default_level = if settings::debug_enabled() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    log::info!("PhysioPlus backend starting up...");

    let settings = Settings::load()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("physioplus-worker")
        .enable_all()
        .build()
        .context("Failed to initialize tokio runtime")?;

    runtime.block_on(serve(settings))
}
