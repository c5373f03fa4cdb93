use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf, str::FromStr, time::Duration};

const CONFIG_ENV: &str = "PHYSIOPLUS_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraSettings {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            fps: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub bind_addr: String,
    /// Root for `visits/` and `results/`.
    pub data_dir: PathBuf,
    pub camera: CameraSettings,
    pub stream_interval_ms: u64,
    pub pose_model_path: PathBuf,
    pub smpl_model_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".into(),
            data_dir: PathBuf::from("data"),
            camera: CameraSettings::default(),
            stream_interval_ms: 100,
            pose_model_path: PathBuf::from("models").join("pose_landmark_full.onnx"),
            smpl_model_dir: PathBuf::from("models"),
        }
    }
}

impl Settings {
    /// Reads the optional JSON file named by `PHYSIOPLUS_CONFIG`, then applies
    /// environment overrides on top.
    pub fn load() -> Result<Self> {
        let mut settings = match env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };
        settings.apply_env();
        settings.smpl_model_dir = absolutize(settings.smpl_model_dir);
        Ok(settings)
    }

    pub fn from_file(path: PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms.max(1))
    }

    fn apply_env(&mut self) {
        if let Ok(value) = env::var("PHYSIOPLUS_BIND") {
            self.bind_addr = value;
        }
        if let Some(value) = env::var_os("PHYSIOPLUS_DATA_DIR") {
            self.data_dir = PathBuf::from(value);
        }
        if let Some(value) = env::var_os("POSE_MODEL_PATH") {
            self.pose_model_path = PathBuf::from(value);
        }
        if let Some(value) = env::var_os("SMPL_MODEL_DIR") {
            self.smpl_model_dir = PathBuf::from(value);
        }

        override_parsed("PHYSIOPLUS_CAMERA_INDEX", &mut self.camera.index);
        override_parsed("PHYSIOPLUS_CAMERA_WIDTH", &mut self.camera.width);
        override_parsed("PHYSIOPLUS_CAMERA_HEIGHT", &mut self.camera.height);
        override_parsed("PHYSIOPLUS_CAMERA_FPS", &mut self.camera.fps);
        override_parsed("PHYSIOPLUS_STREAM_INTERVAL_MS", &mut self.stream_interval_ms);
    }
}

/// `PHYSIOPLUS_DEBUG=1|true` raises the default log level to debug.
pub fn debug_enabled() -> bool {
    env::var("PHYSIOPLUS_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn override_parsed<T: FromStr>(key: &str, slot: &mut T) {
    let Ok(raw) = env::var(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => warn!("Ignoring {key}={raw:?}: not a valid number"),
    }
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    env::current_dir()
        .map(|cwd| cwd.join(&path))
        .unwrap_or(path)
}
