use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::camera::Frame;

use super::keypoint::KeypointSet;

/// Single-person 2D pose estimation over one frame.
///
/// Returns the detected landmarks (possibly empty when nobody is in view)
/// and a frame-quality score in [0, 1].
pub trait PoseEstimator: Send {
    fn name(&self) -> &'static str;
    fn process(&mut self, frame: &Frame) -> Result<(KeypointSet, f64)>;
}

#[derive(Debug, thiserror::Error)]
pub enum EstimatorUnavailable {
    #[error("pose estimation not compiled in")]
    NotCompiled,
    #[error("pose model not found at {}", .0.display())]
    ModelMissing(PathBuf),
    #[error("failed to load pose model: {0:#}")]
    LoadFailed(anyhow::Error),
}

/// Builds the estimator once at startup. Failure is non-fatal for callers:
/// analysis falls back to the synthetic stance.
pub fn load_estimator(model_path: &Path) -> Result<Box<dyn PoseEstimator>, EstimatorUnavailable> {
    #[cfg(feature = "onnx")]
    {
        if !model_path.is_file() {
            return Err(EstimatorUnavailable::ModelMissing(model_path.to_path_buf()));
        }
        onnx::OnnxPoseEstimator::new(model_path)
            .map(|estimator| Box::new(estimator) as Box<dyn PoseEstimator>)
            .map_err(EstimatorUnavailable::LoadFailed)
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = model_path;
        Err(EstimatorUnavailable::NotCompiled)
    }
}

#[cfg(feature = "onnx")]
mod onnx {
    use anyhow::{Context, Result};
    use image::imageops::FilterType;
    use ndarray::Array4;
    use ort::session::builder::GraphOptimizationLevel;
    use ort::session::Session;
    use ort::value::Tensor;
    use std::path::Path;

    use super::PoseEstimator;
    use crate::camera::Frame;
    use crate::pose::keypoint::{mean_visibility, Keypoint, KeypointSet, Landmark};

    const INPUT_SIZE: u32 = 256;
    const INPUT_NAME: &str = "input_1";
    const LANDMARKS_OUTPUT: &str = "Identity";
    const PRESENCE_OUTPUT: &str = "Identity_1";
    const VALUES_PER_LANDMARK: usize = 5;
    const PRESENCE_THRESHOLD: f32 = 0.5;

    /// BlazePose-style landmark model: 256×256 RGB in, 33 × (x, y, z, visibility, presence) out.
    pub struct OnnxPoseEstimator {
        session: Session,
    }

    impl OnnxPoseEstimator {
        pub fn new(model_path: &Path) -> Result<Self> {
            let session = Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .commit_from_file(model_path)
                .context("Failed to load ONNX model")?;
            Ok(Self { session })
        }

        fn preprocess(frame: &Frame) -> Array4<f32> {
            let resized =
                image::imageops::resize(&frame.image, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
            let side = INPUT_SIZE as usize;
            let mut input = Array4::<f32>::zeros((1, side, side, 3));
            for (x, y, pixel) in resized.enumerate_pixels() {
                for channel in 0..3 {
                    input[[0, y as usize, x as usize, channel]] = f32::from(pixel[channel]) / 255.0;
                }
            }
            input
        }
    }

    fn sigmoid(value: f32) -> f64 {
        1.0 / (1.0 + (-f64::from(value)).exp())
    }

    impl PoseEstimator for OnnxPoseEstimator {
        fn name(&self) -> &'static str {
            "onnx-blazepose"
        }

        fn process(&mut self, frame: &Frame) -> Result<(KeypointSet, f64)> {
            let input_tensor = Tensor::from_array(Self::preprocess(frame))?;
            let outputs = self
                .session
                .run(ort::inputs![INPUT_NAME => input_tensor])
                .context("Inference failed")?;

            let presence: ndarray::ArrayViewD<f32> = outputs[PRESENCE_OUTPUT]
                .try_extract_array()
                .context("Failed to extract presence tensor")?;
            let present = presence.iter().next().copied().map(sigmoid).unwrap_or(0.0);
            if present < f64::from(PRESENCE_THRESHOLD) {
                return Ok((KeypointSet::new(), 0.0));
            }

            let raw: ndarray::ArrayViewD<f32> = outputs[LANDMARKS_OUTPUT]
                .try_extract_array()
                .context("Failed to extract landmark tensor")?;
            let values: Vec<f32> = raw.iter().copied().collect();

            let scale = f64::from(INPUT_SIZE);
            let keypoints: KeypointSet = values
                .chunks_exact(VALUES_PER_LANDMARK)
                .take(Landmark::COUNT)
                .enumerate()
                .filter_map(|(index, chunk)| {
                    let landmark = Landmark::from_index(index)?;
                    let keypoint = Keypoint::new(
                        f64::from(chunk[0]) / scale,
                        f64::from(chunk[1]) / scale,
                        f64::from(chunk[2]) / scale,
                        sigmoid(chunk[3]),
                    );
                    // Non-finite outputs are treated as undetected landmarks.
                    keypoint.is_finite().then_some((landmark, keypoint))
                })
                .collect();

            let quality = mean_visibility(&keypoints);
            Ok((keypoints, quality))
        }
    }
}
