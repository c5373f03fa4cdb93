pub mod analysis;
pub mod estimator;
pub mod keypoint;

pub use analysis::{AnalysisResult, AnalysisSource};
pub use estimator::{load_estimator, EstimatorUnavailable, PoseEstimator};
pub use keypoint::{Keypoint, KeypointSet, Landmark};
