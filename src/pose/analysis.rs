//! Posture Analyzer: joint angles and symmetry derived from a keypoint set.
//!
//! Everything here is a pure function of its input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::keypoint::{Keypoint, KeypointSet, Landmark};

const ANGLE_EPSILON: f64 = 1e-6;

/// Joint → (proximal, joint, distal) landmarks.
const JOINTS: [(&str, [Landmark; 3]); 4] = [
    (
        "left_elbow",
        [Landmark::LeftShoulder, Landmark::LeftElbow, Landmark::LeftWrist],
    ),
    (
        "right_elbow",
        [Landmark::RightShoulder, Landmark::RightElbow, Landmark::RightWrist],
    ),
    ("left_knee", [Landmark::LeftHip, Landmark::LeftKnee, Landmark::LeftAnkle]),
    (
        "right_knee",
        [Landmark::RightHip, Landmark::RightKnee, Landmark::RightAnkle],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    /// Produced by the pose estimator on the latest frame.
    Estimated,
    /// Synthetic values; estimator absent, no frame yet, or estimation failed.
    Fallback,
}

impl AnalysisSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisSource::Estimated => "estimated",
            AnalysisSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub keypoints: KeypointSet,
    pub angles: BTreeMap<String, f64>,
    pub symmetry: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
    pub frame_quality: f64,
    pub source: AnalysisSource,
}

impl AnalysisResult {
    pub fn estimated(mut keypoints: KeypointSet, frame_quality: f64) -> Self {
        keypoints.retain(|_, kp| kp.is_finite());
        Self {
            angles: derive_angles(&keypoints),
            symmetry: derive_symmetry(&keypoints),
            keypoints,
            timestamp: Utc::now(),
            frame_quality: unit_or_zero(frame_quality),
            source: AnalysisSource::Estimated,
        }
    }

    /// Fixed upright stance returned whenever real estimation is unavailable.
    pub fn fallback() -> Self {
        let mut keypoints = KeypointSet::new();
        keypoints.insert(Landmark::Nose, Keypoint::new(0.5, 0.2, 0.0, 0.9));
        keypoints.insert(Landmark::LeftShoulder, Keypoint::new(0.4, 0.35, 0.0, 0.9));
        keypoints.insert(Landmark::RightShoulder, Keypoint::new(0.6, 0.35, 0.0, 0.9));

        let tilt = (keypoints[&Landmark::RightShoulder].y - keypoints[&Landmark::LeftShoulder].y)
            * 10.0;

        Self {
            keypoints,
            angles: BTreeMap::from([("shoulder_tilt".to_string(), tilt)]),
            symmetry: BTreeMap::from([("shoulders".to_string(), 1.0)]),
            timestamp: Utc::now(),
            frame_quality: 0.95,
            source: AnalysisSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == AnalysisSource::Fallback
    }
}

/// Clamp into [0, 1]; NaN maps to 0.
fn unit_or_zero(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Landmark lookup that treats non-finite coordinates as missing.
fn finite_landmark(keypoints: &KeypointSet, landmark: Landmark) -> Option<&Keypoint> {
    keypoints.get(&landmark).filter(|kp| kp.is_finite())
}

/// Interior angle in degrees at `b`, in 2D image space.
///
/// Returns 0.0 when any of the three landmarks is missing or not finite.
pub fn joint_angle(keypoints: &KeypointSet, a: Landmark, b: Landmark, c: Landmark) -> f64 {
    let (Some(a), Some(b), Some(c)) = (
        finite_landmark(keypoints, a),
        finite_landmark(keypoints, b),
        finite_landmark(keypoints, c),
    ) else {
        return 0.0;
    };

    let ba = (a.x - b.x, a.y - b.y);
    let bc = (c.x - b.x, c.y - b.y);
    let dot = ba.0 * bc.0 + ba.1 * bc.1;
    let norms = ba.0.hypot(ba.1) * bc.0.hypot(bc.1) + ANGLE_EPSILON;
    let angle = (dot / norms).clamp(-1.0, 1.0).acos().to_degrees();
    if angle.is_finite() {
        angle
    } else {
        0.0
    }
}

pub fn derive_angles(keypoints: &KeypointSet) -> BTreeMap<String, f64> {
    JOINTS
        .iter()
        .map(|(name, [a, b, c])| (name.to_string(), joint_angle(keypoints, *a, *b, *c)))
        .collect()
}

pub fn derive_symmetry(keypoints: &KeypointSet) -> BTreeMap<String, f64> {
    let shoulders = match (
        finite_landmark(keypoints, Landmark::LeftShoulder),
        finite_landmark(keypoints, Landmark::RightShoulder),
    ) {
        (Some(left), Some(right)) => 1.0 - (left.y - right.y).abs(),
        _ => 0.0,
    };
    BTreeMap::from([("shoulders".to_string(), unit_or_zero(shoulders))])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, y: f64) -> Keypoint {
        Keypoint::new(x, y, 0.0, 1.0)
    }

    fn arm(shoulder: (f64, f64), elbow: (f64, f64), wrist: (f64, f64)) -> KeypointSet {
        KeypointSet::from([
            (Landmark::LeftShoulder, point(shoulder.0, shoulder.1)),
            (Landmark::LeftElbow, point(elbow.0, elbow.1)),
            (Landmark::LeftWrist, point(wrist.0, wrist.1)),
        ])
    }

    #[test]
    fn right_angle_at_elbow() {
        let set = arm((0.5, 0.2), (0.5, 0.5), (0.8, 0.5));
        let angle = derive_angles(&set)["left_elbow"];
        assert!((angle - 90.0).abs() < 1e-3, "got {angle}");
    }

    #[test]
    fn straight_limb_is_180() {
        let set = arm((0.2, 0.5), (0.5, 0.5), (0.8, 0.5));
        let angle = derive_angles(&set)["left_elbow"];
        assert!((angle - 180.0).abs() < 1e-3, "got {angle}");
    }

    #[test]
    fn missing_landmark_yields_exact_zero() {
        let set = arm((0.5, 0.2), (0.5, 0.5), (0.8, 0.5));
        let angles = derive_angles(&set);

        assert_eq!(angles.len(), 4);
        assert_eq!(angles["right_elbow"], 0.0);
        assert_eq!(angles["left_knee"], 0.0);
        assert_eq!(angles["right_knee"], 0.0);
    }

    #[test]
    fn coincident_points_stay_in_range() {
        let set = arm((0.5, 0.5), (0.5, 0.5), (0.5, 0.5));
        let angle = derive_angles(&set)["left_elbow"];
        assert!(angle.is_finite());
        assert!((0.0..=180.0).contains(&angle));
    }

    #[test]
    fn symmetry_is_clamped() {
        let set = KeypointSet::from([
            (Landmark::LeftShoulder, point(0.4, -3.0)),
            (Landmark::RightShoulder, point(0.6, 2.5)),
        ]);
        assert_eq!(derive_symmetry(&set)["shoulders"], 0.0);

        let level = KeypointSet::from([
            (Landmark::LeftShoulder, point(0.4, 0.3)),
            (Landmark::RightShoulder, point(0.6, 0.3)),
        ]);
        assert_eq!(derive_symmetry(&level)["shoulders"], 1.0);
    }

    #[test]
    fn symmetry_without_shoulders_is_zero() {
        let set = KeypointSet::from([(Landmark::LeftShoulder, point(0.4, 0.3))]);
        assert_eq!(derive_symmetry(&set)["shoulders"], 0.0);
    }

    #[test]
    fn non_finite_coordinates_count_as_missing() {
        let set = KeypointSet::from([
            (Landmark::LeftShoulder, point(0.4, f64::NAN)),
            (Landmark::RightShoulder, point(0.6, 0.3)),
            (Landmark::LeftElbow, point(f64::INFINITY, 0.5)),
            (Landmark::LeftWrist, point(0.8, 0.5)),
        ]);
        assert_eq!(derive_symmetry(&set)["shoulders"], 0.0);
        assert_eq!(derive_angles(&set)["left_elbow"], 0.0);

        let huge = arm((f64::MAX, 0.2), (-f64::MAX, 0.5), (0.8, 0.5));
        let angle = derive_angles(&huge)["left_elbow"];
        assert!(angle.is_finite(), "got {angle}");
    }

    #[test]
    fn nan_quality_is_zero_and_result_stays_serializable() {
        let set = KeypointSet::from([
            (Landmark::LeftShoulder, point(0.4, f64::NAN)),
            (Landmark::RightShoulder, point(0.6, 0.3)),
        ]);
        let result = AnalysisResult::estimated(set, f64::NAN);
        assert_eq!(result.frame_quality, 0.0);
        assert_eq!(AnalysisResult::estimated(KeypointSet::new(), f64::INFINITY).frame_quality, 1.0);

        assert!(!result.keypoints.contains_key(&Landmark::LeftShoulder));

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["symmetry"]["shoulders"].is_number());
        assert!(json["angles"].as_object().unwrap().values().all(|v| v.is_number()));
    }

    #[test]
    fn fallback_is_well_formed() {
        let result = AnalysisResult::fallback();
        assert!(result.is_fallback());
        assert_eq!(result.keypoints.len(), 3);
        assert_eq!(result.angles["shoulder_tilt"], 0.0);
        assert_eq!(result.symmetry["shoulders"], 1.0);
        assert_eq!(result.frame_quality, 0.95);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["source"], "fallback");
        assert!(json["keypoints"]["nose"].is_object());
    }

    #[test]
    fn estimated_result_derives_metrics() {
        let result = AnalysisResult::estimated(arm((0.5, 0.2), (0.5, 0.5), (0.8, 0.5)), 1.0);
        assert_eq!(result.source, AnalysisSource::Estimated);
        assert!((result.angles["left_elbow"] - 90.0).abs() < 1e-3);
        assert_eq!(result.symmetry["shoulders"], 0.0);
    }
}
