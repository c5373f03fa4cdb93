use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::pose::KeypointSet;

use super::obj::{to_obj, CUBE_OBJ};

pub const BETAS_LEN: usize = 10;
/// Global orientation (3) followed by 23 body joints in axis-angle form.
pub const POSE_LEN: usize = 72;

const TEMPLATE_FILE: &str = "SMPL_NEUTRAL.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmplParams {
    pub betas: Vec<f64>,
    pub pose: Vec<f64>,
    pub transl: Vec<f64>,
}

impl SmplParams {
    pub fn neutral() -> Self {
        Self {
            betas: vec![0.0; BETAS_LEN],
            pose: vec![0.0; POSE_LEN],
            transl: vec![0.0; 3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitOutcome {
    Fitted,
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct MeshFit {
    pub params: SmplParams,
    pub mesh: String,
    pub outcome: FitOutcome,
}

impl MeshFit {
    pub fn placeholder() -> Self {
        Self {
            params: SmplParams::neutral(),
            mesh: CUBE_OBJ.to_string(),
            outcome: FitOutcome::Placeholder,
        }
    }
}

#[derive(Deserialize)]
struct BodyTemplate {
    v_template: Vec<[f32; 3]>,
    f: Vec<[u32; 3]>,
}

/// Produces body-model parameters and a mesh from 2D keypoints.
///
/// Availability is probed once: the model directory must exist.
pub struct MeshFitter {
    model_dir: PathBuf,
    available: bool,
}

impl MeshFitter {
    pub fn new(model_dir: PathBuf) -> Self {
        let available = model_dir.is_dir();
        if available {
            info!("Body model directory found at {}", model_dir.display());
        } else {
            info!(
                "Body model directory {} missing, finalize will emit placeholder meshes",
                model_dir.display()
            );
        }
        Self {
            model_dir,
            available,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Never fails; any problem yields the neutral placeholder.
    pub fn fit(&self, keypoints: &KeypointSet) -> MeshFit {
        if !self.available {
            return MeshFit::placeholder();
        }
        match self.fit_neutral(keypoints) {
            Ok(fit) => fit,
            Err(err) => {
                warn!("Mesh fitting failed, using placeholder: {err:#}");
                MeshFit::placeholder()
            }
        }
    }

    // TODO: optimise body_pose against the 2D keypoints instead of emitting the rest pose.
    fn fit_neutral(&self, _keypoints: &KeypointSet) -> Result<MeshFit> {
        let path = self.template_path()?;
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read body template {}", path.display()))?;
        let template: BodyTemplate = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse body template {}", path.display()))?;

        let vertex_count = template.v_template.len() as u32;
        if let Some(face) = template.f.iter().find(|f| f.iter().any(|&i| i >= vertex_count)) {
            bail!("face {face:?} references a vertex beyond {vertex_count}");
        }

        Ok(MeshFit {
            params: SmplParams::neutral(),
            mesh: to_obj(&template.v_template, &template.f),
            outcome: FitOutcome::Fitted,
        })
    }

    fn template_path(&self) -> Result<PathBuf> {
        [
            self.model_dir.join("smpl").join(TEMPLATE_FILE),
            self.model_dir.join(TEMPLATE_FILE),
        ]
        .into_iter()
        .find(|candidate| candidate.is_file())
        .with_context(|| format!("no {TEMPLATE_FILE} under {}", self.model_dir.display()))
    }
}
