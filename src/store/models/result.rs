use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mesh::{FitOutcome, SmplParams};
use crate::pose::AnalysisSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub angles: BTreeMap<String, f64>,
    pub symmetry: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assets {
    pub mesh_url: String,
}

impl Assets {
    pub fn for_visit(visit_id: &str) -> Self {
        Self {
            mesh_url: format!("/api/results/{visit_id}/mesh.obj"),
        }
    }
}

/// Snapshot written by finalize, stored as `results/<id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedResult {
    pub visit_id: String,
    pub timestamp: DateTime<Utc>,
    pub smpl_available: bool,
    pub smpl: SmplParams,
    pub metrics: Metrics,
    pub assets: Assets,
    pub fit: FitOutcome,
    pub analysis_source: AnalysisSource,
}
