use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};

use crate::camera::CameraManager;
use crate::mesh::{MeshFit, MeshFitter};
use crate::store::{
    helpers::validate_id,
    models::{Assets, FinalizedResult, Metrics},
    Storage, StoreError,
};

/// Snapshot the current analysis, fit a mesh and persist both for `visit_id`.
///
/// Runs whether or not the visit record exists. A second finalize replaces
/// the first. Only storage problems are errors.
pub async fn finalize_visit(
    camera: &CameraManager,
    fitter: &Arc<MeshFitter>,
    storage: &Storage,
    visit_id: &str,
) -> Result<FinalizedResult, StoreError> {
    validate_id(visit_id)?;

    let analysis = camera.analyze_async().await;

    let task_fitter = Arc::clone(fitter);
    let keypoints = analysis.keypoints.clone();
    let fit = match tokio::task::spawn_blocking(move || task_fitter.fit(&keypoints)).await {
        Ok(fit) => fit,
        Err(err) => {
            warn!("Mesh fitting task failed, using placeholder: {err}");
            MeshFit::placeholder()
        }
    };

    let result = FinalizedResult {
        visit_id: visit_id.to_string(),
        timestamp: Utc::now(),
        smpl_available: fitter.is_available(),
        smpl: fit.params,
        metrics: Metrics {
            angles: analysis.angles,
            symmetry: analysis.symmetry,
        },
        assets: Assets::for_visit(visit_id),
        fit: fit.outcome,
        analysis_source: analysis.source,
    };

    storage.save_result(&result, &fit.mesh).await?;
    info!(
        "Finalized visit {visit_id} (analysis: {}, mesh: {:?})",
        result.analysis_source.as_str(),
        result.fit
    );
    Ok(result)
}
