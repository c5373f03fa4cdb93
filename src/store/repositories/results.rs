use crate::store::{
    helpers::{read_json, read_text, write_json, write_text},
    models::FinalizedResult,
    Storage, StoreError,
};

impl Storage {
    /// Write the parameter document and mesh for a visit, replacing any previous pair.
    pub async fn save_result(&self, result: &FinalizedResult, mesh: &str) -> Result<(), StoreError> {
        let params_path = self.result_path(&result.visit_id)?;
        let mesh_path = self.mesh_path(&result.visit_id)?;
        write_json(&params_path, result).await?;
        write_text(&mesh_path, mesh).await
    }

    pub async fn get_result(&self, id: &str) -> Result<Option<FinalizedResult>, StoreError> {
        let path = self.result_path(id)?;
        read_json(&path).await
    }

    pub async fn get_mesh(&self, id: &str) -> Result<Option<String>, StoreError> {
        let path = self.mesh_path(id)?;
        read_text(&path).await
    }
}
