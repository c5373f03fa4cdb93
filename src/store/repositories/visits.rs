use log::info;
use serde_json::Value;

use crate::store::{
    helpers::{read_json, write_json},
    models::{NewVisit, Visit},
    Storage, StoreError,
};

impl Storage {
    /// Persist a new visit and return it with its generated id.
    pub async fn create_visit(&self, payload: NewVisit) -> Result<Visit, StoreError> {
        let visit = Visit::create(payload);
        let path = self.visit_path(&visit.id)?;
        write_json(&path, &visit).await?;
        info!("Created visit {}", visit.id);
        Ok(visit)
    }

    pub async fn get_visit(&self, id: &str) -> Result<Option<Visit>, StoreError> {
        let path = self.visit_path(id)?;
        read_json(&path).await
    }

    /// Replace the exercise list. An unknown id gets a fresh default record.
    pub async fn update_exercises(&self, id: &str, exercises: Vec<Value>) -> Result<Visit, StoreError> {
        let path = self.visit_path(id)?;
        let mut visit = match read_json::<Visit>(&path).await? {
            Some(visit) => visit,
            None => Visit::placeholder(id),
        };
        visit.exercises = exercises;
        write_json(&path, &visit).await?;
        Ok(visit)
    }
}
