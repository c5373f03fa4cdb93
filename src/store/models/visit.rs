use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const DEFAULT_ANALYSIS_TYPE: &str = "completa";

/// One clinical session record, stored as `visits/<id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: String,
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub operator_id: String,
    #[serde(default = "default_analysis_type")]
    pub tipo_analisi: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub note: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub exercises: Vec<Value>,
    /// Fields written by other tools are carried through rewrites untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Create payload; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewVisit {
    pub patient_id: Option<String>,
    pub operator_id: Option<String>,
    pub tipo_analisi: Option<String>,
    pub note: Option<String>,
}

impl NewVisit {
    /// Field-by-field read of an arbitrary JSON body. Scalars are kept as
    /// their text form; anything else leaves that one field unset.
    pub fn from_lenient(body: &Value) -> Self {
        let field = |name: &str| match body.get(name)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        };
        Self {
            patient_id: field("patient_id"),
            operator_id: field("operator_id"),
            tipo_analisi: field("tipo_analisi"),
            note: field("note"),
        }
    }
}

fn default_analysis_type() -> String {
    DEFAULT_ANALYSIS_TYPE.to_string()
}

fn default_status() -> String {
    STATUS_IN_PROGRESS.to_string()
}

impl Visit {
    pub fn create(payload: NewVisit) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            patient_id: payload.patient_id.unwrap_or_default(),
            operator_id: payload.operator_id.unwrap_or_default(),
            tipo_analisi: payload.tipo_analisi.unwrap_or_else(default_analysis_type),
            status: default_status(),
            note: payload.note.unwrap_or_default(),
            created_at: Utc::now(),
            exercises: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Record materialized when exercises arrive for an id that was never created.
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::create(NewVisit::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_applies_defaults() {
        let visit = Visit::create(NewVisit {
            patient_id: Some("p-1".into()),
            ..NewVisit::default()
        });
        assert_eq!(visit.patient_id, "p-1");
        assert_eq!(visit.operator_id, "");
        assert_eq!(visit.tipo_analisi, "completa");
        assert_eq!(visit.status, "in_progress");
        assert!(visit.exercises.is_empty());
        assert!(Uuid::parse_str(&visit.id).is_ok());
    }

    #[test]
    fn lenient_payload_keeps_usable_fields() {
        let payload = NewVisit::from_lenient(&serde_json::json!({
            "patient_id": 42,
            "operator_id": "op-1",
            "tipo_analisi": ["not", "a", "string"],
            "note": "keep me"
        }));
        assert_eq!(payload.patient_id.as_deref(), Some("42"));
        assert_eq!(payload.operator_id.as_deref(), Some("op-1"));
        assert_eq!(payload.tipo_analisi, None);
        assert_eq!(payload.note.as_deref(), Some("keep me"));

        let visit = Visit::create(payload);
        assert_eq!(visit.tipo_analisi, "completa");

        let empty = NewVisit::from_lenient(&Value::String("garbage".into()));
        assert!(empty.patient_id.is_none() && empty.note.is_none());
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let raw = r#"{"id":"v1","created_at":"2024-05-01T10:00:00Z","room":"B2"}"#;
        let visit: Visit = serde_json::from_str(raw).unwrap();
        assert_eq!(visit.tipo_analisi, "completa");

        let json = serde_json::to_value(&visit).unwrap();
        assert_eq!(json["room"], "B2");
    }
}
