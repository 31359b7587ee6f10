//! SurrealDB row types for the run store
//!
//! These mirror the `storage_traits` types but keep SurrealDB-specific
//! details (record ids, datetime encoding, string enums) out of the public
//! API. Conversion happens in [`crate::surreal_store`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Module for serializing optional chrono DateTime to SurrealDB datetime format
mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => {
                let sd = SurrealDatetime::from(*d);
                serde::Serialize::serialize(&Some(sd), serializer)
            }
            None => serde::Serialize::serialize(&None::<SurrealDatetime>, serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

/// Row in the `runs` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Unique run ID (UUID string)
    pub run_id: String,
    pub run_type: String,
    pub judge_model: String,
    pub worker_models: Vec<String>,
    /// SHA-256 of the model/prompt configuration
    pub config_digest: String,
    pub input_label: Option<String>,
    pub input_rows: u64,
    pub tags: serde_json::Value,
    /// "running" | "completed"
    pub status: String,
    pub total_rows: u64,
    pub success_rows: u64,
    pub error_rows: u64,
    pub duration_ms: u64,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime_opt", default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunRow {
    /// Create a new run row in "running" state
    pub fn new(run_id: String, metadata: &crate::RunMetadata) -> Self {
        RunRow {
            id: None,
            run_id,
            run_type: metadata.run_type.clone(),
            judge_model: metadata.judge_model.clone(),
            worker_models: metadata.worker_models.clone(),
            config_digest: metadata.config_digest.as_str().to_string(),
            input_label: metadata.input_label.clone(),
            input_rows: metadata.input_rows as u64,
            tags: metadata.tags.clone(),
            status: "running".to_string(),
            total_rows: 0,
            success_rows: 0,
            error_rows: 0,
            duration_ms: 0,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Row in the `run_results` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Run this row belongs to
    pub run_id: String,
    pub row_index: u64,
    /// "success" | "error"
    pub status: String,
    pub latency_secs: f64,
    pub payload: serde_json::Value,
    pub payload_digest: String,
    #[serde(with = "surreal_datetime")]
    pub recorded_at: DateTime<Utc>,
}

impl ResultRow {
    pub fn from_result(run_id: String, result: &crate::RowResult) -> Self {
        ResultRow {
            id: None,
            run_id,
            row_index: result.row_index as u64,
            status: result.status.as_str().to_string(),
            latency_secs: result.latency_secs,
            payload: result.payload.clone(),
            payload_digest: result.payload_digest.as_str().to_string(),
            recorded_at: result.recorded_at,
        }
    }
}
