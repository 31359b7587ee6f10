//! Storage trait definitions for Quorum runs
//!
//! A *run* is one persisted execution: a single consensus request or a
//! whole batch of them. Each input row of a run produces one
//! [`RowResult`], keyed by the row index.
//!
//! The trait is async and backend-agnostic. An in-memory fake lives in
//! [`crate::fakes`]; the SurrealDB backend in [`crate::surreal_store`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Digest of a JSON value's compact serialization.
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self::from_bytes(value.to_string().as_bytes())
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// Opaque identifier for a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random RunId
    pub fn new() -> Self {
        RunId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        RunId(s.to_string())
    }
}

/// Metadata attached to a run at creation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Kind of run (e.g. "consensus")
    pub run_type: String,
    /// `provider/model` of the judge
    pub judge_model: String,
    /// `provider/model` of each worker, in request order
    pub worker_models: Vec<String>,
    /// Digest of the credential-free model and prompt configuration
    pub config_digest: ContentDigest,
    /// Where the input rows came from (file name, dataset label)
    pub input_label: Option<String>,
    /// Number of input rows the run expects
    pub input_rows: usize,
    /// Arbitrary key-value tags
    pub tags: serde_json::Value,
}

/// Outcome of a single row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Success,
    Error,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Success => "success",
            RowStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RowStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "success" => Ok(RowStatus::Success),
            "error" => Ok(RowStatus::Error),
            other => Err(StorageError::Backend(format!("unknown row status: {other}"))),
        }
    }
}

/// Persisted result of one input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowResult {
    /// Zero-based index of the input row
    pub row_index: usize,
    pub status: RowStatus,
    /// End-to-end latency of the row in seconds
    pub latency_secs: f64,
    /// The serialized consensus result, or `{"error": "..."}`
    pub payload: serde_json::Value,
    /// SHA-256 of `payload`
    pub payload_digest: ContentDigest,
    pub recorded_at: DateTime<Utc>,
}

impl RowResult {
    /// Build a row result, computing the payload digest.
    pub fn new(
        row_index: usize,
        status: RowStatus,
        latency_secs: f64,
        payload: serde_json::Value,
    ) -> Self {
        let payload_digest = ContentDigest::from_json(&payload);
        Self {
            row_index,
            status,
            latency_secs,
            payload,
            payload_digest,
            recorded_at: Utc::now(),
        }
    }
}

/// Summary produced when a run is finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_rows: u64,
    pub success_rows: u64,
    pub error_rows: u64,
    pub duration_ms: u64,
}

/// Status of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
}

/// Full run record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub metadata: RunMetadata,
    pub status: RunStatus,
    pub summary: Option<RunSummary>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Durable store of runs and their per-row results.
///
/// Guarantees:
/// - `append_result` on an unknown run fails with `RunNotFound`.
/// - A run transitions Running → Completed once; completed runs reject
///   further appends with `InvalidRunState`.
/// - Rows are not deduplicated: appending the same `row_index` twice keeps
///   both rows.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Create a new run, returning its unique ID.
    async fn create_run(&self, metadata: RunMetadata) -> StorageResult<RunId>;

    /// Append one row result to a running run.
    async fn append_result(&self, run_id: &RunId, result: RowResult) -> StorageResult<()>;

    /// Mark a run as completed with a summary.
    async fn finish_run(&self, run_id: &RunId, summary: RunSummary) -> StorageResult<()>;

    /// Retrieve a run record by ID.
    async fn get_run(&self, run_id: &RunId) -> StorageResult<RunRecord>;

    /// All row results of a run, ordered by `row_index`.
    async fn get_results(&self, run_id: &RunId) -> StorageResult<Vec<RowResult>>;

    /// All runs, newest first.
    async fn list_runs(&self) -> StorageResult<Vec<RunRecord>>;
}
