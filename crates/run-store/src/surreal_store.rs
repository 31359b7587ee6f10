//! SurrealDB-backed RunStore implementation
//!
//! Uses `schema::RunRow` and `schema::ResultRow` for persistence,
//! converting to/from `storage_traits` types at the boundary.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::migrations;
use crate::schema::{ResultRow, RunRow};
use crate::storage_traits::{
    ContentDigest, RowResult, RunId, RunMetadata, RunRecord, RunStatus, RunStore, RunSummary,
    StorageResult,
};

/// Environment variable naming the SurrealDB endpoint.
pub const SURREALDB_URL_ENV: &str = "QUORUM_SURREALDB_URL";

const NAMESPACE: &str = "quorum";
const DATABASE: &str = "main";

/// SurrealDB-backed implementation of [`RunStore`].
pub struct SurrealRunStore {
    db: Surreal<Any>,
}

impl SurrealRunStore {
    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> StorageResult<Self> {
        Self::connect("mem://").await
    }

    /// Connect to any SurrealDB endpoint (`mem://`, `surrealkv://path`,
    /// `ws://host:port`), select `quorum/main`, and run migrations.
    pub async fn connect(url: &str) -> StorageResult<Self> {
        if let Some(path) = url.strip_prefix("surrealkv://") {
            std::fs::create_dir_all(path).map_err(|e| {
                StorageError::Backend(format!(
                    "Failed to create database directory {}: {}",
                    path, e
                ))
            })?;
        }

        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        migrations::init_schema(&db).await?;
        info!(url = %url, "SurrealRunStore connected");
        Ok(Self { db })
    }

    // -- private helpers -----------------------------------------------------

    /// Fetch a run row by ID, returning the DB row or RunNotFound.
    async fn fetch_run(&self, rid: &str) -> StorageResult<RunRow> {
        let rid_owned = rid.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM runs WHERE run_id = $rid")
            .bind(("rid", rid_owned))
            .await?;

        let rows: Vec<RunRow> = res.take(0)?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: rid.to_string(),
            })
    }

    /// Fetch a run row and verify it is in "running" state.
    async fn fetch_running(&self, rid: &str) -> StorageResult<RunRow> {
        let row = self.fetch_run(rid).await?;
        if row.status != "running" {
            return Err(StorageError::InvalidRunState {
                run_id: rid.to_string(),
                status: row.status,
                expected: "Running".to_string(),
            });
        }
        Ok(row)
    }

    fn run_row_to_record(row: RunRow) -> StorageResult<RunRecord> {
        let status = match row.status.as_str() {
            "running" => RunStatus::Running,
            "completed" => RunStatus::Completed,
            other => {
                return Err(StorageError::Backend(format!(
                    "unknown run status: {other}"
                )))
            }
        };

        let summary = (status == RunStatus::Completed).then(|| RunSummary {
            total_rows: row.total_rows,
            success_rows: row.success_rows,
            error_rows: row.error_rows,
            duration_ms: row.duration_ms,
        });

        Ok(RunRecord {
            run_id: RunId(row.run_id),
            metadata: RunMetadata {
                run_type: row.run_type,
                judge_model: row.judge_model,
                worker_models: row.worker_models,
                config_digest: ContentDigest::try_from(row.config_digest)?,
                input_label: row.input_label,
                input_rows: row.input_rows as usize,
                tags: row.tags,
            },
            status,
            summary,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }

    fn result_row_to_result(row: ResultRow) -> StorageResult<RowResult> {
        Ok(RowResult {
            row_index: row.row_index as usize,
            status: row.status.parse()?,
            latency_secs: row.latency_secs,
            payload: row.payload,
            payload_digest: ContentDigest::try_from(row.payload_digest)?,
            recorded_at: row.recorded_at,
        })
    }
}

#[async_trait]
impl RunStore for SurrealRunStore {
    async fn create_run(&self, metadata: RunMetadata) -> StorageResult<RunId> {
        let run_id = RunId::new();
        let db_row = RunRow::new(run_id.0.clone(), &metadata);

        debug!(run_id = %run_id, "creating run");

        let _created: Option<RunRow> = self.db.create("runs").content(db_row).await?;

        Ok(run_id)
    }

    async fn append_result(&self, run_id: &RunId, result: RowResult) -> StorageResult<()> {
        self.fetch_running(&run_id.0).await?;

        let db_row = ResultRow::from_result(run_id.0.clone(), &result);

        let _created: Option<ResultRow> = self.db.create("run_results").content(db_row).await?;

        debug!(run_id = %run_id, row_index = result.row_index, "appended row result");
        Ok(())
    }

    async fn finish_run(&self, run_id: &RunId, summary: RunSummary) -> StorageResult<()> {
        self.fetch_running(&run_id.0).await?;

        let rid_owned = run_id.0.clone();
        self.db
            .query(
                "UPDATE runs SET status = 'completed', total_rows = $total, \
                 success_rows = $ok, error_rows = $err, duration_ms = $ms, \
                 completed_at = time::now() WHERE run_id = $rid",
            )
            .bind(("total", summary.total_rows))
            .bind(("ok", summary.success_rows))
            .bind(("err", summary.error_rows))
            .bind(("ms", summary.duration_ms))
            .bind(("rid", rid_owned))
            .await?
            .check()?;

        Ok(())
    }

    async fn get_run(&self, run_id: &RunId) -> StorageResult<RunRecord> {
        let row = self.fetch_run(&run_id.0).await?;
        Self::run_row_to_record(row)
    }

    async fn get_results(&self, run_id: &RunId) -> StorageResult<Vec<RowResult>> {
        self.fetch_run(&run_id.0).await?;

        let rid_owned = run_id.0.clone();
        let mut res = self
            .db
            .query("SELECT * FROM run_results WHERE run_id = $rid ORDER BY row_index ASC, recorded_at ASC")
            .bind(("rid", rid_owned))
            .await?;

        let rows: Vec<ResultRow> = res.take(0)?;

        rows.into_iter().map(Self::result_row_to_result).collect()
    }

    async fn list_runs(&self) -> StorageResult<Vec<RunRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM runs ORDER BY created_at DESC")
            .await?;
        let rows: Vec<RunRow> = res.take(0)?;

        rows.into_iter().map(Self::run_row_to_record).collect()
    }
}
