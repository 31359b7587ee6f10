//! Bounded-concurrency batch runner.
//!
//! One consensus request per input row, at most `concurrency` in flight.
//! A failing row is reported in its slot and never aborts its siblings.

use std::sync::Arc;
use std::time::Instant;

use run_store::{ContentDigest, RunId, RunMetadata, RunStore, RunSummary, StorageResult};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{instrument, warn};

use crate::consensus::{ConsensusRequest, ConsensusResult, Orchestrator};
use crate::recorder::RunRecorder;

/// Default number of rows processed at once.
pub const DEFAULT_CONCURRENCY: usize = 3;

#[derive(Clone)]
pub struct BatchOptions {
    /// Clamped to at least 1.
    pub concurrency: usize,
    /// Store receiving one run for the whole batch.
    pub run_store: Option<Arc<dyn RunStore>>,
    /// Recorded as the run's input label (e.g. the rows file name).
    pub input_label: Option<String>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            run_store: None,
            input_label: None,
        }
    }
}

/// Outcome of one input row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRow {
    pub row_index: usize,
    pub outcome: Result<ConsensusResult, String>,
}

/// All rows in input order plus counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub run_id: Option<RunId>,
    pub rows: Vec<BatchRow>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Run metadata for `template`. The digest covers models and prompts
/// only: credentials are never serialized and per-row fields are removed.
pub fn run_metadata(
    template: &ConsensusRequest,
    run_type: &str,
    input_label: Option<String>,
    input_rows: usize,
) -> RunMetadata {
    let mut config = serde_json::to_value(template).unwrap_or_default();
    if let Some(obj) = config.as_object_mut() {
        for key in ["content", "runId", "rowIndex"] {
            obj.remove(key);
        }
    }

    RunMetadata {
        run_type: run_type.to_string(),
        judge_model: template.judge.label(),
        worker_models: template.workers.iter().map(|w| w.label()).collect(),
        config_digest: ContentDigest::from_json(&config),
        input_label,
        input_rows,
        tags: serde_json::json!({
            "quality_scoring": template.enable_quality_scoring,
            "disagreement_analysis": template.enable_disagreement_analysis,
        }),
    }
}

/// Run `template` over every row of `rows`.
///
/// With a store, one run is created up front and finished with a summary
/// at the end. Rows are always recorded into that store; a recorder the
/// orchestrator carries is not used for batch rows.
#[instrument(skip_all, fields(rows = rows.len(), concurrency = options.concurrency))]
pub async fn run_batch(
    orchestrator: Arc<Orchestrator>,
    template: &ConsensusRequest,
    rows: Vec<String>,
    options: BatchOptions,
) -> StorageResult<BatchReport> {
    let started = Instant::now();
    let total = rows.len();

    let run_id = match &options.run_store {
        Some(store) => Some(
            store
                .create_run(run_metadata(
                    template,
                    "consensus_batch",
                    options.input_label.clone(),
                    total,
                ))
                .await?,
        ),
        None => None,
    };

    let row_recorder = options
        .run_store
        .as_ref()
        .map(|store| RunRecorder::new(Arc::clone(store)));

    let sem = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = Vec::with_capacity(total);

    for (row_index, content) in rows.into_iter().enumerate() {
        let request = template.for_row(row_index, content, run_id.clone());
        let orchestrator = Arc::clone(&orchestrator);
        let row_recorder = row_recorder.clone();
        let sem = Arc::clone(&sem);

        tasks.push(tokio::spawn(async move {
            let _permit = sem.acquire_owned().await.ok();
            orchestrator
                .run_recorded(&request, row_recorder.as_ref())
                .await
                .map_err(|e| e.to_string())
        }));
    }

    let mut report_rows = Vec::with_capacity(total);
    for (row_index, task) in tasks.into_iter().enumerate() {
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(row_index, error = %e, "batch row task aborted");
                Err(format!("row task aborted: {e}"))
            }
        };
        report_rows.push(BatchRow { row_index, outcome });
    }

    let succeeded = report_rows.iter().filter(|r| r.outcome.is_ok()).count();
    let failed = total - succeeded;
    let duration_ms = started.elapsed().as_millis() as u64;

    if let (Some(store), Some(run_id)) = (&options.run_store, &run_id) {
        let summary = RunSummary {
            total_rows: total as u64,
            success_rows: succeeded as u64,
            error_rows: failed as u64,
            duration_ms,
        };
        if let Err(e) = store.finish_run(run_id, summary).await {
            crate::obs::emit_finish_error(&run_id.0, &e);
        }
    }

    crate::obs::emit_batch_finished(
        run_id.as_ref().map(|id| id.0.as_str()),
        succeeded,
        failed,
        duration_ms,
    );

    Ok(BatchReport {
        run_id,
        rows: report_rows,
        succeeded,
        failed,
    })
}
