//! Consensus-to-run-store adapter: turns a finished (or failed) row into a
//! persisted [`RowResult`].

use std::sync::Arc;

use run_store::{RowResult, RowStatus, RunId, RunStore, StorageError, StorageResult};

use crate::consensus::ConsensusResult;
use crate::metrics::METRICS;

/// Records consensus rows into a [`RunStore`].
///
/// Callers treat every error as non-fatal: a row that cannot be recorded
/// is logged and the consensus result is still returned.
#[derive(Clone)]
pub struct RunRecorder {
    store: Arc<dyn RunStore>,
}

impl RunRecorder {
    pub fn new(store: Arc<dyn RunStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RunStore> {
        &self.store
    }

    /// Persist a successful row. Latency is the result's total latency.
    pub async fn record_success(
        &self,
        run_id: &RunId,
        row_index: usize,
        result: &ConsensusResult,
    ) -> StorageResult<()> {
        let payload = serde_json::to_value(result)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let row = RowResult::new(row_index, RowStatus::Success, result.total_latency, payload);
        self.append(run_id, row).await
    }

    /// Persist a failed row as `{"error": message}`.
    pub async fn record_failure(
        &self,
        run_id: &RunId,
        row_index: usize,
        message: &str,
        latency_secs: f64,
    ) -> StorageResult<()> {
        let payload = serde_json::json!({ "error": message });
        let row = RowResult::new(row_index, RowStatus::Error, latency_secs, payload);
        self.append(run_id, row).await
    }

    async fn append(&self, run_id: &RunId, row: RowResult) -> StorageResult<()> {
        let row_index = row.row_index;
        let status = row.status;
        match self.store.append_result(run_id, row).await {
            Ok(()) => {
                METRICS.inc_rows_recorded();
                crate::obs::emit_row_recorded(&run_id.0, row_index, status.as_str());
                Ok(())
            }
            Err(e) => {
                crate::obs::emit_record_error(&run_id.0, row_index, &e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agreement::pairwise_agreement;
    use crate::consensus::{ConsensusType, WorkerResult};
    use run_store::fakes::MemoryRunStore;
    use run_store::{ContentDigest, RunMetadata};

    fn metadata() -> RunMetadata {
        RunMetadata {
            run_type: "consensus".into(),
            judge_model: "anthropic/claude".into(),
            worker_models: vec!["openai/a".into(), "groq/b".into()],
            config_digest: ContentDigest::from_bytes(b"cfg"),
            input_label: None,
            input_rows: 1,
            tags: serde_json::json!({}),
        }
    }

    fn result() -> ConsensusResult {
        ConsensusResult {
            worker_results: vec![
                WorkerResult { id: "worker_1".into(), output: "Bug".into(), latency: 1.0 },
                WorkerResult { id: "worker_2".into(), output: "Bug".into(), latency: 2.0 },
            ],
            judge_output: "Bug".into(),
            judge_latency: 0.5,
            total_latency: 2.5,
            consensus_type: ConsensusType::FullAgreement,
            kappa: None,
            kappa_label: "N/A".into(),
            agreement_matrix: pairwise_agreement(&[vec!["Bug"], vec!["Bug"]]),
            quality_scores: None,
            disagreement_reason: None,
        }
    }

    #[tokio::test]
    async fn test_record_success_stores_digest_of_payload() {
        let store = Arc::new(MemoryRunStore::new());
        let run_id = store.create_run(metadata()).await.unwrap();
        let recorder = RunRecorder::new(store.clone());

        recorder.record_success(&run_id, 3, &result()).await.unwrap();

        let rows = store.get_results(&run_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_index, 3);
        assert_eq!(rows[0].status, RowStatus::Success);
        assert_eq!(rows[0].latency_secs, 2.5);
        assert_eq!(rows[0].payload["judgeOutput"], "Bug");
        assert_eq!(rows[0].payload_digest, ContentDigest::from_json(&rows[0].payload));
    }

    #[tokio::test]
    async fn test_record_failure_stores_error_payload() {
        let store = Arc::new(MemoryRunStore::new());
        let run_id = store.create_run(metadata()).await.unwrap();
        let recorder = RunRecorder::new(store.clone());

        recorder
            .record_failure(&run_id, 0, "got 1/3", 0.2)
            .await
            .unwrap();

        let rows = store.get_results(&run_id).await.unwrap();
        assert_eq!(rows[0].status, RowStatus::Error);
        assert_eq!(rows[0].payload["error"], "got 1/3");
    }

    #[tokio::test]
    async fn test_unknown_run_surfaces_storage_error() {
        let recorder = RunRecorder::new(Arc::new(MemoryRunStore::new()));
        let err = recorder
            .record_success(&RunId::from("nope"), 0, &result())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::RunNotFound { .. }));
    }
}
