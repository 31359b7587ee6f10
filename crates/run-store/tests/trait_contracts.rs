//! Trait contract tests for RunStore.
//!
//! Every check runs against both the in-memory fake and the SurrealDB
//! backend (in `mem://` mode). Any conforming implementation must pass.

use std::sync::Arc;

use run_store::fakes::MemoryRunStore;
use run_store::storage_traits::*;
use run_store::{StorageError, SurrealRunStore};

fn metadata(rows: usize) -> RunMetadata {
    RunMetadata {
        run_type: "consensus".to_string(),
        judge_model: "anthropic/claude-sonnet".to_string(),
        worker_models: vec![
            "openai/gpt-4o-mini".to_string(),
            "groq/llama-3.1-8b-instant".to_string(),
        ],
        config_digest: ContentDigest::from_bytes(b"config"),
        input_label: Some("rows.jsonl".to_string()),
        input_rows: rows,
        tags: serde_json::json!({"suite": "contracts"}),
    }
}

async fn stores() -> Vec<(&'static str, Arc<dyn RunStore>)> {
    vec![
        ("memory", Arc::new(MemoryRunStore::new()) as Arc<dyn RunStore>),
        (
            "surreal",
            Arc::new(SurrealRunStore::in_memory().await.unwrap()) as Arc<dyn RunStore>,
        ),
    ]
}

#[tokio::test]
async fn create_then_get_returns_running_record() {
    for (name, store) in stores().await {
        let run_id = store.create_run(metadata(3)).await.unwrap();
        let record = store.get_run(&run_id).await.unwrap();

        assert_eq!(record.run_id, run_id, "{name}");
        assert_eq!(record.status, RunStatus::Running, "{name}");
        assert!(record.summary.is_none(), "{name}");
        assert_eq!(record.metadata, metadata(3), "{name}");
    }
}

#[tokio::test]
async fn get_unknown_run_is_not_found() {
    for (name, store) in stores().await {
        let err = store.get_run(&RunId::from("missing")).await.unwrap_err();
        assert!(matches!(err, StorageError::RunNotFound { .. }), "{name}");
    }
}

#[tokio::test]
async fn append_to_unknown_run_is_not_found() {
    for (name, store) in stores().await {
        let row = RowResult::new(0, RowStatus::Success, 1.0, serde_json::json!({}));
        let err = store
            .append_result(&RunId::from("missing"), row)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::RunNotFound { .. }), "{name}");
    }
}

#[tokio::test]
async fn results_come_back_ordered_by_row_index() {
    for (name, store) in stores().await {
        let run_id = store.create_run(metadata(3)).await.unwrap();

        for idx in [2usize, 0, 1] {
            let row = RowResult::new(
                idx,
                RowStatus::Success,
                idx as f64,
                serde_json::json!({"row": idx}),
            );
            store.append_result(&run_id, row).await.unwrap();
        }

        let results = store.get_results(&run_id).await.unwrap();
        let indices: Vec<usize> = results.iter().map(|r| r.row_index).collect();
        assert_eq!(indices, vec![0, 1, 2], "{name}");
        assert_eq!(results[2].payload["row"], 2, "{name}");
        assert_eq!(
            results[1].payload_digest,
            ContentDigest::from_json(&serde_json::json!({"row": 1})),
            "{name}"
        );
    }
}

#[tokio::test]
async fn duplicate_rows_are_both_kept() {
    for (name, store) in stores().await {
        let run_id = store.create_run(metadata(1)).await.unwrap();
        let ok = RowResult::new(0, RowStatus::Success, 1.0, serde_json::json!({"a": 1}));
        let err = RowResult::new(0, RowStatus::Error, 2.0, serde_json::json!({"error": "x"}));
        store.append_result(&run_id, ok).await.unwrap();
        store.append_result(&run_id, err).await.unwrap();

        let results = store.get_results(&run_id).await.unwrap();
        assert_eq!(results.len(), 2, "{name}");
        let statuses: Vec<RowStatus> = results.iter().map(|r| r.status).collect();
        assert!(statuses.contains(&RowStatus::Success), "{name}");
        assert!(statuses.contains(&RowStatus::Error), "{name}");
    }
}

#[tokio::test]
async fn finish_sets_summary_and_blocks_appends() {
    for (name, store) in stores().await {
        let run_id = store.create_run(metadata(2)).await.unwrap();
        let summary = RunSummary {
            total_rows: 2,
            success_rows: 1,
            error_rows: 1,
            duration_ms: 1500,
        };
        store.finish_run(&run_id, summary.clone()).await.unwrap();

        let record = store.get_run(&run_id).await.unwrap();
        assert_eq!(record.status, RunStatus::Completed, "{name}");
        assert_eq!(record.summary, Some(summary.clone()), "{name}");
        assert!(record.completed_at.is_some(), "{name}");

        let row = RowResult::new(0, RowStatus::Success, 1.0, serde_json::json!({}));
        let err = store.append_result(&run_id, row).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidRunState { .. }), "{name}");

        let err = store.finish_run(&run_id, summary).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidRunState { .. }), "{name}");
    }
}

#[tokio::test]
async fn list_runs_contains_every_created_run() {
    for (name, store) in stores().await {
        let a = store.create_run(metadata(1)).await.unwrap();
        let b = store.create_run(metadata(2)).await.unwrap();

        let runs = store.list_runs().await.unwrap();
        let ids: Vec<&RunId> = runs.iter().map(|r| &r.run_id).collect();
        assert!(ids.contains(&&a), "{name}");
        assert!(ids.contains(&&b), "{name}");
        assert!(
            runs.windows(2).all(|w| w[0].created_at >= w[1].created_at),
            "{name}: newest first"
        );
    }
}
