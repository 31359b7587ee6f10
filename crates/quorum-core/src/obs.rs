//! Structured lifecycle events for consensus requests and batches.
//!
//! [`consensus_span`] tags everything logged during one request with its
//! run id and row index. The `emit_*` functions log one event each under a
//! stable `event` name so log pipelines can filter on it.

use tracing::{info, warn};

/// Span for one consensus request. Attach with `Instrument::instrument`
/// so it follows the future across await points.
pub fn consensus_span(run_id: Option<&str>, row_index: usize) -> tracing::Span {
    tracing::info_span!(
        "quorum.consensus",
        run_id = run_id.unwrap_or("-"),
        row_index = row_index
    )
}

pub fn emit_consensus_started(workers: usize, judge: &str) {
    info!(event = "consensus.started", workers = workers, judge = %judge);
}

pub fn emit_workers_settled(succeeded: usize, requested: usize) {
    info!(
        event = "consensus.workers_settled",
        succeeded = succeeded,
        requested = requested,
    );
}

pub fn emit_judged(consensus_type: &str, kappa_label: &str, total_latency_secs: f64) {
    info!(
        event = "consensus.judged",
        consensus_type = %consensus_type,
        kappa_label = %kappa_label,
        total_latency_secs = total_latency_secs,
    );
}

pub fn emit_consensus_failed(error: &dyn std::fmt::Display) {
    warn!(event = "consensus.failed", error = %error);
}

pub fn emit_row_recorded(run_id: &str, row_index: usize, status: &str) {
    info!(
        event = "run.row_recorded",
        run_id = %run_id,
        row_index = row_index,
        status = %status,
    );
}

/// Recording is best-effort, so failures surface only here.
pub fn emit_record_error(run_id: &str, row_index: usize, error: &dyn std::fmt::Display) {
    warn!(
        event = "run.record_error",
        run_id = %run_id,
        row_index = row_index,
        error = %error,
    );
}

/// Finishing a run failed. The run stays `running` in the store.
pub fn emit_finish_error(run_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "run.finish_error", run_id = %run_id, error = %error);
}

pub fn emit_batch_finished(run_id: Option<&str>, succeeded: usize, failed: usize, duration_ms: u64) {
    info!(
        event = "batch.finished",
        run_id = run_id.unwrap_or("-"),
        succeeded = succeeded,
        failed = failed,
        duration_ms = duration_ms,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_enter_without_run_id() {
        let _entered = consensus_span(None, 0).entered();
        emit_consensus_started(3, "anthropic/claude");
        emit_batch_finished(None, 2, 1, 10);
        emit_finish_error("run-1", &"store unavailable");
    }
}
