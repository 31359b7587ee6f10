//! Request, result and settings types for one consensus invocation.

use std::fmt;

use run_store::RunId;
use serde::{Deserialize, Serialize};

use crate::agreement::AgreementMatrix;
use crate::backoff::BackoffPolicy;
use crate::endpoint::ModelSpec;

/// Everything one consensus call needs, carried by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusRequest {
    pub workers: Vec<ModelSpec>,
    pub judge: ModelSpec,
    pub worker_prompt: String,
    pub judge_prompt: String,
    pub content: String,
    #[serde(default)]
    pub enable_quality_scoring: bool,
    #[serde(default)]
    pub enable_disagreement_analysis: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    #[serde(default)]
    pub row_index: usize,
}

impl ConsensusRequest {
    /// Same models and prompts over different content.
    pub fn for_row(&self, row_index: usize, content: String, run_id: Option<RunId>) -> Self {
        Self {
            content,
            row_index,
            run_id,
            ..self.clone()
        }
    }
}

/// One successful worker call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResult {
    /// `worker_{n}`, 1-based request position.
    pub id: String,
    pub output: String,
    /// Seconds.
    pub latency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusType {
    FullAgreement,
    DisagreementSynthesized,
}

impl ConsensusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsensusType::FullAgreement => "FullAgreement",
            ConsensusType::DisagreementSynthesized => "DisagreementSynthesized",
        }
    }
}

impl fmt::Display for ConsensusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composed outcome of a consensus call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResult {
    pub worker_results: Vec<WorkerResult>,
    pub judge_output: String,
    pub judge_latency: f64,
    pub total_latency: f64,
    pub consensus_type: ConsensusType,
    /// `None` when kappa is undefined.
    pub kappa: Option<f64>,
    pub kappa_label: String,
    pub agreement_matrix: AgreementMatrix,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_scores: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disagreement_reason: Option<String>,
}

/// Five-band kappa label attached to results.
///
/// Unlike [`crate::agreement::interpret_kappa`] there is no "Slight" band:
/// anything below 0.2 (negative included) is "Poor".
pub fn response_kappa_label(k: f64) -> &'static str {
    if k.is_nan() {
        "N/A"
    } else if k < 0.2 {
        "Poor"
    } else if k < 0.4 {
        "Fair"
    } else if k < 0.6 {
        "Moderate"
    } else if k < 0.8 {
        "Substantial"
    } else {
        "Almost Perfect"
    }
}

/// Retry budgets and sampling temperatures for the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsensusSettings {
    pub worker_policy: BackoffPolicy,
    pub judge_policy: BackoffPolicy,
    pub enrichment_policy: BackoffPolicy,
    pub worker_temperature: f32,
    pub judge_temperature: f32,
    pub enrichment_temperature: f32,
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        Self {
            worker_policy: policy,
            judge_policy: policy,
            enrichment_policy: policy.with_max_attempts(2),
            worker_temperature: 0.0,
            judge_temperature: 0.0,
            enrichment_temperature: 0.0,
        }
    }
}
