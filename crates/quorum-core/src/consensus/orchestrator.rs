//! Consensus orchestration: parallel workers, quorum gate, agreement
//! analysis, judge synthesis and best-effort enrichment.
//!
//! Phases: `Dispatching → Analyzing → Judging → Enriching → Done`, with
//! `Failed` when fewer than two workers succeed or the judge cannot answer.
//! Every external call goes through a [`crate::backoff::BackoffPolicy`].

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, warn, Instrument};

use super::enrichment::{
    judge_context, one_sentence, parse_quality_scores, DISAGREEMENT_SYSTEM_PROMPT,
    QUALITY_SYSTEM_PROMPT,
};
use super::types::{
    response_kappa_label, ConsensusRequest, ConsensusResult, ConsensusSettings, ConsensusType,
    WorkerResult,
};
use crate::agreement::{AgreementStrategy, PositionalAgreement};
use crate::endpoint::{EndpointFactory, ModelEndpoint, ModelReply, ModelSpec};
use crate::error::{ConsensusError, Result};
use crate::metrics::METRICS;
use crate::obs;
use crate::recorder::RunRecorder;

/// Minimum successful workers for a result to exist.
pub const QUORUM: usize = 2;

/// Lifecycle phase of one consensus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusPhase {
    Dispatching,
    Analyzing,
    Judging,
    Enriching,
    Done,
    Failed,
}

impl fmt::Display for ConsensusPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConsensusPhase::Dispatching => "dispatching",
            ConsensusPhase::Analyzing => "analyzing",
            ConsensusPhase::Judging => "judging",
            ConsensusPhase::Enriching => "enriching",
            ConsensusPhase::Done => "done",
            ConsensusPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Runs consensus requests against endpoints produced by an
/// [`EndpointFactory`].
///
/// Holds no per-request state; one orchestrator can serve many concurrent
/// requests.
pub struct Orchestrator {
    factory: Arc<dyn EndpointFactory>,
    strategy: Arc<dyn AgreementStrategy>,
    recorder: Option<RunRecorder>,
    settings: ConsensusSettings,
}

impl Orchestrator {
    pub fn new(factory: Arc<dyn EndpointFactory>) -> Self {
        Self {
            factory,
            strategy: Arc::new(PositionalAgreement),
            recorder: None,
            settings: ConsensusSettings::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn AgreementStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_recorder(mut self, recorder: RunRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_settings(mut self, settings: ConsensusSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ConsensusSettings {
        &self.settings
    }

    /// Run one consensus request.
    ///
    /// Fails only when the request names fewer than two workers, when fewer
    /// than two workers succeed, or when the judge call is exhausted.
    /// Enrichment and recording failures never fail the request.
    pub async fn run_consensus(&self, request: &ConsensusRequest) -> Result<ConsensusResult> {
        self.run_recorded(request, self.recorder.as_ref()).await
    }

    /// [`Self::run_consensus`] recording into `recorder` instead of the
    /// orchestrator's own.
    pub(crate) async fn run_recorded(
        &self,
        request: &ConsensusRequest,
        recorder: Option<&RunRecorder>,
    ) -> Result<ConsensusResult> {
        let span = obs::consensus_span(
            request.run_id.as_ref().map(|id| id.0.as_str()),
            request.row_index,
        );
        self.run_in_span(request, recorder).instrument(span).await
    }

    async fn run_in_span(
        &self,
        request: &ConsensusRequest,
        recorder: Option<&RunRecorder>,
    ) -> Result<ConsensusResult> {
        let started = Instant::now();
        METRICS.inc_requests();

        let outcome = self.execute(request).await;

        match &outcome {
            Ok(result) => {
                persist_success(recorder, request, result).await;
                enter_phase(ConsensusPhase::Done);
            }
            Err(err) => {
                enter_phase(ConsensusPhase::Failed);
                obs::emit_consensus_failed(err);
                persist_failure(
                    recorder,
                    request,
                    &err.to_string(),
                    started.elapsed().as_secs_f64(),
                )
                .await;
            }
        }

        outcome
    }

    async fn execute(&self, request: &ConsensusRequest) -> Result<ConsensusResult> {
        if request.workers.len() < QUORUM {
            return Err(ConsensusError::TooFewWorkers {
                requested: request.workers.len(),
            });
        }
        obs::emit_consensus_started(request.workers.len(), &request.judge.label());

        enter_phase(ConsensusPhase::Dispatching);
        let workers = self.dispatch_workers(request).await?;

        enter_phase(ConsensusPhase::Analyzing);
        let trimmed: Vec<&str> = workers.iter().map(|w| w.output.trim()).collect();
        let consensus_type = if trimmed.windows(2).all(|pair| pair[0] == pair[1]) {
            ConsensusType::FullAgreement
        } else {
            ConsensusType::DisagreementSynthesized
        };
        let kappa = self.strategy.kappa(&trimmed);
        let agreement_matrix = self.strategy.matrix(&trimmed);
        debug!(
            strategy = self.strategy.name(),
            consensus_type = %consensus_type,
            kappa,
            "agreement analyzed"
        );

        enter_phase(ConsensusPhase::Judging);
        let judge = self
            .factory
            .endpoint(&request.judge)
            .map_err(|e| ConsensusError::Judge(e.to_string()))?;
        let context = judge_context(&request.content, &workers);

        let judge_reply = {
            let judge = &judge;
            let prompt = request.judge_prompt.as_str();
            let context = context.as_str();
            let temperature = self.settings.judge_temperature;
            self.settings
                .judge_policy
                .retry(move || judge.call(prompt, context, temperature))
                .await
                .map_err(|e| ConsensusError::Judge(e.to_string()))?
        };

        let slowest_worker = workers.iter().map(|w| w.latency).fold(0.0, f64::max);
        let total_latency = judge_reply.latency_secs + slowest_worker;

        let mut quality_scores = None;
        let mut disagreement_reason = None;
        let wants_reason = request.enable_disagreement_analysis
            && consensus_type != ConsensusType::FullAgreement;
        if request.enable_quality_scoring || wants_reason {
            enter_phase(ConsensusPhase::Enriching);
            let scoring = async {
                if request.enable_quality_scoring {
                    self.score_quality(judge.as_ref(), &context, workers.len()).await
                } else {
                    None
                }
            };
            let explaining = async {
                if wants_reason {
                    self.explain_disagreement(judge.as_ref(), &context).await
                } else {
                    None
                }
            };
            (quality_scores, disagreement_reason) = futures::join!(scoring, explaining);
        }

        let kappa_label = response_kappa_label(kappa).to_string();
        obs::emit_judged(consensus_type.as_str(), &kappa_label, total_latency);

        Ok(ConsensusResult {
            worker_results: workers,
            judge_output: judge_reply.text,
            judge_latency: judge_reply.latency_secs,
            total_latency,
            consensus_type,
            kappa: (!kappa.is_nan()).then_some(kappa),
            kappa_label,
            agreement_matrix,
            quality_scores,
            disagreement_reason,
        })
    }

    /// Call every worker concurrently and wait for all of them. Successes
    /// keep request order.
    async fn dispatch_workers(&self, request: &ConsensusRequest) -> Result<Vec<WorkerResult>> {
        let calls: Vec<_> = request
            .workers
            .iter()
            .enumerate()
            .map(|(i, spec)| self.call_worker(i, spec, request))
            .collect();

        let settled = join_all(calls).await;
        let requested = settled.len();

        let mut successes = Vec::with_capacity(requested);
        let mut failures = Vec::new();
        for (id, model, outcome) in settled {
            match outcome {
                Ok(reply) => {
                    METRICS.inc_worker_success();
                    debug!(worker = %id, model = %model, latency_secs = reply.latency_secs, "worker succeeded");
                    successes.push(WorkerResult {
                        id,
                        output: reply.text,
                        latency: reply.latency_secs,
                    });
                }
                Err(message) => {
                    METRICS.inc_worker_failure();
                    warn!(worker = %id, model = %model, error = %message, "worker failed");
                    failures.push(format!("{id}: {message}"));
                }
            }
        }

        obs::emit_workers_settled(successes.len(), requested);

        if successes.len() < QUORUM {
            METRICS.inc_quorum_failure();
            return Err(ConsensusError::Quorum {
                succeeded: successes.len(),
                requested,
                failures,
            });
        }
        Ok(successes)
    }

    /// One worker call under the worker policy. Returns `(id, model, outcome)`.
    async fn call_worker(
        &self,
        index: usize,
        spec: &ModelSpec,
        request: &ConsensusRequest,
    ) -> (String, String, std::result::Result<ModelReply, String>) {
        let id = format!("worker_{}", index + 1);
        let outcome = match self.factory.endpoint(spec) {
            Ok(endpoint) => {
                let endpoint = &endpoint;
                let prompt = request.worker_prompt.as_str();
                let content = request.content.as_str();
                let temperature = self.settings.worker_temperature;
                self.settings
                    .worker_policy
                    .retry(move || endpoint.call(prompt, content, temperature))
                    .await
                    .map_err(|e| e.to_string())
            }
            Err(e) => Err(e.to_string()),
        };
        (id, spec.label(), outcome)
    }

    async fn score_quality(
        &self,
        judge: &dyn ModelEndpoint,
        context: &str,
        workers: usize,
    ) -> Option<Vec<u8>> {
        let temperature = self.settings.enrichment_temperature;
        let outcome = self
            .settings
            .enrichment_policy
            .retry(move || async move {
                let reply = judge
                    .call(QUALITY_SYSTEM_PROMPT, context, temperature)
                    .await
                    .map_err(|e| e.to_string())?;
                parse_quality_scores(&reply.text, workers).map_err(|e| e.to_string())
            })
            .await;

        match outcome {
            Ok(scores) => Some(scores),
            Err(e) => {
                METRICS.inc_enrichment_failure();
                warn!(error = %e, "quality scoring skipped");
                None
            }
        }
    }

    async fn explain_disagreement(&self, judge: &dyn ModelEndpoint, context: &str) -> Option<String> {
        let temperature = self.settings.enrichment_temperature;
        let outcome = self
            .settings
            .enrichment_policy
            .retry(move || judge.call(DISAGREEMENT_SYSTEM_PROMPT, context, temperature))
            .await;

        match outcome.map(|reply| one_sentence(&reply.text)) {
            Ok(Some(sentence)) => Some(sentence),
            Ok(None) => None,
            Err(e) => {
                METRICS.inc_enrichment_failure();
                warn!(error = %e, "disagreement analysis skipped");
                None
            }
        }
    }
}

async fn persist_success(
    recorder: Option<&RunRecorder>,
    request: &ConsensusRequest,
    result: &ConsensusResult,
) {
    let (Some(run_id), Some(recorder)) = (&request.run_id, recorder) else {
        return;
    };
    // Errors are already logged by the recorder.
    let _ = recorder
        .record_success(run_id, request.row_index, result)
        .await;
}

async fn persist_failure(
    recorder: Option<&RunRecorder>,
    request: &ConsensusRequest,
    message: &str,
    latency_secs: f64,
) {
    let (Some(run_id), Some(recorder)) = (&request.run_id, recorder) else {
        return;
    };
    let _ = recorder
        .record_failure(run_id, request.row_index, message, latency_secs)
        .await;
}

fn enter_phase(phase: ConsensusPhase) {
    debug!(phase = %phase, "consensus phase");
}
