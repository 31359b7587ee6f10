//! Quorum Core
//!
//! Multi-model consensus: the same content goes to several worker models in
//! parallel, a judge model synthesizes their answers, and agreement between
//! workers is measured with Cohen's Kappa and a pairwise agreement matrix.
//!
//! ## Key Components
//!
//! - [`backoff`]: retry with exponential backoff, fail-fast on auth and
//!   validation errors
//! - [`agreement`]: kappa, exact-match rate, pairwise matrix, strategies
//! - [`consensus::Orchestrator`]: dispatch, quorum, judge, enrichment
//! - [`RunRecorder`]: persists rows into a [`run_store::RunStore`]
//! - [`batch::run_batch`]: bounded-concurrency runs over many rows

pub mod agreement;
pub mod backoff;
pub mod batch;
pub mod config;
pub mod consensus;
pub mod endpoint;
pub mod error;
pub mod metrics;
pub mod model_json;
pub mod obs;
pub mod recorder;
pub mod telemetry;

pub use agreement::{
    cohen_kappa, exact_match_rate, interpret_kappa, pairwise_agreement, AgreementMatrix,
    AgreementStrategy, LabelSetAgreement, PositionalAgreement,
};
pub use backoff::{is_non_retryable, with_backoff, BackoffPolicy};
pub use batch::{run_batch, BatchOptions, BatchReport, BatchRow};
pub use config::QuorumConfig;
pub use consensus::{
    response_kappa_label, ConsensusRequest, ConsensusResult, ConsensusSettings, ConsensusType,
    Orchestrator, WorkerResult,
};
pub use endpoint::{
    EndpointFactory, HttpEndpointFactory, HttpModelEndpoint, ModelEndpoint, ModelReply, ModelSpec,
    Provider,
};
pub use error::{ConfigError, ConsensusError, EndpointError, Result};
pub use model_json::ModelJson;
pub use recorder::RunRecorder;
