//! Consensus orchestration over multiple worker models and one judge.

pub mod enrichment;
pub mod orchestrator;
pub mod types;

pub use enrichment::{judge_context, parse_quality_scores, ScoreRejection, SEGMENT_SEPARATOR};
pub use orchestrator::{ConsensusPhase, Orchestrator, QUORUM};
pub use types::{
    response_kappa_label, ConsensusRequest, ConsensusResult, ConsensusSettings, ConsensusType,
    WorkerResult,
};
