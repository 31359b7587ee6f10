//! Judge context assembly and the optional enrichment calls.

use serde::Deserialize;

use super::types::WorkerResult;
use crate::model_json::ModelJson;

/// Separator between context segments handed to the judge.
pub const SEGMENT_SEPARATOR: &str = "\n\n---\n\n";

pub(crate) const QUALITY_SYSTEM_PROMPT: &str = "You review answers that several assistants gave to the same task. \
Rate each answer for correctness and usefulness on an integer scale from 1 (poor) to 10 (excellent). \
Reply with strict JSON only, no prose and no code fences, in the form {\"quality_scores\": [<answer 1>, <answer 2>, ...]} \
with exactly one integer per answer, in the order the answers appear.";

pub(crate) const DISAGREEMENT_SYSTEM_PROMPT: &str = "Several assistants answered the same task and their answers differ. \
In exactly one sentence, state the main point on which they disagree. Reply with that sentence only.";

/// Raw content first, then one `"{id}:\n{output}"` segment per worker.
pub fn judge_context(content: &str, workers: &[WorkerResult]) -> String {
    let mut segments = Vec::with_capacity(workers.len() + 1);
    segments.push(content.to_string());
    segments.extend(
        workers
            .iter()
            .map(|w| format!("{}:\n{}", w.id, w.output.trim())),
    );
    segments.join(SEGMENT_SEPARATOR)
}

#[derive(Debug, Deserialize)]
struct QualityScores {
    quality_scores: Vec<i64>,
}

/// Why a quality-score reply was rejected.
///
/// Messages carry no values from the reply; they are matched against the
/// retry markers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreRejection {
    #[error("quality scores reply was not the expected JSON object")]
    Unparsed,
    #[error("quality score count does not match the worker count")]
    WrongCount { expected: usize, got: usize },
    #[error("quality score outside 1..=10")]
    OutOfRange(i64),
}

/// Accept a quality-score reply only if it holds exactly one 1..=10
/// integer per worker.
pub fn parse_quality_scores(raw: &str, workers: usize) -> Result<Vec<u8>, ScoreRejection> {
    let scores = match ModelJson::<QualityScores>::parse(raw) {
        ModelJson::Parsed(parsed) => parsed.quality_scores,
        ModelJson::Unparsed(_) => return Err(ScoreRejection::Unparsed),
    };

    if scores.len() != workers {
        return Err(ScoreRejection::WrongCount {
            expected: workers,
            got: scores.len(),
        });
    }

    scores
        .into_iter()
        .map(|s| match u8::try_from(s) {
            Ok(v) if (1..=10).contains(&v) => Ok(v),
            _ => Err(ScoreRejection::OutOfRange(s)),
        })
        .collect()
}

/// First non-empty line of a disagreement reply, trimmed.
pub fn one_sentence(raw: &str) -> Option<String> {
    raw.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
