//! How worker outputs become comparable sequences.
//!
//! The orchestrator only sees [`AgreementStrategy`]. [`PositionalAgreement`]
//! compares the i-th label of each output; [`LabelSetAgreement`] compares
//! which labels are present regardless of order.

use std::collections::BTreeSet;

use super::tokenize::{pad_to, tokenize_labels};
use super::{cohen_kappa, pairwise_agreement, AgreementMatrix};

/// Agreement measurement over trimmed worker outputs (in request order).
pub trait AgreementStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Kappa between the first two outputs. `NaN` when undefined.
    fn kappa(&self, outputs: &[&str]) -> f64;

    /// All-pairs agreement across every output.
    fn matrix(&self, outputs: &[&str]) -> AgreementMatrix;
}

/// Index-aligned comparison of comma/newline separated labels.
#[derive(Debug, Default, Clone, Copy)]
pub struct PositionalAgreement;

impl AgreementStrategy for PositionalAgreement {
    fn name(&self) -> &'static str {
        "positional"
    }

    fn kappa(&self, outputs: &[&str]) -> f64 {
        let (Some(first), Some(second)) = (outputs.first(), outputs.get(1)) else {
            return f64::NAN;
        };
        let a = tokenize_labels(first);
        let b = tokenize_labels(second);
        let len = a.len().max(b.len());
        cohen_kappa(&pad_to(a, len), &pad_to(b, len))
    }

    fn matrix(&self, outputs: &[&str]) -> AgreementMatrix {
        let tokenized: Vec<Vec<String>> = outputs.iter().map(|o| tokenize_labels(o)).collect();
        let len = tokenized.iter().map(Vec::len).max().unwrap_or(0);
        let padded: Vec<Vec<String>> = tokenized.into_iter().map(|t| pad_to(t, len)).collect();
        pairwise_agreement(&padded)
    }
}

/// Order- and duplicate-insensitive comparison via label presence vectors.
#[derive(Debug, Default, Clone, Copy)]
pub struct LabelSetAgreement;

impl LabelSetAgreement {
    /// One `"1"`/`"0"` vector per output over the sorted label universe.
    fn presence_vectors(outputs: &[&str]) -> Vec<Vec<&'static str>> {
        let sets: Vec<BTreeSet<String>> = outputs
            .iter()
            .map(|o| tokenize_labels(o).into_iter().collect())
            .collect();
        let universe: BTreeSet<&String> = sets.iter().flatten().collect();

        sets.iter()
            .map(|set| {
                universe
                    .iter()
                    .map(|label| if set.contains(*label) { "1" } else { "0" })
                    .collect()
            })
            .collect()
    }
}

impl AgreementStrategy for LabelSetAgreement {
    fn name(&self) -> &'static str {
        "label_set"
    }

    fn kappa(&self, outputs: &[&str]) -> f64 {
        if outputs.len() < 2 {
            return f64::NAN;
        }
        let vectors = Self::presence_vectors(&outputs[..2]);
        cohen_kappa(&vectors[0], &vectors[1])
    }

    fn matrix(&self, outputs: &[&str]) -> AgreementMatrix {
        pairwise_agreement(&Self::presence_vectors(outputs))
    }
}
