//! Agreement analytics over tokenized worker outputs.
//!
//! Pure functions with exact numeric semantics:
//!
//! - [`cohen_kappa`]: chance-corrected agreement between two raters
//! - [`interpret_kappa`]: six-band Landis & Koch label
//! - [`exact_match_rate`]: fraction of index-aligned equal tokens
//! - [`pairwise_agreement`]: all-pairs exact-match matrix for K raters
//!
//! All comparisons are position-aligned: token `i` of one rater is
//! compared with token `i` of the other. See [`strategy`] for how raw
//! text becomes comparable sequences.

pub mod strategy;
pub mod tokenize;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use strategy::{AgreementStrategy, LabelSetAgreement, PositionalAgreement};
pub use tokenize::{pad_to, tokenize_labels};

/// All-pairs exact-match agreement among K raters.
///
/// `values` is square, symmetric, with a diagonal of 1. The pair vectors
/// list the upper triangle in ascending `(i, j)` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementMatrix {
    /// `"Worker 1"`, `"Worker 2"`, …
    pub labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
    /// `"W1–W2"`, `"W1–W3"`, … (en dash)
    pub pair_labels: Vec<String>,
    pub pair_agreements: Vec<f64>,
}

/// Cohen's Kappa between two equal-length label sequences.
///
/// Returns `NaN` when the lengths differ, when both are empty, or when
/// expected agreement is exactly 1 (every label in both sequences is the
/// same single category).
pub fn cohen_kappa<S: AsRef<str>>(a: &[S], b: &[S]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return f64::NAN;
    }

    let n = a.len() as f64;
    let matches = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.as_ref() == y.as_ref())
        .count();
    let po = matches as f64 / n;

    let mut freq_a: HashMap<&str, usize> = HashMap::new();
    let mut freq_b: HashMap<&str, usize> = HashMap::new();
    for label in a {
        *freq_a.entry(label.as_ref()).or_insert(0) += 1;
    }
    for label in b {
        *freq_b.entry(label.as_ref()).or_insert(0) += 1;
    }

    // Categories seen only by one rater contribute 0 to the product.
    let pe: f64 = freq_a
        .iter()
        .map(|(category, count_a)| {
            let count_b = freq_b.get(category).copied().unwrap_or(0);
            (*count_a as f64 / n) * (count_b as f64 / n)
        })
        .sum();

    if pe == 1.0 {
        return f64::NAN;
    }

    (po - pe) / (1.0 - pe)
}

/// Six-band interpretation of a kappa value (lower edge inclusive).
pub fn interpret_kappa(k: f64) -> &'static str {
    if k.is_nan() {
        "N/A"
    } else if k < 0.0 {
        "Poor"
    } else if k < 0.2 {
        "Slight"
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

/// Fraction of positions where `a` and `b` hold the same token.
///
/// Returns 0 when the lengths differ or both are empty.
pub fn exact_match_rate<S: AsRef<str>>(a: &[S], b: &[S]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let matches = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.as_ref() == y.as_ref())
        .count();
    matches as f64 / a.len() as f64
}

/// Pairwise exact-match agreement for K sequences (already padded).
pub fn pairwise_agreement<S: AsRef<str>>(sequences: &[Vec<S>]) -> AgreementMatrix {
    let k = sequences.len();
    let labels = (0..k).map(|i| format!("Worker {}", i + 1)).collect();

    let mut values = vec![vec![0.0; k]; k];
    let mut pair_labels = Vec::with_capacity(k * k.saturating_sub(1) / 2);
    let mut pair_agreements = Vec::with_capacity(pair_labels.capacity());

    for i in 0..k {
        values[i][i] = 1.0;
        for j in (i + 1)..k {
            let rate = exact_match_rate(&sequences[i], &sequences[j]);
            values[i][j] = rate;
            values[j][i] = rate;
            pair_labels.push(format!("W{}\u{2013}W{}", i + 1, j + 1));
            pair_agreements.push(rate);
        }
    }

    AgreementMatrix {
        labels,
        values,
        pair_labels,
        pair_agreements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_kappa_identical_multi_category_is_one() {
        let x = seq(&["Bug", "Billing", "Bug", "Feature"]);
        assert_eq!(cohen_kappa(&x, &x), 1.0);
    }

    #[test]
    fn test_kappa_empty_is_nan() {
        let empty: Vec<String> = Vec::new();
        assert!(cohen_kappa(&empty, &empty).is_nan());
    }

    #[test]
    fn test_kappa_length_mismatch_is_nan() {
        assert!(cohen_kappa(&seq(&["A", "B"]), &seq(&["A"])).is_nan());
    }

    #[test]
    fn test_kappa_single_category_is_nan() {
        let x = seq(&["A", "A", "A"]);
        assert!(cohen_kappa(&x, &x).is_nan());
    }

    #[test]
    fn test_kappa_known_value() {
        // po = 0.5; pe = 0.5*0.5 + 0.5*0.5 = 0.5 -> kappa 0
        let a = seq(&["A", "A", "B", "B"]);
        let b = seq(&["A", "B", "A", "B"]);
        assert!(cohen_kappa(&a, &b).abs() < 1e-12);

        // perfect disagreement on balanced labels -> -1
        let c = seq(&["A", "B"]);
        let d = seq(&["B", "A"]);
        assert!((cohen_kappa(&c, &d) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_kappa_uses_each_raters_own_marginals() {
        // a: A=3,B=1  b: A=2,B=2  po = 3/4
        // pe = 3/4*2/4 + 1/4*2/4 = 0.5  -> kappa = 0.5
        let a = seq(&["A", "A", "A", "B"]);
        let b = seq(&["A", "A", "B", "B"]);
        assert!((cohen_kappa(&a, &b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_kappa_with_padding_tokens() {
        let a = seq(&["Bug", "Billing", ""]);
        let b = seq(&["Bug", "Billing", "Urgent"]);
        let k = cohen_kappa(&a, &b);
        assert!(k > 0.0 && k < 1.0);
    }

    #[test]
    fn test_interpret_kappa_bands() {
        assert_eq!(interpret_kappa(f64::NAN), "N/A");
        assert_eq!(interpret_kappa(-0.1), "Poor");
        assert_eq!(interpret_kappa(0.0), "Slight");
        assert_eq!(interpret_kappa(0.19), "Slight");
        assert_eq!(interpret_kappa(0.2), "Fair");
        assert_eq!(interpret_kappa(0.4), "Moderate");
        assert_eq!(interpret_kappa(0.6), "Substantial");
        assert_eq!(interpret_kappa(0.79), "Substantial");
        assert_eq!(interpret_kappa(0.8), "Almost Perfect");
        assert_eq!(interpret_kappa(1.0), "Almost Perfect");
    }

    #[test]
    fn test_exact_match_rate() {
        let a = seq(&["A", "B", "C", "D"]);
        let b = seq(&["A", "X", "C", "Y"]);
        assert_eq!(exact_match_rate(&a, &b), 0.5);
        assert_eq!(exact_match_rate(&a, &seq(&["A"])), 0.0);
        let empty: Vec<String> = Vec::new();
        assert_eq!(exact_match_rate(&empty, &empty), 0.0);
    }

    #[test]
    fn test_pairwise_three_raters() {
        let m = pairwise_agreement(&[
            seq(&["A", "B"]),
            seq(&["A", "C"]),
            seq(&["A", "B"]),
        ]);

        assert_eq!(m.labels, vec!["Worker 1", "Worker 2", "Worker 3"]);
        assert_eq!(m.pair_labels, vec!["W1–W2", "W1–W3", "W2–W3"]);
        assert_eq!(m.pair_agreements, vec![0.5, 1.0, 0.5]);
        for i in 0..3 {
            assert_eq!(m.values[i][i], 1.0);
            for j in 0..3 {
                assert_eq!(m.values[i][j], m.values[j][i]);
            }
        }
    }

    #[test]
    fn test_pairwise_diagonal_is_one_even_for_empty_sequences() {
        let empty: Vec<String> = Vec::new();
        let m = pairwise_agreement(&[empty.clone(), empty]);
        assert_eq!(m.values, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(m.pair_labels.len(), 1);
    }

    #[test]
    fn test_pair_count_formula() {
        for k in 0..6 {
            let seqs: Vec<Vec<String>> = (0..k).map(|i| seq(&[i.to_string().as_str()])).collect();
            let m = pairwise_agreement(&seqs);
            assert_eq!(m.labels.len(), k);
            assert_eq!(m.pair_labels.len(), k * k.saturating_sub(1) / 2);
            assert_eq!(m.values.len(), k);
        }
    }

    #[test]
    fn test_matrix_serializes_camel_case() {
        let m = pairwise_agreement(&[seq(&["A"]), seq(&["A"])]);
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("pairLabels").is_some());
        assert!(json.get("pairAgreements").is_some());
    }
}
