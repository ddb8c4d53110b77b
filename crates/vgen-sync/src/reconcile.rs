//! Reconciliation of ASR word streams against the canonical script.
//!
//! ASR frequently mis-recognizes domain terms ("10x" comes back as "tenex").
//! Reconciliation walks the ASR stream in timestamp order and realigns each
//! recognized word to a local window of script words by normalized
//! Levenshtein similarity, substituting the script's canonical spelling while
//! keeping the ASR-derived timing. Unmatched ASR words pass through as-is;
//! unmatched script words are never inserted, so no synthetic timing is ever
//! invented.

use vgen_models::WordTimestamp;

/// Configuration for the reconciliation matcher.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Minimum normalized similarity for a match.
    pub similarity_threshold: f64,
    /// Number of upcoming script words considered for each ASR word.
    pub window: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            window: 5,
        }
    }
}

/// Normalized Levenshtein similarity between two already-normalized words.
///
/// Defined as `1 - editDistance / max(len)`. Two empty strings are an exact
/// match (1.0); if only one side is empty the similarity is 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Realign an ASR word stream to the canonical script.
///
/// Greedy, local, left-to-right: the script cursor only moves forward, and
/// ties among equally similar window candidates resolve to the candidate
/// nearest the cursor (nearest in time, since both streams are ordered).
/// Reconciling an already-reconciled stream against the same script is a
/// no-op.
pub fn reconcile(
    asr_words: &[WordTimestamp],
    script: &str,
    config: &ReconcileConfig,
) -> Vec<WordTimestamp> {
    let script_words: Vec<&str> = script
        .split_whitespace()
        .filter(|t| !vgen_models::normalize_word(t).is_empty())
        .collect();
    let script_normalized: Vec<String> = script_words
        .iter()
        .map(|t| vgen_models::normalize_word(t))
        .collect();

    let mut out = Vec::with_capacity(asr_words.len());
    let mut cursor = 0usize;

    for asr in asr_words {
        if asr.normalized.is_empty() || cursor >= script_words.len() {
            out.push(asr.clone());
            continue;
        }

        let window_end = (cursor + config.window).min(script_words.len());
        let mut best: Option<(usize, f64)> = None;
        for idx in cursor..window_end {
            let sim = similarity(&asr.normalized, &script_normalized[idx]);
            // Strict > keeps the earliest candidate on ties.
            if best.map_or(true, |(_, best_sim)| sim > best_sim) {
                best = Some((idx, sim));
            }
        }

        match best {
            Some((idx, sim)) if sim >= config.similarity_threshold => {
                out.push(asr.with_spelling(script_words[idx]));
                cursor = idx + 1;
            }
            _ => out.push(asr.clone()),
        }
    }

    out
}

/// Count of words whose spelling was repaired by reconciliation.
pub fn repaired_count(before: &[WordTimestamp], after: &[WordTimestamp]) -> usize {
    before
        .iter()
        .zip(after.iter())
        .filter(|(b, a)| b.word != a.word)
        .count()
}
