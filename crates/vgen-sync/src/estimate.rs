//! Rule-based word timing estimation.
//!
//! Fallback for the `standard` strategy when no ASR transcriber is
//! installed. Words are spread across the known audio duration (or a
//! duration derived from an assumed spoken rate) proportionally to their
//! length, with a fixed inter-word gap.

use vgen_models::{normalize_word, TimestampSource, WordTimeline, WordTimestamp};

/// Assumed spoken rate when the audio duration is unknown.
pub const DEFAULT_WORDS_PER_MINUTE: f64 = 150.0;

/// Silence assumed between consecutive words, in seconds.
const INTER_WORD_GAP_SECS: f64 = 0.05;

/// Confidence reported for estimated timelines.
const ESTIMATION_CONFIDENCE: f64 = 0.35;

/// Estimate a word timeline for a script.
///
/// When `audio_duration_secs` is known, words are fit into it; otherwise the
/// total duration is derived from [`DEFAULT_WORDS_PER_MINUTE`].
pub fn estimate_timeline(script: &str, audio_duration_secs: Option<f64>) -> WordTimeline {
    let tokens: Vec<&str> = script.split_whitespace().collect();
    if tokens.is_empty() {
        return WordTimeline::new(Vec::new(), TimestampSource::Estimation, ESTIMATION_CONFIDENCE);
    }

    let total_secs = match audio_duration_secs {
        Some(d) if d > 0.0 => d,
        _ => tokens.len() as f64 / DEFAULT_WORDS_PER_MINUTE * 60.0,
    };

    let gap_total = INTER_WORD_GAP_SECS * (tokens.len().saturating_sub(1)) as f64;
    let speech_secs = (total_secs - gap_total).max(total_secs * 0.5);

    // Weight each word by its normalized character count so long words get
    // proportionally more time. Words that normalize to nothing (pure
    // punctuation) still get a minimal weight.
    let weights: Vec<f64> = tokens
        .iter()
        .map(|t| normalize_word(t).chars().count().max(1) as f64)
        .collect();
    let weight_sum: f64 = weights.iter().sum();

    let mut words = Vec::with_capacity(tokens.len());
    let mut cursor = 0.0;
    for (token, weight) in tokens.iter().zip(weights.iter()) {
        let duration = speech_secs * weight / weight_sum;
        let start = cursor;
        let end = cursor + duration;
        words.push(WordTimestamp {
            word: (*token).to_string(),
            normalized: normalize_word(token),
            start_secs: start,
            end_secs: end,
        });
        cursor = end + INTER_WORD_GAP_SECS;
    }

    WordTimeline::new(words, TimestampSource::Estimation, ESTIMATION_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_script() {
        let timeline = estimate_timeline("", None);
        assert!(timeline.is_empty());
        assert_eq!(timeline.source, TimestampSource::Estimation);
    }

    #[test]
    fn test_words_fit_known_duration() {
        let timeline = estimate_timeline("one two three four", Some(4.0));
        assert_eq!(timeline.len(), 4);
        assert!(timeline.duration_secs() <= 4.0 + 1e-9);
        assert!(timeline.validate().is_ok());
    }

    #[test]
    fn test_longer_words_get_more_time() {
        let timeline = estimate_timeline("a extraordinarily", Some(2.0));
        let short = timeline.words[0].duration_secs();
        let long = timeline.words[1].duration_secs();
        assert!(long > short);
    }

    #[test]
    fn test_unknown_duration_uses_spoken_rate() {
        // 150 words at 150 wpm should land near a minute.
        let script = vec!["word"; 150].join(" ");
        let timeline = estimate_timeline(&script, None);
        assert!((timeline.duration_secs() - 60.0).abs() < 5.0);
    }

    #[test]
    fn test_monotonic_and_gapped() {
        let timeline = estimate_timeline("alpha beta gamma", Some(3.0));
        for pair in timeline.words.windows(2) {
            assert!(pair[1].start_secs > pair[0].end_secs);
        }
    }
}
