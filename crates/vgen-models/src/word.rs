//! Word-level timestamps and timelines.
//!
//! A [`WordTimeline`] is the timing artifact shared by the audio stage, the
//! render stage (caption burn-in) and the sync quality rater. Words carry
//! both their display spelling and a normalized form used for fuzzy matching.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Word timestamp construction/validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WordError {
    #[error("Word timestamp start ({start}s) is after end ({end}s)")]
    StartAfterEnd { start: f64, end: f64 },

    #[error("Word timestamp offsets must be finite and non-negative")]
    InvalidOffset,

    #[error("Timeline start times must be monotonically non-decreasing (word {index} starts at {start}s, previous at {previous}s)")]
    NonMonotonic { index: usize, start: f64, previous: f64 },
}

/// How a timeline's timing was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TimestampSource {
    /// Word-level ASR transcription.
    Whisper,
    /// Rule-based spoken-rate estimation.
    Estimation,
    /// Phoneme-level forced alignment.
    Aeneas,
}

impl TimestampSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampSource::Whisper => "whisper",
            TimestampSource::Estimation => "estimation",
            TimestampSource::Aeneas => "aeneas",
        }
    }
}

impl fmt::Display for TimestampSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single word with its spoken time span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WordTimestamp {
    /// Display spelling of the word.
    pub word: String,
    /// Normalized form used for matching (see [`normalize_word`]).
    pub normalized: String,
    /// Start offset in seconds.
    pub start_secs: f64,
    /// End offset in seconds.
    pub end_secs: f64,
}

impl WordTimestamp {
    /// Create a word timestamp, validating the time span.
    pub fn new(word: impl Into<String>, start_secs: f64, end_secs: f64) -> Result<Self, WordError> {
        if !start_secs.is_finite() || !end_secs.is_finite() || start_secs < 0.0 || end_secs < 0.0 {
            return Err(WordError::InvalidOffset);
        }
        if start_secs > end_secs {
            return Err(WordError::StartAfterEnd {
                start: start_secs,
                end: end_secs,
            });
        }
        let word = word.into();
        let normalized = normalize_word(&word);
        Ok(Self {
            word,
            normalized,
            start_secs,
            end_secs,
        })
    }

    /// Replace the display spelling, re-deriving the normalized form and
    /// keeping the timing untouched.
    pub fn with_spelling(&self, word: impl Into<String>) -> Self {
        let word = word.into();
        let normalized = normalize_word(&word);
        Self {
            word,
            normalized,
            start_secs: self.start_secs,
            end_secs: self.end_secs,
        }
    }

    /// Duration of the spoken word in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// An ordered word timeline with its derivation source and confidence.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WordTimeline {
    /// Words in spoken order.
    pub words: Vec<WordTimestamp>,
    /// How the timing was derived.
    pub source: TimestampSource,
    /// Confidence in the timing, clamped to [0, 1].
    pub confidence: f64,
}

impl WordTimeline {
    /// Create a timeline, clamping confidence to [0, 1].
    pub fn new(words: Vec<WordTimestamp>, source: TimestampSource, confidence: f64) -> Self {
        Self {
            words,
            source,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Validate that start times never decrease.
    pub fn validate(&self) -> Result<(), WordError> {
        for (i, pair) in self.words.windows(2).enumerate() {
            if pair[1].start_secs < pair[0].start_secs {
                return Err(WordError::NonMonotonic {
                    index: i + 1,
                    start: pair[1].start_secs,
                    previous: pair[0].start_secs,
                });
            }
        }
        Ok(())
    }

    /// End of the last word, or 0 for an empty timeline.
    pub fn duration_secs(&self) -> f64 {
        self.words.last().map(|w| w.end_secs).unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }
}

/// Normalize a word for fuzzy matching.
///
/// Lowercases, strips everything that is not alphanumeric, and expands digit
/// runs into spoken English so digit-laden script tokens can match their ASR
/// transcriptions ("10x" normalizes to "tenx", close to ASR "tenex").
pub fn normalize_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut digits = String::new();

    let flush_digits = |digits: &mut String, out: &mut String| {
        if !digits.is_empty() {
            out.push_str(&spell_number(digits));
            digits.clear();
        }
    };

    for c in word.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if c.is_alphanumeric() {
            flush_digits(&mut digits, &mut out);
            for lower in c.to_lowercase() {
                out.push(lower);
            }
        }
        // Non-alphanumerics are dropped without flushing, so "1,000" reads
        // as the single number 1000.
    }
    flush_digits(&mut digits, &mut out);
    out
}

/// Spell a digit run as concatenated English words.
///
/// Values up to 999 are spelled as numbers; longer runs fall back to
/// digit-by-digit names, matching how they tend to be read aloud.
fn spell_number(digits: &str) -> String {
    const ONES: [&str; 20] = [
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
        "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
        "nineteen",
    ];
    const TENS: [&str; 10] = [
        "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
    ];

    fn spell_under_1000(n: u32, out: &mut String) {
        if n >= 100 {
            out.push_str(ONES[(n / 100) as usize]);
            out.push_str("hundred");
            if n % 100 != 0 {
                spell_under_1000(n % 100, out);
            }
        } else if n >= 20 {
            out.push_str(TENS[(n / 10) as usize]);
            if n % 10 != 0 {
                out.push_str(ONES[(n % 10) as usize]);
            }
        } else {
            out.push_str(ONES[n as usize]);
        }
    }

    let mut out = String::new();
    match digits.parse::<u32>() {
        Ok(n) if digits.len() <= 3 => spell_under_1000(n, &mut out),
        _ => {
            for d in digits.chars() {
                out.push_str(ONES[d.to_digit(10).unwrap_or(0) as usize]);
            }
        }
    }
    out
}
