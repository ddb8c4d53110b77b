//! Word-level ASR transcription via the whisper CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use vgen_models::{AsrModel, WordTimestamp};

use crate::error::{SyncError, SyncResult};

/// Produces word-level timestamps from an audio file.
///
/// This is the re-transcription contract used both by the timestamp
/// strategies and by the sync quality rater.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into timestamped words.
    async fn transcribe(&self, audio_path: &Path, model: AsrModel)
        -> SyncResult<Vec<WordTimestamp>>;

    /// Whether the backing tool is installed and usable.
    fn is_available(&self) -> bool;
}

/// Transcriber backed by the OpenAI whisper CLI.
#[derive(Debug, Clone)]
pub struct WhisperCli {
    binary: PathBuf,
    timeout: Duration,
}

impl WhisperCli {
    /// Default per-transcription timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

    /// Create a transcriber around an explicit binary path.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Locate the whisper binary on PATH.
    pub fn discover() -> SyncResult<Self> {
        for candidate in ["whisper", "whisper-cli"] {
            if let Ok(path) = which::which(candidate) {
                debug!(binary = ?path, "Found whisper binary");
                return Ok(Self::new(path));
            }
        }
        Err(SyncError::AsrUnavailable(
            "no whisper binary on PATH (tried 'whisper', 'whisper-cli')".to_string(),
        ))
    }

    /// Override the per-transcription timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    async fn transcribe(
        &self,
        audio_path: &Path,
        model: AsrModel,
    ) -> SyncResult<Vec<WordTimestamp>> {
        if !audio_path.exists() {
            return Err(SyncError::transcription_failed(format!(
                "audio file not found: {}",
                audio_path.display()
            )));
        }

        let out_dir = tempfile::tempdir()?;

        let output = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(&self.binary)
                .arg(audio_path)
                .arg("--model")
                .arg(model.as_str())
                .arg("--output_format")
                .arg("json")
                .arg("--word_timestamps")
                .arg("True")
                .arg("--output_dir")
                .arg(out_dir.path())
                .output(),
        )
        .await
        .map_err(|_| SyncError::Timeout(self.timeout.as_secs()))?
        .map_err(|e| SyncError::transcription_failed(format!("failed to run whisper: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncError::transcription_failed(format!(
                "whisper exited with {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        let json_path = out_dir.path().join(format!("{stem}.json"));
        let content = tokio::fs::read_to_string(&json_path).await.map_err(|e| {
            SyncError::transcription_failed(format!(
                "whisper produced no JSON at {}: {e}",
                json_path.display()
            ))
        })?;

        let parsed: WhisperOutput = serde_json::from_str(&content)?;
        let mut words = Vec::new();
        for segment in parsed.segments {
            for w in segment.words.unwrap_or_default() {
                let text = w.word.trim();
                if text.is_empty() {
                    continue;
                }
                // Whisper occasionally emits a hair-inverted span; clamp
                // rather than reject the whole transcript.
                let end = w.end.max(w.start);
                words.push(WordTimestamp::new(text, w.start, end)?);
            }
        }

        if words.is_empty() {
            warn!(audio = ?audio_path, "Whisper returned no word timestamps");
        }
        Ok(words)
    }

    fn is_available(&self) -> bool {
        self.binary.exists() || which::which(&self.binary).is_ok()
    }
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    words: Option<Vec<WhisperWord>>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}
