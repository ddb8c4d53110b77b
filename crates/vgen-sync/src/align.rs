//! Phoneme-level forced alignment via aeneas.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use vgen_models::WordTimestamp;

use crate::error::{SyncError, SyncResult};

/// Produces word timestamps by forced alignment of script text to audio.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ForcedAligner: Send + Sync {
    /// Align the script against the audio, one fragment per word.
    async fn align(&self, audio_path: &Path, script: &str) -> SyncResult<Vec<WordTimestamp>>;

    /// Whether the aligner is installed and usable.
    fn is_available(&self) -> bool;
}

/// Forced aligner backed by the aeneas `execute_task` tool.
///
/// Invoked as `python3 -m aeneas.tools.execute_task` with a plain-text task
/// file containing one word per line, producing a JSON sync map.
#[derive(Debug, Clone)]
pub struct AeneasAligner {
    python: PathBuf,
    timeout: Duration,
}

impl AeneasAligner {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    const TASK_CONFIG: &'static str =
        "task_language=eng|is_text_type=plain|os_task_file_format=json";

    /// Create an aligner around an explicit python interpreter.
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Locate a python interpreter on PATH. Whether aeneas itself is
    /// importable is only known once an alignment is attempted.
    pub fn discover() -> SyncResult<Self> {
        for candidate in ["python3", "python"] {
            if let Ok(path) = which::which(candidate) {
                debug!(python = ?path, "Found python interpreter for aeneas");
                return Ok(Self::new(path));
            }
        }
        Err(SyncError::AlignerUnavailable(
            "no python interpreter on PATH".to_string(),
        ))
    }
}

#[async_trait]
impl ForcedAligner for AeneasAligner {
    async fn align(&self, audio_path: &Path, script: &str) -> SyncResult<Vec<WordTimestamp>> {
        let words: Vec<&str> = script.split_whitespace().collect();
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let work = tempfile::tempdir()?;
        let text_path = work.path().join("script.txt");
        let map_path = work.path().join("syncmap.json");
        tokio::fs::write(&text_path, words.join("\n")).await?;

        let output = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(&self.python)
                .arg("-m")
                .arg("aeneas.tools.execute_task")
                .arg(audio_path)
                .arg(&text_path)
                .arg(Self::TASK_CONFIG)
                .arg(&map_path)
                .output(),
        )
        .await
        .map_err(|_| SyncError::Timeout(self.timeout.as_secs()))?
        .map_err(|e| SyncError::alignment_failed(format!("failed to run aeneas: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No module named") {
                return Err(SyncError::AlignerUnavailable(
                    "aeneas is not importable by the python interpreter".to_string(),
                ));
            }
            return Err(SyncError::alignment_failed(format!(
                "aeneas exited with {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let content = tokio::fs::read_to_string(&map_path).await.map_err(|e| {
            SyncError::alignment_failed(format!("aeneas produced no sync map: {e}"))
        })?;
        let map: SyncMap = serde_json::from_str(&content)?;

        let mut out = Vec::with_capacity(map.fragments.len());
        for fragment in map.fragments {
            let word = fragment.lines.join(" ");
            if word.trim().is_empty() {
                continue;
            }
            let begin: f64 = fragment
                .begin
                .parse()
                .map_err(|_| SyncError::alignment_failed("non-numeric fragment begin"))?;
            let end: f64 = fragment
                .end
                .parse()
                .map_err(|_| SyncError::alignment_failed("non-numeric fragment end"))?;
            out.push(WordTimestamp::new(word.trim(), begin, end.max(begin))?);
        }
        Ok(out)
    }

    fn is_available(&self) -> bool {
        self.python.exists() || which::which(&self.python).is_ok()
    }
}

/// Aeneas JSON sync map. Offsets are decimal strings.
#[derive(Debug, Deserialize)]
struct SyncMap {
    #[serde(default)]
    fragments: Vec<Fragment>,
}

#[derive(Debug, Deserialize)]
struct Fragment {
    begin: String,
    end: String,
    #[serde(default)]
    lines: Vec<String>,
}
