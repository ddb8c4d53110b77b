//! Per-run artifact persistence.
//!
//! When retention is requested, each run leaves a deterministic set of JSON
//! documents in its working directory: `script.json`, `audio.json` (audio +
//! timeline), `visuals.json`, `render.json`, and sync reports when ratings
//! were computed. Nothing else durable is owned by the engine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use vgen_models::{SyncRating, TimestampSource};

use crate::error::PipelineResult;

pub const SCRIPT_FILE: &str = "script.json";
pub const AUDIO_FILE: &str = "audio.json";
pub const VISUALS_FILE: &str = "visuals.json";
pub const RENDER_FILE: &str = "render.json";

/// File name for a run's sync report. `attempt` is the 1-based quality-gate
/// attempt, or `None` for the final report.
pub fn sync_report_file(attempt: Option<u32>) -> String {
    match attempt {
        Some(n) => format!("sync_report_attempt_{n}.json"),
        None => "sync_report.json".to_string(),
    }
}

/// Persisted sync report document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// 1-based quality-gate attempt this rating belongs to.
    pub attempt: u32,
    /// Strategy name the run's timeline was generated with.
    pub strategy: String,
    /// How the timeline's timing was derived.
    pub source: TimestampSource,
    pub rating: SyncRating,
}

/// Write a JSON document into the run directory, returning its path.
pub async fn write_json<T: Serialize>(
    work_dir: &Path,
    file_name: &str,
    value: &T,
) -> PipelineResult<PathBuf> {
    tokio::fs::create_dir_all(work_dir).await?;
    let path = work_dir.join(file_name);
    let body = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(&path, body).await?;
    debug!(path = ?path, "Persisted artifact document");
    Ok(path)
}
