use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::SessionState;
use crate::compositor::CompositorStats;

/// How the session's recording ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RecordingOutcome {
    /// No recording was started
    NotRecorded,
    /// Artifact handed to the save collaborator
    Saved {
        file_name: String,
        media_type: String,
        size_bytes: usize,
        chunk_count: usize,
    },
    /// Recording finished without data; nothing to save
    Empty,
    Failed { error: String },
}

/// Statistics about a capture session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub session_id: String,

    pub state: SessionState,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// When recording began, if it did
    pub recording_started_at: Option<DateTime<Utc>>,

    /// Non-empty chunks collected by the recorder
    pub chunks_count: usize,

    /// Recording continued without any audio track
    pub audio_degraded: bool,

    pub compositor: CompositorStats,

    pub outcome: RecordingOutcome,

    /// Failures encountered while tearing down
    pub teardown_errors: Vec<String>,
}
