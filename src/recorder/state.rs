use serde::Serialize;
use std::fmt;

/// Recorder lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    /// No stream attached
    Idle,
    /// Stream attached and codec chosen
    Armed,
    /// Encoder running, chunks being collected
    Recording,
    /// Stop requested, waiting for the encoder to flush
    Stopping,
    /// Chunk collection complete
    Finalized,
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecorderState::Idle => "idle",
            RecorderState::Armed => "armed",
            RecorderState::Recording => "recording",
            RecorderState::Stopping => "stopping",
            RecorderState::Finalized => "finalized",
        };
        f.write_str(name)
    }
}
