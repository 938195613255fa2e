use serde::Serialize;
use std::fmt;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    /// Nothing acquired yet
    Idle,
    /// Devices acquired, compositor running
    Ready,
    /// Waiting for the user to pick what to share
    AwaitingSelection,
    Recording,
    /// Recording collected and handed off
    Finalized,
    /// Every resource released
    TornDown,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Ready => "ready",
            SessionState::AwaitingSelection => "awaiting-selection",
            SessionState::Recording => "recording",
            SessionState::Finalized => "finalized",
            SessionState::TornDown => "torn-down",
        };
        f.write_str(name)
    }
}
