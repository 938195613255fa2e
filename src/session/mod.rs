//! Capture session management
//!
//! This module provides the `SessionController` that manages:
//! - Device discovery and camera acquisition
//! - The picture-in-picture compositor and its render loop
//! - Screen selection, audio merging and recording
//! - Handing the finished artifact to a sink
//! - Ordered, best-effort teardown of every acquired resource

mod config;
mod controller;
mod events;
mod state;
mod stats;
mod ui;

pub use config::SessionConfig;
pub use controller::{run_session, SessionController, TeardownReport};
pub use events::{SessionEvent, StartRequest};
pub use state::SessionState;
pub use stats::{RecordingOutcome, SessionStats};
pub use ui::{LogUi, PreviewSlot, SessionUi};
