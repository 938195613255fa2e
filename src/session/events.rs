use crate::platform::DisplayRequest;

/// User choices sent with "start recording"
#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    /// What to share (`None` = session default)
    pub display: Option<DisplayRequest>,
    /// Microphone picked in the UI (`None` = session default)
    pub microphone_device_id: Option<String>,
}

/// Signals from the UI collaborator
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Mount the UI, discover devices, start the preview
    Init,
    /// The user clicked "start recording"
    Start(StartRequest),
    /// The user clicked "stop" (or closed the overlay before recording)
    Stop,
}
