use thiserror::Error;

/// Errors produced by the capture and recording pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The platform refused to list capture endpoints
    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    /// The user (or platform policy) refused access to a device
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The requested device is missing, busy or produced no usable track
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Constraints cannot be satisfied by any device
    #[error("Constraints cannot be satisfied: {0}")]
    Overconstrained(String),

    /// None of the preferred codecs can be used on this platform
    #[error("No supported codec (tried: {0})")]
    CodecUnsupported(String),

    /// The recording finished without producing any data
    #[error("Recording produced no data")]
    EmptyRecording,

    /// An operation was called in the wrong lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Encoder failure: {0}")]
    Encoder(String),

    #[error("Draw failed: {0}")]
    Draw(String),

    /// The UI container could not be mounted or released
    #[error("UI container error: {0}")]
    Container(String),

    /// The save collaborator rejected the artifact
    #[error("Artifact delivery failed: {0}")]
    Delivery(String),
}

impl CaptureError {
    /// Acquisition failures need fresh user interaction before a retry can succeed
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(
            self,
            CaptureError::PermissionDenied(_)
                | CaptureError::DeviceUnavailable(_)
                | CaptureError::Overconstrained(_)
        )
    }

    /// Whether the error should be shown to the user
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, CaptureError::EmptyRecording | CaptureError::Draw(_))
    }
}

pub type CaptureResult<T> = std::result::Result<T, CaptureError>;
