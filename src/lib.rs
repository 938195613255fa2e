pub mod audio;
pub mod capture;
pub mod compositor;
pub mod config;
pub mod error;
pub mod media;
pub mod platform;
pub mod recorder;
pub mod session;
pub mod video;

pub use audio::{merge_acquired, merge_audio, AudioFrame, AudioStreamSource, MergeReport};
pub use capture::{DeviceCatalog, StreamAcquirer, StreamRole};
pub use compositor::{Compositor, CompositorStats, RenderLoop};
pub use config::Config;
pub use error::{CaptureError, CaptureResult};
pub use media::{
    CaptureConstraints, CombinedStream, DeviceDescriptor, DeviceKind, DeviceList, MediaStreamHandle,
    MediaTrack, TrackControl, TrackKind,
};
pub use platform::{DisplayRequest, DisplaySurface, MediaEncoder, MediaPlatform, SyntheticPlatform};
pub use recorder::{Artifact, ArtifactSink, Codec, DirectorySink, MemorySink, Recorder, RecorderState};
pub use session::{
    run_session, LogUi, RecordingOutcome, SessionConfig, SessionController, SessionEvent,
    SessionStats, SessionUi, StartRequest,
};
pub use video::{Resolution, VideoFrame};
