pub mod frame;
pub mod layout;
pub mod surface;

pub use frame::{video_channel, Resolution, VideoFeed, VideoFrame, VideoPublisher};
pub use layout::{PipLayout, Rect};
pub use surface::Surface;
