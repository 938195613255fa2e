//! Media primitives shared by every stage of the pipeline
//!
//! - Device descriptors and capture constraints
//! - Tracks and their stop/ended control
//! - Stream handles and the combined stream handed to the encoder

mod device;
mod stream;
mod track;

pub use device::{CaptureConstraints, DeviceDescriptor, DeviceKind, DeviceList, Range};
pub use stream::{CombinedStream, MediaStreamHandle};
pub use track::{MediaTrack, TrackControl, TrackFeed, TrackKind};
