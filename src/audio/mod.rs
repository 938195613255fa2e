pub mod frame;
pub mod merger;
pub mod tone;

pub use frame::{AudioFeed, AudioFrame, AudioStreamSource};
pub use merger::{merge_acquired, merge_audio, MergeReport};
pub use tone::ToneGenerator;
