//! Recording: codec selection, chunk collection and artifact assembly
//!
//! The recorder owns the ordered chunk sequence for one recording. Chunks flow
//! from the platform encoder over a channel into a single collector task, so
//! appends and the final read never race.

mod artifact;
mod codec;
mod recorder;
mod sink;
mod state;

pub use artifact::{Artifact, EncodedChunk, DEFAULT_FILE_NAME};
pub use codec::{select_codec, Codec};
pub use recorder::{Recorder, RecorderConfig, StopHandle};
pub use sink::{ArtifactSink, DirectorySink, MemorySink};
pub use state::RecorderState;
