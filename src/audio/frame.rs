use tokio::sync::mpsc;

/// Where an audio track's samples come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioStreamSource {
    /// System / tab audio carried by a display share
    System,
    /// Microphone input
    Microphone,
}

/// One buffer delivered on an audio track, in the order it was captured.
///
/// The encoder writes these as-is; nothing in the pipeline resamples them.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Interleaved signed 16-bit PCM
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Offset of the first sample from the start of the track
    pub timestamp_ms: u64,
    /// Microphone or the display share's system audio
    pub source: AudioStreamSource,
}

impl AudioFrame {
    /// Playback length of the buffer
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let per_channel = self.samples.len() as u64 / self.channels as u64;
        per_channel * 1000 / self.sample_rate as u64
    }
}

/// Reader side of an audio track; frames arrive in capture order
pub type AudioFeed = mpsc::Receiver<AudioFrame>;
