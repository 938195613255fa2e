use std::f64::consts::TAU;

use super::frame::{AudioFrame, AudioStreamSource};

/// Sine tone source used by the synthetic microphone
#[derive(Debug, Clone)]
pub struct ToneGenerator {
    frequency_hz: f64,
    sample_rate: u32,
    channels: u16,
    amplitude: i16,
    phase: f64,
}

impl ToneGenerator {
    pub fn new(frequency_hz: f64, sample_rate: u32, channels: u16) -> Self {
        Self {
            frequency_hz,
            sample_rate,
            channels,
            amplitude: i16::MAX / 4,
            phase: 0.0,
        }
    }

    /// Produce the next `duration_ms` of audio; phase carries over between calls
    pub fn next_frame(&mut self, duration_ms: u64, timestamp_ms: u64, source: AudioStreamSource) -> AudioFrame {
        let frames = (self.sample_rate as u64 * duration_ms / 1000) as usize;
        let step = TAU * self.frequency_hz / self.sample_rate as f64;
        let mut samples = Vec::with_capacity(frames * self.channels as usize);

        for _ in 0..frames {
            let value = (self.phase.sin() * self.amplitude as f64) as i16;
            for _ in 0..self.channels {
                samples.push(value);
            }
            self.phase = (self.phase + step) % TAU;
        }

        AudioFrame {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
            timestamp_ms,
            source,
        }
    }
}
