use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::MediaEncoder;
use crate::audio::AudioFrame;
use crate::error::{CaptureError, CaptureResult};
use crate::media::{CombinedStream, TrackFeed};
use crate::recorder::{Codec, EncodedChunk};
use crate::video::{VideoFeed, VideoFrame};

const MAGIC: &[u8] = b"SCAMv1\n";
const VIDEO_RECORD: u8 = b'V';
const AUDIO_RECORD: u8 = b'A';

/// Encoder of the synthetic platform.
///
/// Writes a compact record stream: a header, then one record per composite
/// frame (timestamp, size, pixel digest) and per audio buffer (raw PCM).
/// With a script, each timeslice emits the next scripted payload instead.
pub struct SyntheticEncoder {
    codec: Codec,
    timeslice: Option<Duration>,
    script: Option<VecDeque<Vec<u8>>>,
    stop: CancellationToken,
    started: bool,
}

impl SyntheticEncoder {
    pub fn new(codec: Codec, timeslice: Option<Duration>) -> Self {
        Self {
            codec,
            timeslice,
            script: None,
            stop: CancellationToken::new(),
            started: false,
        }
    }

    /// Emit these payloads, one per timeslice, instead of encoded media
    pub fn with_script(mut self, chunks: impl IntoIterator<Item = Vec<u8>>) -> Self {
        self.script = Some(chunks.into_iter().collect());
        self
    }
}

#[async_trait::async_trait]
impl MediaEncoder for SyntheticEncoder {
    async fn start(&mut self, stream: CombinedStream) -> CaptureResult<mpsc::Receiver<EncodedChunk>> {
        if self.started {
            return Err(CaptureError::InvalidState("encoder already started".to_string()));
        }
        self.started = true;

        let (chunk_tx, chunk_rx) = mpsc::channel(64);
        let (audio_tx, audio_rx) = mpsc::channel::<AudioFrame>(256);
        let mut video = None;

        for track in stream.into_tracks() {
            let label = track.label().to_string();
            match track.into_parts() {
                (_, TrackFeed::Video(feed)) => {
                    if video.is_none() {
                        video = Some(feed);
                    } else {
                        warn!("Ignoring extra video track: {}", label);
                    }
                }
                (_, TrackFeed::Audio(mut rx)) => {
                    let tx = audio_tx.clone();
                    tokio::spawn(async move {
                        while let Some(frame) = rx.recv().await {
                            if tx.send(frame).await.is_err() {
                                break;
                            }
                        }
                    });
                }
            }
        }
        drop(audio_tx);

        info!(
            "Synthetic encoder started: {} (timeslice: {:?})",
            self.codec, self.timeslice
        );

        let task = EncodeTask {
            codec: self.codec.clone(),
            script: self.script.take(),
            video,
            audio_rx,
            chunk_tx,
            stop: self.stop.clone(),
            buffer: Vec::new(),
            next_index: 0,
        };
        tokio::spawn(task.run(self.timeslice));

        Ok(chunk_rx)
    }

    async fn stop(&mut self) -> CaptureResult<()> {
        if !self.started {
            return Err(CaptureError::InvalidState("encoder not started".to_string()));
        }
        self.stop.cancel();
        Ok(())
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

struct EncodeTask {
    codec: Codec,
    script: Option<VecDeque<Vec<u8>>>,
    video: Option<VideoFeed>,
    audio_rx: mpsc::Receiver<AudioFrame>,
    chunk_tx: mpsc::Sender<EncodedChunk>,
    stop: CancellationToken,
    buffer: Vec<u8>,
    next_index: u64,
}

impl EncodeTask {
    async fn run(mut self, timeslice: Option<Duration>) {
        let mut ticker = timeslice.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        self.buffer.extend_from_slice(MAGIC);
        self.buffer.extend_from_slice(self.codec.mime_type().as_bytes());
        self.buffer.push(b'\n');

        let mut video_open = self.video.is_some();
        let mut audio_open = true;

        loop {
            tokio::select! {
                biased;

                _ = self.stop.cancelled() => break,

                _ = next_tick(&mut ticker) => {
                    if !self.emit().await {
                        return;
                    }
                }

                frame = next_video(&mut self.video), if video_open => match frame {
                    Some(frame) => self.write_video(&frame),
                    None => video_open = false,
                },

                frame = self.audio_rx.recv(), if audio_open => match frame {
                    Some(frame) => self.write_audio(&frame),
                    None => audio_open = false,
                },
            }

            if !video_open && !audio_open {
                debug!("All encoder inputs ended");
                break;
            }
        }

        // Final flush; may be empty
        self.emit().await;
        debug!("Synthetic encoder finished after {} chunks", self.next_index);
    }

    /// Send the pending data as one chunk. Returns false once nobody listens.
    async fn emit(&mut self) -> bool {
        let data = match self.script.as_mut() {
            Some(script) => {
                self.buffer.clear();
                script.pop_front().unwrap_or_default()
            }
            None => std::mem::take(&mut self.buffer),
        };

        let chunk = EncodedChunk::new(self.next_index, data);
        self.next_index += 1;

        self.chunk_tx.send(chunk).await.is_ok()
    }

    fn write_video(&mut self, frame: &VideoFrame) {
        self.buffer.push(VIDEO_RECORD);
        self.buffer
            .extend_from_slice(&(frame.timestamp.as_millis() as u64).to_le_bytes());
        self.buffer.extend_from_slice(&frame.width.to_le_bytes());
        self.buffer.extend_from_slice(&frame.height.to_le_bytes());
        self.buffer.extend_from_slice(&digest(&frame.data).to_le_bytes());
    }

    fn write_audio(&mut self, frame: &AudioFrame) {
        self.buffer.push(AUDIO_RECORD);
        self.buffer.extend_from_slice(&frame.timestamp_ms.to_le_bytes());
        self.buffer.extend_from_slice(&frame.sample_rate.to_le_bytes());
        self.buffer.extend_from_slice(&frame.channels.to_le_bytes());
        self.buffer
            .extend_from_slice(&(frame.samples.len() as u32).to_le_bytes());
        for sample in &frame.samples {
            self.buffer.extend_from_slice(&sample.to_le_bytes());
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn next_video(feed: &mut Option<VideoFeed>) -> Option<VideoFrame> {
    match feed {
        Some(feed) => feed.next_frame().await,
        None => None,
    }
}

/// FNV-1a over a sparse sample of the pixel data
fn digest(data: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    data.iter().step_by(61).fold(OFFSET, |hash, byte| {
        (hash ^ *byte as u64).wrapping_mul(PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaStreamHandle, MediaTrack, TrackControl};
    use crate::video::{video_channel, Resolution};

    #[tokio::test(start_paused = true)]
    async fn test_scripted_chunks_follow_timeslice() {
        let (publisher, feed) = video_channel();
        let video = MediaStreamHandle::new()
            .with_track(MediaTrack::video("canvas", TrackControl::new(), feed));

        let mut encoder = SyntheticEncoder::new(Codec::Vp9, Some(Duration::from_secs(1)))
            .with_script(vec![b"c1".to_vec(), b"c2".to_vec()]);
        let mut rx = encoder.start(CombinedStream::new(video)).await.unwrap();

        publisher.publish(VideoFrame::solid(Resolution::new(2, 2), [0; 4], Duration::ZERO));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        encoder.stop().await.unwrap();

        let mut payloads = Vec::new();
        while let Some(chunk) = rx.recv().await {
            payloads.push(chunk.data);
        }

        // Two ticks, then an empty flush
        assert_eq!(payloads, vec![b"c1".to_vec(), b"c2".to_vec(), Vec::new()]);
    }

    #[tokio::test]
    async fn test_encoded_output_starts_with_header() {
        let (publisher, feed) = video_channel();
        let video = MediaStreamHandle::new()
            .with_track(MediaTrack::video("canvas", TrackControl::new(), feed));

        let mut encoder = SyntheticEncoder::new(Codec::Vp8, None);
        let mut rx = encoder.start(CombinedStream::new(video)).await.unwrap();

        publisher.publish(VideoFrame::solid(Resolution::new(2, 2), [9; 4], Duration::ZERO));
        tokio::task::yield_now().await;
        encoder.stop().await.unwrap();

        let chunk = rx.recv().await.unwrap();
        assert!(chunk.data.starts_with(MAGIC));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_digest_differs_for_different_frames() {
        let a = vec![0u8; 1024];
        let b = vec![1u8; 1024];
        assert_ne!(digest(&a), digest(&b));
    }
}
