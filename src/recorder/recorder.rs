use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::artifact::{Artifact, EncodedChunk, DEFAULT_FILE_NAME};
use super::codec::{select_codec, Codec};
use super::state::RecorderState;
use crate::error::{CaptureError, CaptureResult};
use crate::media::CombinedStream;
use crate::platform::{MediaEncoder, MediaPlatform};

/// Recorder configuration
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Name given to the finished artifact
    pub file_name: String,
    /// How often the encoder emits a chunk (`None` = one chunk at stop)
    pub timeslice: Option<Duration>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            timeslice: Some(Duration::from_secs(1)),
        }
    }
}

/// Shared, idempotent way to end a recording.
///
/// User stop and upstream termination both go through here; only the first
/// call while recording has any effect.
#[derive(Debug, Clone)]
pub struct StopHandle {
    token: CancellationToken,
    state: watch::Receiver<RecorderState>,
}

impl StopHandle {
    /// Request stop. Returns `true` if this call initiated it.
    pub fn stop(&self) -> bool {
        if self.token.is_cancelled() || *self.state.borrow() != RecorderState::Recording {
            return false;
        }
        self.token.cancel();
        true
    }
}

/// Encodes a combined stream and turns the collected chunks into one artifact
pub struct Recorder {
    platform: Arc<dyn MediaPlatform>,
    config: RecorderConfig,
    state_tx: watch::Sender<RecorderState>,
    stop_token: CancellationToken,
    armed: Option<CombinedStream>,
    codec: Option<Codec>,
    chunks_received: Arc<AtomicUsize>,
    driver: Option<JoinHandle<CaptureResult<Artifact>>>,
}

impl Recorder {
    pub fn new(platform: Arc<dyn MediaPlatform>, config: RecorderConfig) -> Self {
        let (state_tx, _) = watch::channel(RecorderState::Idle);

        Self {
            platform,
            config,
            state_tx,
            stop_token: CancellationToken::new(),
            armed: None,
            codec: None,
            chunks_received: Arc::new(AtomicUsize::new(0)),
            driver: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        *self.state_tx.borrow()
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> watch::Receiver<RecorderState> {
        self.state_tx.subscribe()
    }

    pub fn codec(&self) -> Option<&Codec> {
        self.codec.as_ref()
    }

    /// Non-empty chunks collected so far
    pub fn chunk_count(&self) -> usize {
        self.chunks_received.load(Ordering::SeqCst)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            token: self.stop_token.clone(),
            state: self.state_tx.subscribe(),
        }
    }

    /// Attach the combined stream and choose a codec
    pub fn arm(&mut self, stream: CombinedStream) -> CaptureResult<Codec> {
        if self.state() != RecorderState::Idle {
            return Err(CaptureError::InvalidState(format!(
                "cannot arm recorder while {}",
                self.state()
            )));
        }

        let codec = select_codec(self.platform.as_ref())?;

        info!(
            "Recorder armed: {} for stream {} ({} video, {} audio tracks)",
            codec,
            stream.id(),
            stream.video_track_count(),
            stream.audio_track_count()
        );

        self.armed = Some(stream);
        self.codec = Some(codec.clone());
        self.state_tx.send_replace(RecorderState::Armed);

        Ok(codec)
    }

    /// Start the encoder and begin collecting chunks
    pub async fn start(&mut self) -> CaptureResult<()> {
        let (Some(stream), Some(codec)) = (self.armed.take(), self.codec.clone()) else {
            return Err(CaptureError::InvalidState(format!(
                "cannot start recorder while {}",
                self.state()
            )));
        };

        let started = async {
            let mut encoder = self.platform.create_encoder(&codec, self.config.timeslice)?;
            let chunk_rx = encoder.start(stream).await?;
            Ok::<_, CaptureError>((encoder, chunk_rx))
        }
        .await;

        let (encoder, chunk_rx) = match started {
            Ok(parts) => parts,
            Err(e) => {
                error!("Failed to start encoder: {}", e);
                self.state_tx.send_replace(RecorderState::Idle);
                return Err(e);
            }
        };

        self.state_tx.send_replace(RecorderState::Recording);
        info!("Recording started with {} ({} encoder)", codec, encoder.name());

        let driver = ChunkCollector {
            encoder,
            chunk_rx,
            stop: self.stop_token.clone(),
            state_tx: self.state_tx.clone(),
            chunks_received: Arc::clone(&self.chunks_received),
            file_name: self.config.file_name.clone(),
            codec,
        };
        self.driver = Some(tokio::spawn(driver.run()));

        Ok(())
    }

    /// Request stop; duplicate calls are no-ops
    pub fn stop(&self) -> bool {
        self.stop_handle().stop()
    }

    /// Wait for finalization and take the artifact.
    ///
    /// Yields `EmptyRecording` when no chunk was collected. The artifact can be
    /// taken only once.
    pub async fn finished(&mut self) -> CaptureResult<Artifact> {
        let driver = self
            .driver
            .as_mut()
            .ok_or_else(|| CaptureError::InvalidState("recorder has no active recording".to_string()))?;

        let result = match driver.await {
            Ok(result) => result,
            Err(e) => Err(CaptureError::Encoder(format!("recorder task failed: {}", e))),
        };
        self.driver = None;

        result
    }

    /// Whether a recording is running or waiting to be collected
    pub fn has_pending_result(&self) -> bool {
        self.driver.is_some()
    }
}

/// Owns the chunk sequence for the duration of one recording
struct ChunkCollector {
    encoder: Box<dyn MediaEncoder>,
    chunk_rx: mpsc::Receiver<EncodedChunk>,
    stop: CancellationToken,
    state_tx: watch::Sender<RecorderState>,
    chunks_received: Arc<AtomicUsize>,
    file_name: String,
    codec: Codec,
}

impl ChunkCollector {
    async fn run(mut self) -> CaptureResult<Artifact> {
        let mut chunks: Vec<EncodedChunk> = Vec::new();
        let mut stopping = false;

        loop {
            tokio::select! {
                biased;

                maybe_chunk = self.chunk_rx.recv() => {
                    match maybe_chunk {
                        Some(chunk) => self.push(&mut chunks, chunk),
                        // Encoder flushed and closed its output
                        None => break,
                    }
                }

                _ = self.stop.cancelled(), if !stopping => {
                    stopping = true;
                    self.state_tx.send_replace(RecorderState::Stopping);
                    info!("Stopping recording, waiting for encoder flush");

                    if let Err(e) = self.encoder.stop().await {
                        error!("Encoder failed to stop cleanly: {}", e);
                        // Keep whatever was already emitted
                        while let Ok(chunk) = self.chunk_rx.try_recv() {
                            self.push(&mut chunks, chunk);
                        }
                        break;
                    }
                }
            }
        }

        if !stopping {
            warn!("Encoder output ended without a stop request");
            self.state_tx.send_replace(RecorderState::Stopping);
            if let Err(e) = self.encoder.stop().await {
                debug!("Encoder stop after close: {}", e);
            }
        }

        info!("Recording finalized: {} chunks", chunks.len());
        self.state_tx.send_replace(RecorderState::Finalized);

        Artifact::assemble(self.file_name, self.codec, chunks)
    }

    fn push(&self, chunks: &mut Vec<EncodedChunk>, chunk: EncodedChunk) {
        if chunk.is_empty() {
            debug!("Dropping empty chunk {}", chunk.index);
            return;
        }
        debug!("Chunk {} received: {} bytes", chunk.index, chunk.data.len());
        chunks.push(chunk);
        self.chunks_received.fetch_add(1, Ordering::SeqCst);
    }
}
