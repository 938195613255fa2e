use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::codec::Codec;
use crate::error::{CaptureError, CaptureResult};

/// File name given to the artifact unless configured otherwise
pub const DEFAULT_FILE_NAME: &str = "test.webm";

/// One unit of encoded data emitted by the encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChunk {
    /// Emission order assigned by the encoder
    pub index: u64,
    pub data: Vec<u8>,
}

impl EncodedChunk {
    pub fn new(index: u64, data: Vec<u8>) -> Self {
        Self { index, data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The finished recording, produced once per recording session
#[derive(Clone, Serialize)]
pub struct Artifact {
    pub file_name: String,
    /// Container media type, e.g. `video/webm`
    pub media_type: String,
    pub codec: Codec,
    pub chunk_count: usize,
    pub size_bytes: usize,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Concatenate chunks in the order given.
    ///
    /// Fails with `EmptyRecording` when there is nothing to concatenate.
    pub fn assemble(file_name: impl Into<String>, codec: Codec, chunks: Vec<EncodedChunk>) -> CaptureResult<Self> {
        if chunks.is_empty() {
            return Err(CaptureError::EmptyRecording);
        }

        let size: usize = chunks.iter().map(|c| c.data.len()).sum();
        let mut bytes = Vec::with_capacity(size);
        for chunk in &chunks {
            bytes.extend_from_slice(&chunk.data);
        }

        Ok(Self {
            file_name: file_name.into(),
            media_type: codec.container().to_string(),
            codec,
            chunk_count: chunks.len(),
            size_bytes: size,
            created_at: Utc::now(),
            bytes,
        })
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("codec", &self.codec)
            .field("chunk_count", &self.chunk_count)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_concatenates_in_order() {
        let chunks = vec![
            EncodedChunk::new(0, b"abc".to_vec()),
            EncodedChunk::new(1, b"de".to_vec()),
            EncodedChunk::new(2, b"f".to_vec()),
        ];

        let artifact = Artifact::assemble(DEFAULT_FILE_NAME, Codec::Vp8, chunks).unwrap();

        assert_eq!(artifact.bytes, b"abcdef");
        assert_eq!(artifact.size_bytes, 6);
        assert_eq!(artifact.chunk_count, 3);
        assert_eq!(artifact.media_type, "video/webm");
        assert_eq!(artifact.file_name, "test.webm");
    }

    #[test]
    fn test_assemble_without_chunks_is_empty_recording() {
        let result = Artifact::assemble(DEFAULT_FILE_NAME, Codec::Vp9, Vec::new());
        assert_eq!(result.unwrap_err(), CaptureError::EmptyRecording);
    }

    #[test]
    fn test_metadata_serialization_skips_bytes() {
        let artifact = Artifact::assemble("out.webm", Codec::Vp9, vec![EncodedChunk::new(0, vec![1, 2])]).unwrap();
        let json = serde_json::to_value(&artifact).unwrap();

        assert_eq!(json["file_name"], "out.webm");
        assert_eq!(json["media_type"], "video/webm");
        assert_eq!(json["codec"], "vp9");
        assert!(json.get("bytes").is_none());
    }
}
