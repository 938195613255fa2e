use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::error::{CaptureError, CaptureResult};
use crate::platform::MediaPlatform;

/// Video codec the encoder will use
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// VP9 in WebM
    Vp9,
    /// VP8 in WebM
    Vp8,
    /// Whatever the platform encoder picks when asked for no codec in particular
    Native { mime_type: String },
}

impl Codec {
    /// Fixed probe order before falling back to the platform default
    pub fn preference_order() -> [Codec; 2] {
        [Codec::Vp9, Codec::Vp8]
    }

    /// Full MIME type including codec parameter
    pub fn mime_type(&self) -> &str {
        match self {
            Codec::Vp9 => "video/webm;codecs=vp9",
            Codec::Vp8 => "video/webm;codecs=vp8",
            Codec::Native { mime_type } => mime_type,
        }
    }

    /// Container media type used for the finished artifact
    pub fn container(&self) -> &str {
        self.mime_type()
            .split(';')
            .next()
            .map(str::trim)
            .unwrap_or_default()
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Probe the platform in preference order: VP9, VP8, then the platform default
pub fn select_codec(platform: &dyn MediaPlatform) -> CaptureResult<Codec> {
    let mut tried = Vec::new();

    for codec in Codec::preference_order() {
        if platform.is_type_supported(codec.mime_type()) {
            info!("Selected codec: {}", codec);
            return Ok(codec);
        }
        debug!("Codec not supported: {}", codec);
        tried.push(codec.mime_type().to_string());
    }

    match platform.default_codec() {
        Some(codec) => {
            info!("Falling back to platform default codec: {}", codec);
            Ok(codec)
        }
        None => {
            tried.push("platform default".to_string());
            Err(CaptureError::CodecUnsupported(tried.join(", ")))
        }
    }
}
