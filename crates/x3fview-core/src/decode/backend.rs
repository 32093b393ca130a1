//! Decoder backends behind a single interface.
//!
//! Two implementations exist: the `image` crate decoder, always available,
//! and a libjpeg-turbo decoder compiled in with the `turbo` feature. One is
//! chosen at start-up with [`select_decoder`] and shared with whatever needs
//! to decode previews.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::jpeg::decode_jpeg;
use super::{DecodeError, DecodedImage};

/// Turns embedded JPEG bytes into an RGB bitmap.
pub trait PreviewDecoder: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Decode a complete JPEG stream.
    fn decode(&self, jpeg: &[u8]) -> Result<DecodedImage, DecodeError>;
}

/// Decoder backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericDecoder;

impl PreviewDecoder for GenericDecoder {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn decode(&self, jpeg: &[u8]) -> Result<DecodedImage, DecodeError> {
        decode_jpeg(jpeg)
    }
}

/// Decoder backed by libjpeg-turbo.
#[cfg(feature = "turbo")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TurboDecoder;

#[cfg(feature = "turbo")]
impl PreviewDecoder for TurboDecoder {
    fn name(&self) -> &'static str {
        "turbo"
    }

    fn decode(&self, jpeg: &[u8]) -> Result<DecodedImage, DecodeError> {
        if !super::jpeg::is_jpeg_data(jpeg) {
            return Err(DecodeError::InvalidFormat);
        }
        let decoded = turbojpeg::decompress(jpeg, turbojpeg::PixelFormat::RGB)
            .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

        // Rows may be padded past width * 3
        let row_len = decoded.width * 3;
        let mut pixels = Vec::with_capacity(row_len * decoded.height);
        for row in decoded.pixels.chunks(decoded.pitch).take(decoded.height) {
            pixels.extend_from_slice(&row[..row_len]);
        }

        let image = DecodedImage::new(decoded.width as u32, decoded.height as u32, pixels);
        super::jpeg::orient(image, super::jpeg::read_orientation(jpeg))
    }
}

/// Which backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderChoice {
    /// Fast backend when compiled in, otherwise generic.
    #[default]
    Auto,
    /// Require the libjpeg-turbo backend.
    Fast,
    /// Always use the `image` crate.
    Generic,
}

impl FromStr for DecoderChoice {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(DecoderChoice::Auto),
            "fast" | "turbo" => Ok(DecoderChoice::Fast),
            "generic" => Ok(DecoderChoice::Generic),
            other => Err(DecodeError::BackendUnavailable(format!(
                "unknown decoder '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DecoderChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecoderChoice::Auto => "auto",
            DecoderChoice::Fast => "fast",
            DecoderChoice::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// Whether the libjpeg-turbo backend was compiled in.
pub const fn turbo_available() -> bool {
    cfg!(feature = "turbo")
}

/// Pick the decoder once at start-up.
///
/// `Auto` falls back to the generic decoder with a warning when the fast
/// backend is missing; `Fast` without it is an error.
pub fn select_decoder(choice: DecoderChoice) -> Result<Arc<dyn PreviewDecoder>, DecodeError> {
    let decoder: Arc<dyn PreviewDecoder> = match choice {
        DecoderChoice::Generic => Arc::new(GenericDecoder),
        DecoderChoice::Fast | DecoderChoice::Auto => match fast_decoder() {
            Some(decoder) => decoder,
            None if choice == DecoderChoice::Auto => {
                log::warn!("libjpeg-turbo decoder not available, preview decoding will be slower");
                Arc::new(GenericDecoder)
            }
            None => {
                return Err(DecodeError::BackendUnavailable(
                    "built without the `turbo` feature".to_string(),
                ))
            }
        },
    };
    log::debug!("Using {} preview decoder", decoder.name());
    Ok(decoder)
}

#[cfg(feature = "turbo")]
fn fast_decoder() -> Option<Arc<dyn PreviewDecoder>> {
    Some(Arc::new(TurboDecoder))
}

#[cfg(not(feature = "turbo"))]
fn fast_decoder() -> Option<Arc<dyn PreviewDecoder>> {
    None
}
