//! The load pipeline for one file: container → JPEG bytes → bitmap.

use std::fs::File;
use std::path::Path;

use thiserror::Error;

use crate::container::{self, ContainerError, JpegLocator};
use crate::decode::{DecodeError, DecodedImage, PreviewDecoder};

/// Errors from loading a preview. All are confined to the one file.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Failed to open {path}: {message}")]
    Open { path: String, message: String },

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A decoded preview and where it came from.
#[derive(Debug, Clone)]
pub struct Preview {
    pub locator: JpegLocator,
    pub image: DecodedImage,
}

/// Read the embedded JPEG of `path` and decode it.
///
/// The file is opened, parsed and read within this call and closed before
/// decoding starts, whatever the outcome.
pub fn load_preview(path: &Path, decoder: &dyn PreviewDecoder) -> Result<Preview, PreviewError> {
    let (locator, jpeg) = read_preview_bytes(path)?;
    let image = decoder.decode(&jpeg)?;
    log::debug!(
        "Decoded {} with {}: {}x{}",
        path.display(),
        decoder.name(),
        image.width,
        image.height
    );
    Ok(Preview { locator, image })
}

/// Read the raw bytes of the embedded JPEG of `path`.
pub fn read_preview_bytes(path: &Path) -> Result<(JpegLocator, Vec<u8>), PreviewError> {
    let mut file = File::open(path).map_err(|e| PreviewError::Open {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let locator = container::locate_embedded_jpeg(&mut file)?;
    let jpeg = container::read_embedded_jpeg(&mut file, &locator)?;
    Ok((locator, jpeg))
}
