//! Preview decoding.
//!
//! This module provides:
//! - A decoder interface with an `image` crate backend and an optional
//!   libjpeg-turbo backend
//! - EXIF orientation handling for embedded previews
//! - Display resizing driven by the viewport fit model
//!
//! All operations are synchronous; the [`crate::loader`] module runs them on a
//! worker thread when the caller must not block.

mod backend;
mod jpeg;
mod resize;
mod types;

#[cfg(feature = "turbo")]
pub use backend::TurboDecoder;
pub use backend::{select_decoder, turbo_available, DecoderChoice, GenericDecoder, PreviewDecoder};
pub use jpeg::{decode_jpeg, is_jpeg_data, orient, read_orientation};
pub use resize::{render_fit, resize};
pub use types::{DecodeError, DecodedImage, FilterType, Orientation};

#[cfg(test)]
pub(crate) use jpeg::tests::MINIMAL_JPEG;
