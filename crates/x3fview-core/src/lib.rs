//! x3fview Core - preview extraction and viewing model
//!
//! This crate reads Sigma/Foveon X3F containers, locates the JPEG preview
//! they embed, decodes it, and holds the state of a one-image-at-a-time
//! viewer: file navigation, quarter-turn rotation, fit / 1:1 zoom and panning.
//!
//! Nothing here touches a window system. Front-ends drive a [`SessionState`],
//! hand its [`LoadTicket`]s to a [`PreviewLoader`] and paint the
//! [`Layout`] it returns.

pub mod config;
pub mod container;
pub mod decode;
pub mod loader;
pub mod preview;
pub mod services;
pub mod session;
#[cfg(any(test, feature = "test-util"))]
pub mod test_support;
pub mod transform;
pub mod viewport;

pub use config::{parse_viewport, ConfigError, ViewerConfig};
pub use container::{
    extract_embedded_jpeg, is_x3f_file, locate_embedded_jpeg, Container, ContainerError,
    JpegLocator,
};
pub use decode::{select_decoder, DecodeError, DecodedImage, DecoderChoice, PreviewDecoder};
pub use loader::{LoadResult, PreviewLoader};
pub use preview::{load_preview, Preview, PreviewError};
pub use services::{DirectoryListing, ExportJob, ExportKind, ExportQueue, Quarantine};
pub use session::{Layout, LoadTicket, SessionError, SessionState, ZoomMode};
pub use transform::rotate_quarters;
pub use viewport::{compute_fit, orientation, ImageOrientation, ViewportError, ViewportFitResult};
