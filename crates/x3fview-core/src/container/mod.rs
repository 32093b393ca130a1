//! X3F container reader.
//!
//! Locates the embedded JPEG preview of a Sigma/Foveon X3F raw file without
//! decoding any sensor data.
//!
//! # Example
//!
//! ```ignore
//! use x3fview_core::container;
//!
//! let (locator, jpeg) = container::extract_embedded_jpeg(Path::new("DSC0001.X3F"))?;
//! println!("{} byte preview at {}", locator.size, locator.offset);
//! ```

mod reader;
mod types;

pub use reader::{
    extract_embedded_jpeg, is_x3f_file, le_uint, locate_embedded_jpeg, open, open_file,
    read_embedded_jpeg,
};
pub use types::{
    tag_to_string, Container, ContainerError, DirectoryEntry, DirectoryRecord, EntryError,
    ImageSectionHeader, JpegLocator, SectionHeader, HEADER_MAGIC, IMAGE_DATA_FORMAT_JPEG,
    IMAGE_DATA_TYPE_JPEG, IMAGE_HEADER_LEN, SECTION_IMAGE,
};
