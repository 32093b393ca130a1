//! Core types for the X3F container.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Magic tag at offset 0 of every X3F file.
pub const HEADER_MAGIC: [u8; 4] = *b"FOVb";

/// Leading tag of an image-section sub-block.
pub const SECTION_IMAGE: [u8; 4] = *b"SECi";

/// `data_type` value of an embedded JPEG stream.
pub const IMAGE_DATA_TYPE_JPEG: u32 = 2;

/// `data_format` value of a JPEG-compressed preview.
pub const IMAGE_DATA_FORMAT_JPEG: u32 = 18;

/// Fixed length of an image-section header (seven 4-byte fields).
pub const IMAGE_HEADER_LEN: u32 = 28;

/// Length of one directory record: offset, size, tag.
pub const DIRECTORY_RECORD_LEN: u64 = 12;

/// Length of the directory table header: tag, version, entry count.
pub const DIRECTORY_HEADER_LEN: u64 = 12;

/// Errors that make a whole container unusable.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The file does not start with the `FOVb` magic.
    #[error("Not a valid X3F file")]
    InvalidFormat,

    /// Not enough bytes for the header, directory pointer or directory table.
    #[error("Truncated X3F file: {0}")]
    Truncated(String),

    /// No image section holds a JPEG preview.
    #[error("No embedded JPEG preview found")]
    NotFound,

    /// The byte source failed for a reason other than running out of data.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors confined to a single directory entry.
///
/// These never abort the directory parse; the entry is kept but carries no
/// usable image header.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum EntryError {
    /// The entry's sub-block header lies (partly) outside the file.
    #[error("Entry header unreadable: {0}")]
    Unreadable(String),

    /// The declared size is smaller than the fixed image header.
    #[error("Entry size {size} is smaller than the image header")]
    NegativeDataSize { size: u32 },

    /// The declared payload extends past the end of the file.
    #[error("Entry payload ends at {end}, past the end of a {file_len} byte file")]
    PayloadPastEnd { end: u64, file_len: u64 },
}

/// One fixed 12-byte record from the directory table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// Absolute byte offset of the entry's sub-block.
    pub offset: u32,
    /// Byte length of the sub-block, including its own header.
    pub size: u32,
    /// Entry kind, e.g. `IMAG`, `PROP`, `CAMF`.
    pub tag: [u8; 4],
}

impl DirectoryRecord {
    /// The tag as text, with non-printable bytes replaced.
    pub fn tag_str(&self) -> String {
        tag_to_string(&self.tag)
    }
}

/// Secondary header of an image-section (`SECi`) entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSectionHeader {
    pub image_format: u32,
    pub data_type: u32,
    pub data_format: u32,
    pub columns: u32,
    pub rows: u32,
    pub row_size: u32,
    /// Absolute offset of the image payload (`entry.offset + 28`).
    pub data_offset: u64,
    /// Payload length (`entry.size - 28`).
    pub data_size: u64,
}

impl ImageSectionHeader {
    /// Whether this section is the JPEG-compressed preview.
    #[inline]
    pub fn is_jpeg_preview(&self) -> bool {
        self.data_type == IMAGE_DATA_TYPE_JPEG && self.data_format == IMAGE_DATA_FORMAT_JPEG
    }
}

/// What the reader found at the start of an entry's sub-block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionHeader {
    /// An image section with its decoded header.
    Image(ImageSectionHeader),
    /// Any other section; holds its leading 4-byte identifier.
    Other([u8; 4]),
    /// The sub-block could not be read.
    Unreadable(EntryError),
}

/// A directory record paired with the header read from its sub-block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub record: DirectoryRecord,
    pub section: SectionHeader,
}

impl DirectoryEntry {
    /// The image header, if this is a readable image section.
    pub fn image_header(&self) -> Option<&ImageSectionHeader> {
        match &self.section {
            SectionHeader::Image(header) => Some(header),
            _ => None,
        }
    }

    /// Whether the sub-block header could not be read.
    pub fn is_unreadable(&self) -> bool {
        matches!(self.section, SectionHeader::Unreadable(_))
    }
}

/// Absolute byte range of an embedded JPEG stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JpegLocator {
    pub offset: u64,
    pub size: u64,
}

impl JpegLocator {
    /// One past the last byte of the stream.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

/// Parsed directory of one X3F file.
///
/// Built fresh on every open and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Total length of the byte source.
    pub file_len: u64,
    /// Absolute offset of the directory table.
    pub directory_offset: u32,
    /// Section tag of the directory table (informational).
    pub directory_tag: [u8; 4],
    /// Directory version field (informational).
    pub version: u32,
    /// Entries in file order.
    pub entries: Vec<DirectoryEntry>,
}

impl Container {
    /// Find the JPEG preview.
    ///
    /// Scans entries in directory order and returns the first image section
    /// with `data_type == 2` and `data_format == 18`.
    pub fn locate_embedded_jpeg(&self) -> Result<JpegLocator, ContainerError> {
        self.entries
            .iter()
            .filter_map(DirectoryEntry::image_header)
            .find(|header| header.is_jpeg_preview())
            .map(|header| JpegLocator {
                offset: header.data_offset,
                size: header.data_size,
            })
            .ok_or(ContainerError::NotFound)
    }

    /// Image-section entries only.
    pub fn image_sections(&self) -> impl Iterator<Item = &ImageSectionHeader> {
        self.entries.iter().filter_map(DirectoryEntry::image_header)
    }

    /// Number of entries whose sub-block header could not be read.
    pub fn unreadable_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_unreadable()).count()
    }
}

/// Render a 4-byte tag for display.
pub fn tag_to_string(tag: &[u8; 4]) -> String {
    tag.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_entry(offset: u32, size: u32, data_type: u32, data_format: u32) -> DirectoryEntry {
        DirectoryEntry {
            record: DirectoryRecord {
                offset,
                size,
                tag: *b"IMA2",
            },
            section: SectionHeader::Image(ImageSectionHeader {
                image_format: 3,
                data_type,
                data_format,
                columns: 640,
                rows: 480,
                row_size: 0,
                data_offset: offset as u64 + IMAGE_HEADER_LEN as u64,
                data_size: (size - IMAGE_HEADER_LEN) as u64,
            }),
        }
    }

    fn container(entries: Vec<DirectoryEntry>) -> Container {
        Container {
            file_len: 10_000,
            directory_offset: 9_000,
            directory_tag: *b"SECd",
            version: 0x0002_0000,
            entries,
        }
    }

    #[test]
    fn test_locate_first_matching_entry_wins() {
        let c = container(vec![
            image_entry(100, 200, 3, 11),
            image_entry(400, 500, 2, 18),
            image_entry(1000, 300, 2, 18),
        ]);
        let loc = c.locate_embedded_jpeg().unwrap();
        assert_eq!(loc, JpegLocator { offset: 428, size: 472 });
    }

    #[test]
    fn test_locate_requires_both_type_and_format() {
        let c = container(vec![image_entry(100, 200, 2, 11), image_entry(400, 500, 3, 18)]);
        assert!(matches!(c.locate_embedded_jpeg(), Err(ContainerError::NotFound)));
    }

    #[test]
    fn test_locate_skips_unreadable_and_other_sections() {
        let mut unreadable = image_entry(100, 200, 2, 18);
        unreadable.section = SectionHeader::Unreadable(EntryError::Unreadable("eof".into()));
        let other = DirectoryEntry {
            record: DirectoryRecord {
                offset: 50,
                size: 10,
                tag: *b"PROP",
            },
            section: SectionHeader::Other(*b"SECp"),
        };
        let c = container(vec![unreadable, other, image_entry(600, 100, 2, 18)]);

        assert_eq!(c.unreadable_count(), 1);
        assert_eq!(c.image_sections().count(), 1);
        assert_eq!(c.locate_embedded_jpeg().unwrap().offset, 628);
    }

    #[test]
    fn test_locate_empty_directory() {
        let c = container(vec![]);
        assert!(matches!(c.locate_embedded_jpeg(), Err(ContainerError::NotFound)));
    }

    #[test]
    fn test_tag_to_string() {
        assert_eq!(tag_to_string(b"IMA2"), "IMA2");
        assert_eq!(tag_to_string(&[b'S', 0, 0xFF, b'i']), "S..i");
    }

    #[test]
    fn test_locator_end() {
        let loc = JpegLocator { offset: 28, size: 100 };
        assert_eq!(loc.end(), 128);
    }

    #[test]
    fn test_container_error_display() {
        assert_eq!(ContainerError::InvalidFormat.to_string(), "Not a valid X3F file");
        assert_eq!(
            EntryError::NegativeDataSize { size: 12 }.to_string(),
            "Entry size 12 is smaller than the image header"
        );
    }
}
