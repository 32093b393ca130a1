//! Synthetic X3F containers for tests.
//!
//! Enabled for this crate's own tests and, through the `test-util` feature,
//! for the tests of dependent crates.

use crate::container::{HEADER_MAGIC, SECTION_IMAGE};

/// Builds synthetic X3F files: header, sub-blocks, directory, pointer.
pub struct X3fBuilder {
    data: Vec<u8>,
    records: Vec<(u32, u32, [u8; 4])>,
}

impl Default for X3fBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl X3fBuilder {
    pub fn new() -> Self {
        let mut data = HEADER_MAGIC.to_vec();
        // Version and padding, as a real file carries a longer header
        data.extend_from_slice(&0x0002_0002u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 8]);
        Self {
            data,
            records: Vec::new(),
        }
    }

    /// Append an image section whose record size covers exactly `payload`.
    pub fn image_section(mut self, data_type: u32, data_format: u32, payload: &[u8]) -> Self {
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(&SECTION_IMAGE);
        for value in [3u32, data_type, data_format, 64, 48, 0] {
            self.data.extend_from_slice(&value.to_le_bytes());
        }
        self.data.extend_from_slice(payload);
        let size = self.data.len() as u32 - offset;
        self.records.push((offset, size, *b"IMA2"));
        self
    }

    /// Append a non-image sub-block.
    pub fn other_section(mut self, tag: [u8; 4], body: &[u8]) -> Self {
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(b"SECp");
        self.data.extend_from_slice(body);
        let size = self.data.len() as u32 - offset;
        self.records.push((offset, size, tag));
        self
    }

    /// Add a raw directory record without any sub-block.
    pub fn raw_record(mut self, offset: u32, size: u32, tag: [u8; 4]) -> Self {
        self.records.push((offset, size, tag));
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.build_with_count(None)
    }

    /// Overwrite the declared size of the record at `index`.
    pub fn set_record_size(mut self, index: usize, size: u32) -> Self {
        self.records[index].1 = size;
        self
    }

    /// Build with an explicit (possibly lying) entry count.
    pub fn build_with_count(mut self, count: Option<u32>) -> Vec<u8> {
        let directory_offset = self.data.len() as u32;
        self.data.extend_from_slice(b"SECd");
        self.data.extend_from_slice(&0x0002_0000u32.to_le_bytes());
        let count = count.unwrap_or(self.records.len() as u32);
        self.data.extend_from_slice(&count.to_le_bytes());
        for (offset, size, tag) in &self.records {
            self.data.extend_from_slice(&offset.to_le_bytes());
            self.data.extend_from_slice(&size.to_le_bytes());
            self.data.extend_from_slice(tag);
        }
        self.data.extend_from_slice(&directory_offset.to_le_bytes());
        self.data
    }
}
