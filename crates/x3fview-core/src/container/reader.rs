//! Directory parsing for X3F containers.
//!
//! An X3F file starts with the `FOVb` magic and stores the absolute offset of
//! its directory table in the last four bytes. The directory lists every
//! sub-block (image sections, property lists, camera metadata). Image
//! sections start with a fixed 28-byte `SECi` header that says where the
//! payload lives and how it is encoded; the embedded preview is the section
//! whose payload is a JPEG stream.
//!
//! Only the directory and section headers are read. Sensor data is never
//! touched, which keeps preview extraction to a handful of small reads.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use super::types::{
    Container, ContainerError, DirectoryEntry, DirectoryRecord, EntryError, ImageSectionHeader,
    JpegLocator, SectionHeader, DIRECTORY_HEADER_LEN, DIRECTORY_RECORD_LEN, HEADER_MAGIC,
    IMAGE_HEADER_LEN, SECTION_IMAGE,
};

/// Decode a little-endian unsigned integer of 1 to 4 bytes.
///
/// The bytes are reversed and then folded most-significant first, which is
/// the same value `u32::from_le_bytes` gives for a 4-byte input.
pub fn le_uint(bytes: &[u8]) -> u32 {
    debug_assert!(bytes.len() <= 4, "le_uint supports at most 4 bytes");
    bytes
        .iter()
        .rev()
        .fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

/// Check whether a byte slice starts with the X3F magic.
pub fn is_x3f_file(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER_MAGIC.len() && bytes[..4] == HEADER_MAGIC
}

/// Parse the directory of an X3F container.
///
/// Steps, each failing with a typed error:
/// 1. the magic at offset 0 must be `FOVb` (`InvalidFormat`)
/// 2. the directory pointer is read from the last 4 bytes (`Truncated` when
///    the source is shorter than 8 bytes)
/// 3. the directory header and entry count must fit in the file
/// 4. the fixed 12-byte records are read in order
/// 5. each entry's sub-block header is classified; failures here only mark
///    that entry unreadable
///
/// The source's cursor position afterwards is unspecified. Nothing is written.
pub fn open<R: Read + Seek>(source: &mut R) -> Result<Container, ContainerError> {
    source
        .seek(SeekFrom::Start(0))
        .map_err(|e| io_error("seek to header", e))?;
    let magic = read_tag(source).map_err(|e| io_error("read header", e))?;
    if magic != HEADER_MAGIC {
        return Err(ContainerError::InvalidFormat);
    }

    let file_len = source
        .seek(SeekFrom::End(0))
        .map_err(|e| io_error("seek to end", e))?;
    if file_len < 8 {
        return Err(ContainerError::Truncated(format!(
            "file is {} bytes, too short for a directory pointer",
            file_len
        )));
    }

    source
        .seek(SeekFrom::End(-4))
        .map_err(|e| io_error("seek to directory pointer", e))?;
    let directory_offset = read_u32(source).map_err(|e| io_error("read directory pointer", e))?;

    let table_start = directory_offset as u64;
    if table_start + DIRECTORY_HEADER_LEN > file_len {
        return Err(ContainerError::Truncated(format!(
            "directory offset {} is past the end of a {} byte file",
            directory_offset, file_len
        )));
    }

    source
        .seek(SeekFrom::Start(table_start))
        .map_err(|e| io_error("seek to directory", e))?;
    let directory_tag = read_tag(source).map_err(|e| io_error("read directory tag", e))?;
    let version = read_u32(source).map_err(|e| io_error("read directory version", e))?;
    let entry_count = read_u32(source).map_err(|e| io_error("read entry count", e))?;

    let available = file_len - table_start - DIRECTORY_HEADER_LEN;
    let required = entry_count as u64 * DIRECTORY_RECORD_LEN;
    if required > available {
        return Err(ContainerError::Truncated(format!(
            "{} directory entries need {} bytes, only {} remain",
            entry_count, required, available
        )));
    }

    let mut records = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        records.push(read_record(source).map_err(|e| io_error("read directory entry", e))?);
    }

    let entries: Vec<DirectoryEntry> = records
        .into_iter()
        .map(|record| {
            let section = read_section_header(source, &record, file_len);
            if let SectionHeader::Unreadable(err) = &section {
                log::warn!(
                    "Skipping directory entry {} at offset {}: {}",
                    record.tag_str(),
                    record.offset,
                    err
                );
            }
            DirectoryEntry { record, section }
        })
        .collect();

    log::debug!(
        "Parsed X3F directory at {} (version {:#x}): {} entries",
        directory_offset,
        version,
        entries.len()
    );

    Ok(Container {
        file_len,
        directory_offset,
        directory_tag,
        version,
        entries,
    })
}

/// Parse a container and locate its JPEG preview in one call.
pub fn locate_embedded_jpeg<R: Read + Seek>(source: &mut R) -> Result<JpegLocator, ContainerError> {
    let locator = open(source)?.locate_embedded_jpeg()?;
    log::debug!(
        "Embedded JPEG at offset {} ({} bytes)",
        locator.offset,
        locator.size
    );
    Ok(locator)
}

/// Read the bytes a locator points at.
pub fn read_embedded_jpeg<R: Read + Seek>(
    source: &mut R,
    locator: &JpegLocator,
) -> Result<Vec<u8>, ContainerError> {
    let file_len = source
        .seek(SeekFrom::End(0))
        .map_err(|e| io_error("seek to end", e))?;
    if locator.end() > file_len {
        return Err(ContainerError::Truncated(format!(
            "JPEG data ends at {}, past the end of a {} byte file",
            locator.end(),
            file_len
        )));
    }
    let size = usize::try_from(locator.size)
        .map_err(|_| ContainerError::Truncated(format!("JPEG size {} too large", locator.size)))?;
    source
        .seek(SeekFrom::Start(locator.offset))
        .map_err(|e| io_error("seek to JPEG data", e))?;
    let mut data = vec![0u8; size];
    source
        .read_exact(&mut data)
        .map_err(|e| io_error("read JPEG data", e))?;
    Ok(data)
}

/// Parse the directory of a file on disk.
///
/// The file is closed before returning, on success and on error.
pub fn open_file(path: &Path) -> Result<Container, ContainerError> {
    let mut file = File::open(path).map_err(|e| io_error("open file", e))?;
    open(&mut file)
}

/// Locate and read the embedded JPEG of a file on disk.
///
/// The file handle lives only for the duration of this call.
pub fn extract_embedded_jpeg(path: &Path) -> Result<(JpegLocator, Vec<u8>), ContainerError> {
    let mut file = File::open(path).map_err(|e| io_error("open file", e))?;
    let locator = locate_embedded_jpeg(&mut file)?;
    let bytes = read_embedded_jpeg(&mut file, &locator)?;
    Ok((locator, bytes))
}

fn read_section_header<R: Read + Seek>(
    source: &mut R,
    record: &DirectoryRecord,
    file_len: u64,
) -> SectionHeader {
    let start = record.offset as u64;
    if start + 4 > file_len {
        return SectionHeader::Unreadable(EntryError::Unreadable(format!(
            "offset {} is past the end of the file",
            start
        )));
    }

    let tag = match source
        .seek(SeekFrom::Start(start))
        .and_then(|_| read_tag(source))
    {
        Ok(tag) => tag,
        Err(e) => return SectionHeader::Unreadable(EntryError::Unreadable(e.to_string())),
    };

    if tag != SECTION_IMAGE {
        return SectionHeader::Other(tag);
    }

    if start + IMAGE_HEADER_LEN as u64 > file_len {
        return SectionHeader::Unreadable(EntryError::Unreadable(format!(
            "image header at {} runs past the end of the file",
            start
        )));
    }

    match read_image_header(source, record, file_len) {
        Ok(Ok(header)) => SectionHeader::Image(header),
        Ok(Err(entry_err)) => SectionHeader::Unreadable(entry_err),
        Err(e) => SectionHeader::Unreadable(EntryError::Unreadable(e.to_string())),
    }
}

/// Read the 24 bytes that follow a `SECi` tag.
fn read_image_header<R: Read>(
    source: &mut R,
    record: &DirectoryRecord,
    file_len: u64,
) -> io::Result<Result<ImageSectionHeader, EntryError>> {
    let image_format = read_u32(source)?;
    let data_type = read_u32(source)?;
    let data_format = read_u32(source)?;
    let columns = read_u32(source)?;
    let rows = read_u32(source)?;
    let row_size = read_u32(source)?;

    let Some(data_size) = record.size.checked_sub(IMAGE_HEADER_LEN) else {
        return Ok(Err(EntryError::NegativeDataSize { size: record.size }));
    };
    let data_offset = record.offset as u64 + IMAGE_HEADER_LEN as u64;
    let end = data_offset + data_size as u64;
    if end > file_len {
        return Ok(Err(EntryError::PayloadPastEnd { end, file_len }));
    }

    Ok(Ok(ImageSectionHeader {
        image_format,
        data_type,
        data_format,
        columns,
        rows,
        row_size,
        data_offset,
        data_size: data_size as u64,
    }))
}

fn read_record<R: Read>(reader: &mut R) -> io::Result<DirectoryRecord> {
    let offset = read_u32(reader)?;
    let size = read_u32(reader)?;
    let tag = read_tag(reader)?;
    Ok(DirectoryRecord { offset, size, tag })
}

fn read_tag<R: Read>(reader: &mut R) -> io::Result<[u8; 4]> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let buf = read_tag(reader)?;
    Ok(le_uint(&buf))
}

fn io_error(step: &str, e: io::Error) -> ContainerError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        ContainerError::Truncated(format!("failed to {}: {}", step, e))
    } else {
        ContainerError::Io(format!("failed to {}: {}", step, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::X3fBuilder;
    use proptest::prelude::*;
    use std::io::Cursor;

    /// Byte source that panics on any read beyond a fixed limit.
    struct GuardedSource {
        inner: Cursor<Vec<u8>>,
        limit: u64,
    }

    impl Read for GuardedSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let pos = self.inner.position();
            assert!(
                pos + buf.len() as u64 <= self.limit,
                "read of {} bytes at {} crosses limit {}",
                buf.len(),
                pos,
                self.limit
            );
            self.inner.read(buf)
        }
    }

    impl Seek for GuardedSource {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    const FAKE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4, 5, 6, 0xFF, 0xD9];

    #[test]
    fn test_le_uint_matches_from_le_bytes() {
        assert_eq!(le_uint(&[0x78, 0x56, 0x34, 0x12]), 0x1234_5678);
        assert_eq!(le_uint(&[0x34, 0x12]), 0x1234);
        assert_eq!(le_uint(&[0xAB]), 0xAB);
        assert_eq!(le_uint(&[0x01, 0x00, 0x80]), 0x0080_0001);
        assert_eq!(le_uint(&[]), 0);
    }

    #[test]
    fn test_is_x3f_file() {
        assert!(is_x3f_file(b"FOVb\x00\x00"));
        assert!(!is_x3f_file(b"FOV"));
        assert!(!is_x3f_file(&[0x49, 0x49, 0x2A, 0x00]));
        assert!(!is_x3f_file(&[]));
    }

    #[test]
    fn test_locate_round_trip() {
        let file = X3fBuilder::new()
            .other_section(*b"PROP", &[0u8; 20])
            .image_section(2, 18, FAKE_JPEG)
            .build();
        let mut cursor = Cursor::new(&file[..]);

        let container = open(&mut cursor).unwrap();
        assert_eq!(container.entries.len(), 2);
        assert_eq!(&container.directory_tag, b"SECd");
        assert_eq!(container.version, 0x0002_0000);

        let locator = container.locate_embedded_jpeg().unwrap();
        let entry = &container.entries[1].record;
        assert_eq!(locator.offset, entry.offset as u64 + 28);
        assert_eq!(locator.size, entry.size as u64 - 28);
        assert!(locator.end() <= entry.offset as u64 + entry.size as u64);

        let bytes = read_embedded_jpeg(&mut cursor, &locator).unwrap();
        assert_eq!(bytes, FAKE_JPEG);
    }

    #[test]
    fn test_image_header_fields() {
        let file = X3fBuilder::new().image_section(2, 18, FAKE_JPEG).build();
        let container = open(&mut Cursor::new(&file[..])).unwrap();
        let header = container.entries[0].image_header().unwrap();
        assert_eq!(header.image_format, 3);
        assert_eq!(header.columns, 64);
        assert_eq!(header.rows, 48);
        assert_eq!(header.row_size, 0);
        assert!(header.is_jpeg_preview());
    }

    #[test]
    fn test_first_qualifying_entry_wins() {
        let file = X3fBuilder::new()
            .image_section(3, 11, &[0u8; 16])
            .image_section(2, 18, b"first")
            .image_section(2, 18, b"second")
            .build();
        let mut cursor = Cursor::new(&file[..]);
        let locator = locate_embedded_jpeg(&mut cursor).unwrap();
        assert_eq!(read_embedded_jpeg(&mut cursor, &locator).unwrap(), b"first");
    }

    #[test]
    fn test_no_jpeg_section_is_not_found() {
        let file = X3fBuilder::new()
            .image_section(3, 11, &[0u8; 16])
            .other_section(*b"CAMF", &[1u8; 8])
            .build();
        let result = locate_embedded_jpeg(&mut Cursor::new(&file[..]));
        assert!(matches!(result, Err(ContainerError::NotFound)));
    }

    #[test]
    fn test_bad_magic_reads_only_header() {
        let mut file = X3fBuilder::new().image_section(2, 18, FAKE_JPEG).build();
        file[..4].copy_from_slice(b"II*\0");
        let mut source = GuardedSource {
            inner: Cursor::new(file),
            limit: 4,
        };
        assert!(matches!(open(&mut source), Err(ContainerError::InvalidFormat)));
    }

    #[test]
    fn test_short_source_is_truncated() {
        let result = open(&mut Cursor::new(&b"FOVb\x00\x00"[..]));
        assert!(matches!(result, Err(ContainerError::Truncated(_))));

        let result = open(&mut Cursor::new(&b"FO"[..]));
        assert!(matches!(result, Err(ContainerError::Truncated(_))));
    }

    #[test]
    fn test_directory_pointer_past_end() {
        let mut file = b"FOVb".to_vec();
        file.extend_from_slice(&[0u8; 12]);
        file.extend_from_slice(&5000u32.to_le_bytes());
        let result = open(&mut Cursor::new(&file[..]));
        assert!(matches!(result, Err(ContainerError::Truncated(_))));
    }

    #[test]
    fn test_entry_count_larger_than_file() {
        let file = X3fBuilder::new()
            .image_section(2, 18, FAKE_JPEG)
            .build_with_count(Some(u32::MAX));
        let result = open(&mut Cursor::new(&file[..]));
        match result {
            Err(ContainerError::Truncated(msg)) => assert!(msg.contains("directory entries")),
            other => panic!("Expected Truncated, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_entry_does_not_abort() {
        let file = X3fBuilder::new()
            .raw_record(1_000_000, 64, *b"IMA2")
            .image_section(2, 18, FAKE_JPEG)
            .build();
        let container = open(&mut Cursor::new(&file[..])).unwrap();

        assert_eq!(container.entries.len(), 2);
        assert!(container.entries[0].is_unreadable());
        assert_eq!(container.unreadable_count(), 1);
        assert!(container.locate_embedded_jpeg().is_ok());
    }

    #[test]
    fn test_image_header_running_past_eof_is_unreadable() {
        // header(16) | directory(24) | "SECi" + 4 bytes | pointer
        let mut file = HEADER_MAGIC.to_vec();
        file.extend_from_slice(&[0u8; 12]);
        let dir_offset = file.len() as u32;
        file.extend_from_slice(b"SECd");
        file.extend_from_slice(&0u32.to_le_bytes());
        file.extend_from_slice(&1u32.to_le_bytes());
        file.extend_from_slice(&40u32.to_le_bytes());
        file.extend_from_slice(&64u32.to_le_bytes());
        file.extend_from_slice(b"IMA2");
        assert_eq!(file.len(), 40);
        file.extend_from_slice(&SECTION_IMAGE);
        file.extend_from_slice(&[0u8; 4]);
        file.extend_from_slice(&dir_offset.to_le_bytes());

        let container = open(&mut Cursor::new(&file[..])).unwrap();
        assert_eq!(container.entries.len(), 1);
        assert!(container.entries[0].is_unreadable());
        assert!(matches!(
            container.locate_embedded_jpeg(),
            Err(ContainerError::NotFound)
        ));
    }

    #[test]
    fn test_negative_data_size_marks_entry() {
        let file = X3fBuilder::new()
            .image_section(2, 18, FAKE_JPEG)
            .set_record_size(0, 20)
            .build();
        let container = open(&mut Cursor::new(&file[..])).unwrap();

        assert_eq!(
            container.entries[0].section,
            SectionHeader::Unreadable(EntryError::NegativeDataSize { size: 20 })
        );
        assert!(matches!(
            container.locate_embedded_jpeg(),
            Err(ContainerError::NotFound)
        ));
    }

    #[test]
    fn test_read_embedded_jpeg_past_eof() {
        let file = X3fBuilder::new().image_section(2, 18, FAKE_JPEG).build();
        let locator = JpegLocator {
            offset: file.len() as u64 - 2,
            size: 100,
        };
        let result = read_embedded_jpeg(&mut Cursor::new(&file[..]), &locator);
        assert!(matches!(result, Err(ContainerError::Truncated(_))));
    }

    #[test]
    fn test_oversized_record_marks_entry_unreadable() {
        let file = X3fBuilder::new()
            .image_section(2, 18, FAKE_JPEG)
            .set_record_size(0, u32::MAX)
            .build();
        let container = open(&mut Cursor::new(&file[..])).unwrap();

        assert!(matches!(
            container.entries[0].section,
            SectionHeader::Unreadable(EntryError::PayloadPastEnd { file_len, .. })
                if file_len == file.len() as u64
        ));
        assert!(matches!(
            locate_embedded_jpeg(&mut Cursor::new(&file[..])),
            Err(ContainerError::NotFound)
        ));
    }

    #[test]
    fn test_oversized_locator_fails_before_reading() {
        let file = X3fBuilder::new().image_section(2, 18, FAKE_JPEG).build();
        let locator = JpegLocator {
            offset: 44,
            size: u32::MAX as u64 - 28,
        };
        let mut source = GuardedSource {
            inner: Cursor::new(file),
            limit: 0,
        };
        assert!(matches!(
            read_embedded_jpeg(&mut source, &locator),
            Err(ContainerError::Truncated(_))
        ));
    }

    #[test]
    fn test_empty_directory() {
        let file = X3fBuilder::new().build();
        let container = open(&mut Cursor::new(&file[..])).unwrap();
        assert!(container.entries.is_empty());
    }

    proptest! {
        /// Property: the folded decode agrees with std for every length 1..=4.
        #[test]
        fn prop_le_uint_agrees_with_std(bytes in prop::collection::vec(any::<u8>(), 1..=4)) {
            let mut padded = [0u8; 4];
            padded[..bytes.len()].copy_from_slice(&bytes);
            prop_assert_eq!(le_uint(&bytes), u32::from_le_bytes(padded));
        }

        /// Property: arbitrary bytes never panic the parser.
        #[test]
        fn prop_open_never_panics(mut data in prop::collection::vec(any::<u8>(), 0..256)) {
            if data.len() >= 4 {
                data[..4].copy_from_slice(&HEADER_MAGIC);
            }
            let _ = open(&mut Cursor::new(&data[..]));
        }
    }
}
