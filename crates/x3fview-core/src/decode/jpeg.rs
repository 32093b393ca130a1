//! JPEG preview decoding through the `image` crate.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageReader};

use super::{DecodeError, DecodedImage, Orientation};

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Check if a byte slice starts with the JPEG start-of-image marker.
#[inline]
pub fn is_jpeg_data(data: &[u8]) -> bool {
    data.len() >= 2 && data[..2] == JPEG_SOI
}

/// Decode an embedded JPEG preview, applying its EXIF orientation.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` if the bytes do not start with a JPEG
/// marker and `DecodeError::CorruptedFile` if decoding fails part-way.
pub fn decode_jpeg(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    if !is_jpeg_data(bytes) {
        return Err(DecodeError::InvalidFormat);
    }

    let orientation = read_orientation(bytes);
    let img = ImageReader::with_format(Cursor::new(bytes), image::ImageFormat::Jpeg)
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    Ok(DecodedImage::from_rgb_image(
        apply_orientation(img, orientation).into_rgb8(),
    ))
}

/// Read the EXIF orientation of a JPEG stream.
///
/// Returns `Orientation::Normal` when there is no EXIF block.
pub fn read_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    Reader::new()
        .read_from_container(&mut cursor)
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .map(Orientation::from)
        .unwrap_or_default()
}

/// Apply an EXIF orientation to an already decoded preview.
pub fn orient(image: DecodedImage, orientation: Orientation) -> Result<DecodedImage, DecodeError> {
    if orientation == Orientation::Normal {
        return Ok(image);
    }
    let (width, height) = image.dimensions();
    let rgb = image::RgbImage::from_raw(width, height, image.pixels).ok_or_else(|| {
        DecodeError::CorruptedFile("pixel buffer does not match dimensions".to_string())
    })?;
    let oriented = apply_orientation(DynamicImage::ImageRgb8(rgb), orientation);
    Ok(DecodedImage::from_rgb_image(oriented.into_rgb8()))
}

fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}
