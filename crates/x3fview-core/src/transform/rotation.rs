//! Quarter-turn rotation of decoded previews.

use crate::decode::{DecodeError, DecodedImage};

/// Dimensions after rotating by the given number of quarter turns.
pub fn rotated_dimensions(width: u32, height: u32, quarters: u8) -> (u32, u32) {
    if quarters % 2 == 1 {
        (height, width)
    } else {
        (width, height)
    }
}

/// Rotate an image clockwise by 90° per quarter turn.
///
/// Quarter counts are taken mod 4, so `4` returns the image unchanged.
pub fn rotate_quarters(image: &DecodedImage, quarters: u8) -> Result<DecodedImage, DecodeError> {
    let quarters = quarters % 4;
    if quarters == 0 {
        return Ok(image.clone());
    }

    let rgb = image
        .to_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedFile("Failed to create RgbImage".to_string()))?;

    let rotated = match quarters {
        1 => image::imageops::rotate90(&rgb),
        2 => image::imageops::rotate180(&rgb),
        _ => image::imageops::rotate270(&rgb),
    };
    Ok(DecodedImage::from_rgb_image(rotated))
}
