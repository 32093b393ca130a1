//! Display resizing of decoded previews.

use super::{DecodeError, DecodedImage, FilterType};
use crate::viewport::ViewportFitResult;

/// Resize an image to exact dimensions.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` for a zero target dimension and
/// `DecodeError::CorruptedFile` if the pixel buffer does not match the
/// image's dimensions.
pub fn resize(
    image: &DecodedImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidFormat);
    }

    if image.width == width && image.height == height {
        return Ok(image.clone());
    }

    let rgb_image = image
        .to_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedFile("Failed to create RgbImage".to_string()))?;

    let resized = image::imageops::resize(&rgb_image, width, height, filter.to_image_filter());
    Ok(DecodedImage::from_rgb_image(resized))
}

/// Scale a preview to the size chosen by the fit model.
///
/// The on-screen fit view uses [`FilterType::Nearest`]; front-ends that can
/// afford it may ask for a smoother filter. A fit that rounds a dimension
/// down to zero is clamped to one pixel.
pub fn render_fit(
    image: &DecodedImage,
    fit: &ViewportFitResult,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    resize(image, fit.scaled_width.max(1), fit.scaled_height.max(1), filter)
}
