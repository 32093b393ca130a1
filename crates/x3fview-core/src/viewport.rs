//! Viewport geometry: fitting a bitmap into a viewport.
//!
//! Everything here is a pure function of the dimensions passed in. Callers
//! supply the current viewport size on every resize; nothing reads UI state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance for the height-overflow comparison, absorbs float rounding.
const OVERFLOW_EPSILON: f64 = 1e-9;

/// Errors from the fit model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewportError {
    /// The viewport has a zero or negative dimension.
    #[error("Invalid viewport {width}x{height}: dimensions must be positive")]
    InvalidViewport { width: i32, height: i32 },

    /// The image has a zero dimension.
    #[error("Cannot fit an empty {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },
}

/// Placement of a scaled image inside a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportFitResult {
    /// Uniform scale factor, always positive.
    pub scale: f64,
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Left edge of the scaled image, relative to the viewport.
    pub offset_x: f64,
    /// Top edge of the scaled image, relative to the viewport.
    pub offset_y: f64,
}

/// Landscape or portrait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageOrientation {
    Landscape,
    Portrait,
}

/// Portrait when strictly taller than wide; squares count as landscape.
pub fn orientation(width: u32, height: u32) -> ImageOrientation {
    if width < height {
        ImageOrientation::Portrait
    } else {
        ImageOrientation::Landscape
    }
}

/// Validate a viewport size and return it as floats.
pub fn check_viewport(width: i32, height: i32) -> Result<(f64, f64), ViewportError> {
    if width <= 0 || height <= 0 {
        return Err(ViewportError::InvalidViewport { width, height });
    }
    Ok((width as f64, height as f64))
}

/// Fit an image into a viewport, preserving aspect ratio.
///
/// The width-driven scale is tried first; if it makes the image taller than
/// the viewport, the height-driven scale is used instead. The result touches
/// the viewport on its limiting axis and is centred on both axes.
///
/// # Errors
///
/// `InvalidViewport` for non-positive viewport dimensions, `EmptyImage` for a
/// zero image dimension. No substitute size is ever guessed.
pub fn compute_fit(
    image_width: u32,
    image_height: u32,
    viewport_width: i32,
    viewport_height: i32,
) -> Result<ViewportFitResult, ViewportError> {
    let (vw, vh) = check_viewport(viewport_width, viewport_height)?;
    if image_width == 0 || image_height == 0 {
        return Err(ViewportError::EmptyImage {
            width: image_width,
            height: image_height,
        });
    }

    let (iw, ih) = (image_width as f64, image_height as f64);
    let mut scale = vw / iw;
    if ih * scale > vh + OVERFLOW_EPSILON {
        scale = vh / ih;
    }

    let scaled_width = ((iw * scale).round() as u32).min(viewport_width as u32);
    let scaled_height = ((ih * scale).round() as u32).min(viewport_height as u32);

    Ok(ViewportFitResult {
        scale,
        scaled_width,
        scaled_height,
        offset_x: centre_offset(scaled_width, vw),
        offset_y: centre_offset(scaled_height, vh),
    })
}

/// Top-left position of an unscaled image in one-to-one mode.
///
/// The image is centred, then shifted by the pan offset.
pub fn place_one_to_one(
    image_width: u32,
    image_height: u32,
    viewport_width: i32,
    viewport_height: i32,
    pan: (f64, f64),
) -> Result<(f64, f64), ViewportError> {
    let (vw, vh) = check_viewport(viewport_width, viewport_height)?;
    Ok((
        centre_offset(image_width, vw) + pan.0,
        centre_offset(image_height, vh) + pan.1,
    ))
}

#[inline]
fn centre_offset(scaled: u32, viewport: f64) -> f64 {
    scaled as f64 / -2.0 + viewport / 2.0
}
