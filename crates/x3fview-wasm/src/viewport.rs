//! Fit-model bindings.

use wasm_bindgen::prelude::*;
use x3fview_core::decode::{render_fit, DecodedImage, FilterType};
use x3fview_core::transform::rotate_quarters;
use x3fview_core::viewport::{self, ImageOrientation, ViewportFitResult};

use crate::types::{filter_from_u8, to_js_error, to_js_object, JsDecodedImage};

/// Fit an image into a viewport.
///
/// Returns `{ scale, scaled_width, scaled_height, offset_x, offset_y }`.
/// Throws for a non-positive viewport or an empty image.
#[wasm_bindgen]
pub fn compute_fit(
    image_width: u32,
    image_height: u32,
    viewport_width: i32,
    viewport_height: i32,
) -> Result<JsValue, JsValue> {
    let fit = viewport::compute_fit(image_width, image_height, viewport_width, viewport_height)
        .map_err(to_js_error)?;
    to_js_object(&fit)
}

/// `"portrait"` when taller than wide, otherwise `"landscape"`.
#[wasm_bindgen]
pub fn image_orientation(width: u32, height: u32) -> String {
    orientation_name(viewport::orientation(width, height)).to_string()
}

/// Rotate by quarter turns, then scale to fit the viewport.
///
/// This is what a canvas front-end draws in fit mode; the placement offsets
/// come from [`compute_fit`] on the rotated dimensions. `filter`: 0 nearest,
/// 1 bilinear, 2 Lanczos3.
#[wasm_bindgen]
pub fn render_preview(
    image: &JsDecodedImage,
    quarters: u8,
    viewport_width: i32,
    viewport_height: i32,
    filter: u8,
) -> Result<JsDecodedImage, JsValue> {
    let source = image.to_decoded().map_err(|e| JsValue::from_str(&e))?;
    render(
        &source,
        quarters,
        viewport_width,
        viewport_height,
        filter_from_u8(filter),
    )
        .map(JsDecodedImage::from_decoded)
        .map_err(|e| JsValue::from_str(&e))
}

fn render(
    image: &DecodedImage,
    quarters: u8,
    viewport_width: i32,
    viewport_height: i32,
    filter: FilterType,
) -> Result<DecodedImage, String> {
    let rotated = rotate_quarters(image, quarters).map_err(|e| e.to_string())?;
    let fit: ViewportFitResult =
        viewport::compute_fit(rotated.width, rotated.height, viewport_width, viewport_height)
            .map_err(|e| e.to_string())?;
    render_fit(&rotated, &fit, filter).map_err(|e| e.to_string())
}

fn orientation_name(orientation: ImageOrientation) -> &'static str {
    match orientation {
        ImageOrientation::Landscape => "landscape",
        ImageOrientation::Portrait => "portrait",
    }
}
