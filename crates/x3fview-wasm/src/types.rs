//! WASM-compatible wrapper types.

use serde::Serialize;
use wasm_bindgen::prelude::*;
use x3fview_core::decode::{DecodedImage, FilterType};

/// A decoded RGB bitmap held in WASM memory.
///
/// `pixels()` copies the buffer into a JavaScript `Uint8Array`; keep the
/// image on the WASM side when it is only going to be rotated or fitted.
#[wasm_bindgen]
pub struct JsDecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[wasm_bindgen]
impl JsDecodedImage {
    /// Create an image from dimensions and RGB pixel data (3 bytes per pixel).
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> JsDecodedImage {
        JsDecodedImage {
            width,
            height,
            pixels,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.pixels.len()
    }

    /// RGB pixel data as a `Uint8Array` (copied).
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels.clone()
    }

    /// Release the WASM memory now instead of waiting for the finalizer.
    pub fn free(self) {}
}

impl JsDecodedImage {
    pub(crate) fn from_decoded(img: DecodedImage) -> Self {
        Self {
            width: img.width,
            height: img.height,
            pixels: img.pixels,
        }
    }

    /// Copy into a core image, rejecting buffers that do not match the
    /// dimensions (the constructor is callable from JavaScript).
    pub(crate) fn to_decoded(&self) -> Result<DecodedImage, String> {
        let expected = (self.width as usize) * (self.height as usize) * 3;
        if self.pixels.len() != expected {
            return Err(format!(
                "Pixel buffer has {} bytes, expected {} for {}x{}",
                self.pixels.len(),
                expected,
                self.width,
                self.height
            ));
        }
        Ok(DecodedImage::new(self.width, self.height, self.pixels.clone()))
    }
}

/// Map a filter code from JavaScript to the core filter.
///
/// 0 = nearest (the fit view default), 1 = bilinear, 2 = Lanczos3. Unknown
/// codes fall back to nearest.
pub(crate) fn filter_from_u8(value: u8) -> FilterType {
    match value {
        1 => FilterType::Bilinear,
        2 => FilterType::Lanczos3,
        _ => FilterType::Nearest,
    }
}

/// Convert a core error into a JavaScript exception value.
pub(crate) fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Serialize a core value into a plain JavaScript object.
pub(crate) fn to_js_object<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(to_js_error)
}
