//! X3F container bindings.
//!
//! The browser hands over the whole file as a `Uint8Array`; everything here
//! works on an in-memory cursor over those bytes.
//!
//! # Example
//!
//! ```typescript
//! import { is_x3f_file, decode_embedded_preview } from '@x3fview/wasm';
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! if (is_x3f_file(bytes)) {
//!   const preview = decode_embedded_preview(bytes);
//!   console.log(`Preview: ${preview.width}x${preview.height}`);
//! }
//! ```

use std::io::Cursor;

use wasm_bindgen::prelude::*;
use x3fview_core::container::{self, Container, ContainerError, JpegLocator};
use x3fview_core::decode::{GenericDecoder, PreviewDecoder};

use crate::types::{to_js_error, to_js_object, JsDecodedImage};

/// Check whether the bytes start with the X3F magic.
#[wasm_bindgen]
pub fn is_x3f_file(bytes: &[u8]) -> bool {
    container::is_x3f_file(bytes)
}

/// Parse the container directory.
///
/// Returns a plain object with `file_len`, `directory_offset`, `version` and
/// the `entries` array; unreadable entries are included and marked.
#[wasm_bindgen]
pub fn inspect_container(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let parsed = parse(bytes).map_err(to_js_error)?;
    to_js_object(&parsed)
}

/// Find the embedded JPEG. Returns `{ offset, size }`.
#[wasm_bindgen]
pub fn locate_embedded_jpeg(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let locator = locate(bytes).map_err(to_js_error)?;
    to_js_object(&locator)
}

/// Copy out the embedded JPEG stream without decoding it.
#[wasm_bindgen]
pub fn extract_embedded_jpeg(bytes: &[u8]) -> Result<Vec<u8>, JsValue> {
    extract(bytes).map(|(_, jpeg)| jpeg).map_err(to_js_error)
}

/// Extract and decode the embedded preview in one step.
///
/// EXIF orientation inside the preview is applied; the viewer's own quarter
/// turns are not.
#[wasm_bindgen]
pub fn decode_embedded_preview(bytes: &[u8]) -> Result<JsDecodedImage, JsValue> {
    let (_, jpeg) = extract(bytes).map_err(to_js_error)?;
    GenericDecoder
        .decode(&jpeg)
        .map(JsDecodedImage::from_decoded)
        .map_err(to_js_error)
}

fn parse(bytes: &[u8]) -> Result<Container, ContainerError> {
    container::open(&mut Cursor::new(bytes))
}

fn locate(bytes: &[u8]) -> Result<JpegLocator, ContainerError> {
    parse(bytes)?.locate_embedded_jpeg()
}

fn extract(bytes: &[u8]) -> Result<(JpegLocator, Vec<u8>), ContainerError> {
    let mut cursor = Cursor::new(bytes);
    let locator = container::locate_embedded_jpeg(&mut cursor)?;
    let jpeg = container::read_embedded_jpeg(&mut cursor, &locator)?;
    Ok((locator, jpeg))
}
