//! x3fview WASM - WebAssembly bindings for x3fview
//!
//! Exposes the x3fview-core container reader, fit model and session state
//! to JavaScript/TypeScript front-ends.
//!
//! # Module Structure
//!
//! - `container` - X3F parsing and embedded preview extraction
//! - `viewport` - Fit computation and fitted rendering
//! - `session` - The browsing state machine
//! - `types` - WASM-compatible wrapper types
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsSession, decode_embedded_preview } from '@x3fview/wasm';
//!
//! await init();
//!
//! const session = new JsSession(names, canvas.width, canvas.height);
//! const ticket = session.current_ticket();
//! const preview = decode_embedded_preview(await readFile(ticket.path));
//! if (session.is_current(ticket)) {
//!   const layout = session.layout(preview.width, preview.height);
//! }
//! ```

use wasm_bindgen::prelude::*;

mod container;
mod session;
mod types;
mod viewport;

pub use container::{
    decode_embedded_preview, extract_embedded_jpeg, inspect_container, is_x3f_file,
    locate_embedded_jpeg,
};
pub use session::{JsLayout, JsLoadTicket, JsSession};
pub use types::JsDecodedImage;
pub use viewport::{compute_fit, image_orientation, render_preview};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str(&format!(
        "x3fview-wasm {} loaded",
        version()
    )));
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
