//! Viewer session bindings.
//!
//! [`JsSession`] wraps the core state machine for a browser front-end. The
//! host owns file access: it lists the directory, reads the bytes for each
//! ticket and performs the moves that `delete` asks for.

use std::io;
use std::path::{Path, PathBuf};

use wasm_bindgen::prelude::*;
use x3fview_core::services::Quarantine;
use x3fview_core::session::{Layout, LoadTicket, SessionError, SessionState, ZoomMode};

use crate::types::to_js_error;

/// A pending load: which file to read and the generation it belongs to.
#[wasm_bindgen]
pub struct JsLoadTicket {
    inner: LoadTicket,
}

#[wasm_bindgen]
impl JsLoadTicket {
    #[wasm_bindgen(getter)]
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    #[wasm_bindgen(getter)]
    pub fn path(&self) -> String {
        path_string(&self.inner.path)
    }
}

/// Where to draw the current image.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JsLayout {
    /// True at native scale, false when fitted.
    pub one_to_one: bool,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub width: u32,
    pub height: u32,
}

impl JsLayout {
    fn from_layout(layout: Layout, width: u32, height: u32) -> Self {
        match layout {
            Layout::Fit(fit) => JsLayout {
                one_to_one: false,
                x: fit.offset_x,
                y: fit.offset_y,
                scale: fit.scale,
                width: fit.scaled_width,
                height: fit.scaled_height,
            },
            Layout::OneToOne { x, y } => JsLayout {
                one_to_one: true,
                x,
                y,
                scale: 1.0,
                width,
                height,
            },
        }
    }
}

/// Records the path the session wants moved; the host performs the move.
#[derive(Default)]
struct HostQuarantine {
    removed: Option<PathBuf>,
}

impl Quarantine for HostQuarantine {
    fn quarantine(&mut self, path: &Path) -> io::Result<PathBuf> {
        self.removed = Some(path.to_path_buf());
        Ok(path.to_path_buf())
    }
}

#[wasm_bindgen]
pub struct JsSession {
    state: SessionState,
    last_removed: Option<PathBuf>,
}

#[wasm_bindgen]
impl JsSession {
    /// Start a session over `files` (an array of names, already ordered).
    #[wasm_bindgen(constructor)]
    pub fn new(files: JsValue, viewport_width: i32, viewport_height: i32) -> Result<JsSession, JsValue> {
        let names = file_names(files)?;
        Ok(Self::from_names(names, viewport_width, viewport_height))
    }

    #[wasm_bindgen(getter)]
    pub fn length(&self) -> usize {
        self.state.len()
    }

    #[wasm_bindgen(getter)]
    pub fn current_index(&self) -> usize {
        self.state.current_index()
    }

    #[wasm_bindgen(getter)]
    pub fn current_file(&self) -> Option<String> {
        self.state.current_path().map(path_string)
    }

    #[wasm_bindgen(getter)]
    pub fn rotation(&self) -> u8 {
        self.state.rotation_quarters()
    }

    #[wasm_bindgen(getter)]
    pub fn one_to_one(&self) -> bool {
        self.state.zoom_mode() == ZoomMode::OneToOne
    }

    #[wasm_bindgen(getter)]
    pub fn needs_layout(&self) -> bool {
        self.state.needs_layout()
    }

    /// The file removed by the last successful `delete`, for the host to move.
    #[wasm_bindgen(getter)]
    pub fn last_removed(&self) -> Option<String> {
        self.last_removed.as_deref().map(path_string)
    }

    pub fn current_ticket(&self) -> Option<JsLoadTicket> {
        self.state.current_ticket().map(|inner| JsLoadTicket { inner })
    }

    /// Whether a decoded result for `ticket` may still be shown.
    pub fn is_current(&self, ticket: &JsLoadTicket) -> bool {
        self.state.is_current(&ticket.inner)
    }

    pub fn next(&mut self) -> Result<JsLoadTicket, JsValue> {
        ticket(self.state.next())
    }

    pub fn previous(&mut self) -> Result<JsLoadTicket, JsValue> {
        ticket(self.state.previous())
    }

    pub fn select_file(&mut self, name: &str) -> Result<JsLoadTicket, JsValue> {
        ticket(self.state.select_file(Path::new(name)))
    }

    /// Drop the current file from the list. Read `last_removed` afterwards
    /// to learn which file to move. Throws when the list becomes empty.
    pub fn delete(&mut self) -> Result<JsLoadTicket, JsValue> {
        let mut host = HostQuarantine::default();
        let result = self.state.delete(&mut host);
        self.last_removed = host.removed;
        ticket(result)
    }

    pub fn rotate(&mut self) -> u8 {
        self.state.rotate()
    }

    /// Toggle fit / 1:1. Returns true when now at native scale.
    pub fn toggle_zoom(&mut self) -> bool {
        self.state.toggle_zoom() == ZoomMode::OneToOne
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        self.state.resize(width, height);
    }

    pub fn pan(&mut self, dx: f64, dy: f64) -> bool {
        self.state.pan(dx, dy)
    }

    /// Placement of a decoded preview of `width` x `height` (before rotation).
    pub fn layout(&mut self, width: u32, height: u32) -> Result<JsLayout, JsValue> {
        self.layout_inner(width, height).map_err(to_js_error)
    }

    /// Replace the file list after a rescan. Returns a ticket when the
    /// current file changed.
    pub fn refresh(&mut self, files: JsValue) -> Result<Option<JsLoadTicket>, JsValue> {
        let names = file_names(files)?;
        Ok(self.refresh_names(names))
    }
}

impl JsSession {
    fn from_names(names: Vec<String>, viewport_width: i32, viewport_height: i32) -> Self {
        let files = names.into_iter().map(PathBuf::from).collect();
        Self {
            state: SessionState::new(files, (viewport_width, viewport_height)),
            last_removed: None,
        }
    }

    fn refresh_names(&mut self, names: Vec<String>) -> Option<JsLoadTicket> {
        self.state
            .refresh(names.into_iter().map(PathBuf::from).collect())
            .map(|inner| JsLoadTicket { inner })
    }

    fn layout_inner(&mut self, width: u32, height: u32) -> Result<JsLayout, SessionError> {
        let layout = self.state.layout(width, height)?;
        let (w, h) = x3fview_core::transform::rotated_dimensions(
            width,
            height,
            self.state.rotation_quarters(),
        );
        Ok(JsLayout::from_layout(layout, w, h))
    }
}

fn file_names(files: JsValue) -> Result<Vec<String>, JsValue> {
    serde_wasm_bindgen::from_value(files)
        .map_err(|e| JsValue::from_str(&format!("Expected an array of file names: {}", e)))
}

fn ticket(result: Result<LoadTicket, SessionError>) -> Result<JsLoadTicket, JsValue> {
    result.map(|inner| JsLoadTicket { inner }).map_err(to_js_error)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(names: &[&str]) -> JsSession {
        JsSession::from_names(names.iter().map(|n| n.to_string()).collect(), 860, 600)
    }

    #[test]
    fn test_navigation_issues_newer_tickets() {
        let mut s = session(&["a.X3F", "b.X3F"]);
        let first = s.current_ticket().unwrap();
        assert_eq!(first.path(), "a.X3F");

        let second = JsLoadTicket {
            inner: s.state.next().unwrap(),
        };
        assert_eq!(second.path(), "b.X3F");
        assert!(second.generation() > first.generation());
        assert!(!s.is_current(&first));
        assert!(s.is_current(&second));
    }

    #[test]
    fn test_delete_reports_removed_file() {
        let mut s = session(&["a.X3F", "b.X3F", "c.X3F"]);
        s.state.next().unwrap();
        let mut host = HostQuarantine::default();
        let next = s.state.delete(&mut host).unwrap();
        assert_eq!(host.removed, Some(PathBuf::from("b.X3F")));
        assert_eq!(next.path, PathBuf::from("a.X3F"));
        assert_eq!(s.length(), 2);
    }

    #[test]
    fn test_layout_fit_and_one_to_one() {
        let mut s = session(&["a.X3F"]);
        let fit = s.layout_inner(1720, 1200).unwrap();
        assert!(!fit.one_to_one);
        assert_eq!((fit.width, fit.height), (860, 600));
        assert!(!s.needs_layout());

        assert!(s.toggle_zoom());
        assert!(s.pan(10.0, 0.0));
        let native = s.layout_inner(1720, 1200).unwrap();
        assert!(native.one_to_one);
        assert_eq!((native.width, native.height), (1720, 1200));
        assert!((native.x - (-430.0 + 15.0)).abs() < 1e-9);
    }

    #[test]
    fn test_layout_accounts_for_rotation() {
        let mut s = session(&["a.X3F"]);
        s.rotate();
        s.toggle_zoom();
        let native = s.layout_inner(300, 200).unwrap();
        assert_eq!((native.width, native.height), (200, 300));
    }

    #[test]
    fn test_refresh_keeps_current_file() {
        let mut s = session(&["a.X3F", "b.X3F"]);
        s.state.next().unwrap();
        let changed = s.refresh_names(vec!["0.X3F".into(), "b.X3F".into()]);
        assert!(changed.is_none());
        assert_eq!(s.current_index(), 1);
    }
}
