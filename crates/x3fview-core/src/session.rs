//! Browsing session state machine.
//!
//! Holds the ordered file list, the active index, zoom mode, rotation and pan
//! offset, and defines how navigation, rotate, zoom and resize actions change
//! them. It performs no I/O: loading goes through [`LoadTicket`]s handed to
//! the caller, and filesystem moves go through the [`Quarantine`]
//! collaborator.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::Quarantine;
use crate::transform::rotated_dimensions;
use crate::viewport::{compute_fit, place_one_to_one, ViewportError, ViewportFitResult};

/// Default multiplier applied to pointer deltas while panning.
pub const DEFAULT_DRAG_FACTOR: f64 = 1.5;

/// Errors from session transitions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The file list is empty, so there is no current image.
    #[error("No files in the session")]
    EmptyList,

    /// `select_file` was given a path that is not in the list.
    #[error("File not in session: {0}")]
    UnknownFile(PathBuf),

    /// A collaborator (e.g. the quarantine mover) failed; nothing changed.
    #[error("Collaborator failed: {0}")]
    Collaborator(String),

    #[error(transparent)]
    Viewport(#[from] ViewportError),
}

/// How the current image is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZoomMode {
    /// Scaled uniformly to fit the viewport.
    #[default]
    Fit,
    /// Native pixel scale, pannable.
    OneToOne,
}

impl ZoomMode {
    pub fn toggled(self) -> Self {
        match self {
            ZoomMode::Fit => ZoomMode::OneToOne,
            ZoomMode::OneToOne => ZoomMode::Fit,
        }
    }
}

/// Identifies one requested load.
///
/// Every transition that changes the active file issues a new ticket with a
/// higher generation. Only a result whose ticket is still current may be
/// applied; anything older has been superseded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    pub generation: u64,
    pub path: PathBuf,
}

/// Where and how to draw the current image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Layout {
    Fit(ViewportFitResult),
    OneToOne { x: f64, y: f64 },
}

/// State of one directory browsing session.
#[derive(Debug, Clone)]
pub struct SessionState {
    files: Vec<PathBuf>,
    current_index: usize,
    zoom_mode: ZoomMode,
    rotation_quarters: u8,
    pan_offset: (f64, f64),
    viewport: (i32, i32),
    drag_factor: f64,
    generation: u64,
    needs_layout: bool,
}

impl SessionState {
    /// Start a session at the first file, fit mode, no rotation.
    pub fn new(files: Vec<PathBuf>, viewport: (i32, i32)) -> Self {
        Self {
            files,
            current_index: 0,
            zoom_mode: ZoomMode::Fit,
            rotation_quarters: 0,
            pan_offset: (0.0, 0.0),
            viewport,
            drag_factor: DEFAULT_DRAG_FACTOR,
            generation: 0,
            needs_layout: true,
        }
    }

    pub fn with_drag_factor(mut self, drag_factor: f64) -> Self {
        self.drag_factor = drag_factor;
        self
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The active file, or `None` when the list is empty.
    pub fn current_path(&self) -> Option<&Path> {
        self.files.get(self.current_index).map(PathBuf::as_path)
    }

    pub fn zoom_mode(&self) -> ZoomMode {
        self.zoom_mode
    }

    pub fn rotation_quarters(&self) -> u8 {
        self.rotation_quarters
    }

    pub fn pan_offset(&self) -> (f64, f64) {
        self.pan_offset
    }

    pub fn viewport(&self) -> (i32, i32) {
        self.viewport
    }

    /// Whether the layout must be recomputed before the next render.
    pub fn needs_layout(&self) -> bool {
        self.needs_layout
    }

    /// Ticket for the active file, without starting a new load.
    pub fn current_ticket(&self) -> Option<LoadTicket> {
        self.current_path().map(|path| LoadTicket {
            generation: self.generation,
            path: path.to_path_buf(),
        })
    }

    /// Whether a load result for `ticket` may still be applied.
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation
            && self.current_path() == Some(ticket.path.as_path())
    }

    /// Advance to the next file, wrapping to the first.
    pub fn next(&mut self) -> Result<LoadTicket, SessionError> {
        let len = self.non_empty_len()?;
        self.current_index = (self.current_index + 1) % len;
        Ok(self.activate())
    }

    /// Go back to the previous file, wrapping to the last.
    pub fn previous(&mut self) -> Result<LoadTicket, SessionError> {
        let len = self.non_empty_len()?;
        self.current_index = (self.current_index + len - 1) % len;
        Ok(self.activate())
    }

    /// Make `path` the active file.
    pub fn select_file(&mut self, path: &Path) -> Result<LoadTicket, SessionError> {
        let index = self
            .files
            .iter()
            .position(|p| p == path)
            .ok_or_else(|| SessionError::UnknownFile(path.to_path_buf()))?;
        self.current_index = index;
        Ok(self.activate())
    }

    /// Quarantine the active file and drop it from the list.
    ///
    /// The collaborator runs first; if it fails the session is unchanged.
    /// Afterwards the index steps back one place (wrapping), like
    /// [`previous`](Self::previous). Deleting the last remaining file leaves
    /// the list empty and returns `EmptyList`: there is nothing to load.
    pub fn delete(&mut self, quarantine: &mut dyn Quarantine) -> Result<LoadTicket, SessionError> {
        self.non_empty_len()?;
        let path = self.files[self.current_index].clone();
        let moved_to = quarantine
            .quarantine(&path)
            .map_err(|e| SessionError::Collaborator(format!("{}: {}", path.display(), e)))?;
        log::debug!("Quarantined {} to {}", path.display(), moved_to.display());

        self.files.remove(self.current_index);
        if self.files.is_empty() {
            self.current_index = 0;
            self.generation += 1;
            self.reset_view();
            return Err(SessionError::EmptyList);
        }

        let len = self.files.len();
        self.current_index = (self.current_index + len - 1) % len;
        Ok(self.activate())
    }

    /// Rotate the current image a further quarter turn clockwise.
    pub fn rotate(&mut self) -> u8 {
        self.rotation_quarters = (self.rotation_quarters + 1) % 4;
        self.needs_layout = true;
        self.rotation_quarters
    }

    /// Switch between fit and one-to-one display. Resets the pan offset.
    pub fn toggle_zoom(&mut self) -> ZoomMode {
        self.zoom_mode = self.zoom_mode.toggled();
        self.pan_offset = (0.0, 0.0);
        self.needs_layout = true;
        self.zoom_mode
    }

    /// Record a new viewport size and invalidate the layout.
    ///
    /// Both modes depend on the viewport: fit scales to it and one-to-one
    /// centres in it. Any size is stored; a non-positive one makes the next
    /// [`layout`](Self::layout) fail instead of being replaced by a guess.
    pub fn resize(&mut self, width: i32, height: i32) {
        self.viewport = (width, height);
        self.needs_layout = true;
    }

    /// Apply a pointer drag.
    ///
    /// Panning is only meaningful at native scale, so drags move the image in
    /// one-to-one mode and are ignored in fit mode. Returns whether the offset
    /// changed.
    pub fn pan(&mut self, dx: f64, dy: f64) -> bool {
        if self.zoom_mode != ZoomMode::OneToOne {
            return false;
        }
        self.pan_offset.0 += dx * self.drag_factor;
        self.pan_offset.1 += dy * self.drag_factor;
        self.needs_layout = true;
        true
    }

    /// Compute where to draw a decoded image of `width` x `height`.
    ///
    /// The dimensions are those of the decoded preview before rotation; the
    /// session's rotation is accounted for here.
    pub fn layout(&mut self, width: u32, height: u32) -> Result<Layout, SessionError> {
        let (w, h) = rotated_dimensions(width, height, self.rotation_quarters);
        let (vw, vh) = self.viewport;
        let layout = match self.zoom_mode {
            ZoomMode::Fit => Layout::Fit(compute_fit(w, h, vw, vh)?),
            ZoomMode::OneToOne => {
                let (x, y) = place_one_to_one(w, h, vw, vh, self.pan_offset)?;
                Layout::OneToOne { x, y }
            }
        };
        self.needs_layout = false;
        Ok(layout)
    }

    /// Replace the file list after a rescan.
    ///
    /// The active file stays selected if it is still present; otherwise the
    /// index is clamped and a new ticket is issued. Returns the ticket when
    /// the active file changed.
    pub fn refresh(&mut self, files: Vec<PathBuf>) -> Option<LoadTicket> {
        let previous = self.current_path().map(Path::to_path_buf);
        self.files = files;

        if let Some(index) = previous
            .as_ref()
            .and_then(|p| self.files.iter().position(|f| f == p))
        {
            self.current_index = index;
            return None;
        }

        self.current_index = self.current_index.min(self.files.len().saturating_sub(1));
        if self.files.is_empty() {
            self.generation += 1;
            self.reset_view();
            None
        } else {
            Some(self.activate())
        }
    }

    fn non_empty_len(&self) -> Result<usize, SessionError> {
        match self.files.len() {
            0 => Err(SessionError::EmptyList),
            len => Ok(len),
        }
    }

    fn reset_view(&mut self) {
        self.rotation_quarters = 0;
        self.pan_offset = (0.0, 0.0);
        self.needs_layout = true;
    }

    /// A different image becomes active: reset per-image state and issue a
    /// fresh ticket.
    fn activate(&mut self) -> LoadTicket {
        self.generation += 1;
        self.reset_view();
        let path = self.files[self.current_index].clone();
        log::debug!(
            "Session now at {}/{}: {} (generation {})",
            self.current_index + 1,
            self.files.len(),
            path.display(),
            self.generation
        );
        LoadTicket {
            generation: self.generation,
            path,
        }
    }
}
