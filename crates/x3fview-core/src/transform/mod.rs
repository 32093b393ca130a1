//! Image transforms applied before display.
//!
//! The viewer only rotates in quarter turns; the rotation count lives in the
//! session and is applied to the decoded preview before fitting.

mod rotation;

pub use rotation::{rotate_quarters, rotated_dimensions};
