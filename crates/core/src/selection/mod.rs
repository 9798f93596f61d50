//! Pointer-driven region selection.
//!
//! # Architecture
//!
//! - [`rect`]: single drag-to-draw rectangle with a committed preview box
//! - [`contour`]: multi-stroke freehand selection with per-stroke undo
//! - [`controller`]: owns both trackers, routes pointer events to the one
//!   behind the active [`SelectionMode`] and answers the view layer's queries
//!
//! Pointer positions are mapped from screen units to image pixels by
//! [`CoordinateMapper`](crate::coords::CoordinateMapper) before any tracker
//! sees them.

mod contour;
mod controller;
mod rect;

pub use contour::{ContourSelectionTracker, Stroke};
pub use controller::{ActiveSelection, SelectionMode, SelectionModeController};
pub use rect::RectSelectionTracker;
