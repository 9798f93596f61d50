//! Drag-to-draw rectangle selection.

use crate::geometry::{BoundingBox, Point};
use log::debug;

/// State machine for a single rectangle drag with one committed preview box.
///
/// `start_point` and `current_box` only exist while a drag is in progress.
/// `preview_box` holds the last committed box. There is exactly one level of
/// history, so undo and clear are the same operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RectSelectionTracker {
    is_drawing: bool,
    start_point: Option<Point>,
    current_box: Option<BoundingBox>,
    preview_box: Option<BoundingBox>,
}

impl RectSelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a drag at `pos`.
    ///
    /// The tracker always accepts a start; refusing a second drag while a
    /// preview exists is the controller's job.
    pub fn start(&mut self, pos: Point) {
        self.is_drawing = true;
        self.start_point = Some(pos);
        self.current_box = Some(BoundingBox::at(pos));
    }

    /// Stretches the in-progress box to `pos`.
    pub fn update(&mut self, pos: Point) {
        let Some(start) = self.start_point else {
            return;
        };
        self.current_box = Some(BoundingBox::from_corners(start, pos));
    }

    /// Finishes the drag, committing the box if it is large enough.
    pub fn end(&mut self) {
        if !self.is_drawing {
            return;
        }
        if let Some(current) = self.current_box.take() {
            if current.is_usable() {
                debug!("rect selection committed: {:?}", current);
                self.preview_box = Some(current);
            } else {
                debug!("rect selection discarded as too small: {:?}", current);
            }
        }
        self.is_drawing = false;
        self.start_point = None;
    }

    /// Resets every field.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Same as [`clear`](Self::clear); only one box is ever remembered.
    pub fn undo(&mut self) {
        self.clear();
    }

    pub fn is_drawing(&self) -> bool {
        self.is_drawing
    }

    pub fn start_point(&self) -> Option<Point> {
        self.start_point
    }

    pub fn current_box(&self) -> Option<BoundingBox> {
        self.current_box
    }

    pub fn preview_box(&self) -> Option<BoundingBox> {
        self.preview_box
    }
}
