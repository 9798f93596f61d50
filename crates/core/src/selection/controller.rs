//! Mode coordination and pointer routing.

use super::contour::ContourSelectionTracker;
use super::rect::RectSelectionTracker;
use crate::coords::{CoordinateMapper, SurfaceGeometry};
use crate::geometry::{BoundingBox, Point};
use log::debug;
use serde::{Deserialize, Serialize};

/// How the user marks the region to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Whole image, no manual selection.
    #[default]
    Automatic,
    /// One drag-to-draw rectangle.
    Rectangle,
    /// Any number of freehand strokes.
    Contour,
}

/// The tracker behind the active mode, borrowed for one operation.
pub enum ActiveSelection<'a> {
    Automatic,
    Rectangle(&'a RectSelectionTracker),
    Contour(&'a ContourSelectionTracker),
}

enum ActiveSelectionMut<'a> {
    Automatic,
    Rectangle(&'a mut RectSelectionTracker),
    Contour(&'a mut ContourSelectionTracker),
}

/// Owns both trackers and decides which one receives pointer input.
///
/// Switching modes leaves the other tracker's state alone. Both trackers are
/// cleared when a new image is loaded and when a segmentation result is
/// received.
#[derive(Debug, Default)]
pub struct SelectionModeController {
    mode: SelectionMode,
    has_image: bool,
    rect: RectSelectionTracker,
    contour: ContourSelectionTracker,
}

impl SelectionModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        if self.mode != mode {
            debug!("selection mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    pub fn has_image(&self) -> bool {
        self.has_image
    }

    pub fn rect(&self) -> &RectSelectionTracker {
        &self.rect
    }

    pub fn contour(&self) -> &ContourSelectionTracker {
        &self.contour
    }

    pub fn active(&self) -> ActiveSelection<'_> {
        match self.mode {
            SelectionMode::Automatic => ActiveSelection::Automatic,
            SelectionMode::Rectangle => ActiveSelection::Rectangle(&self.rect),
            SelectionMode::Contour => ActiveSelection::Contour(&self.contour),
        }
    }

    fn active_mut(&mut self) -> ActiveSelectionMut<'_> {
        match self.mode {
            SelectionMode::Automatic => ActiveSelectionMut::Automatic,
            SelectionMode::Rectangle => ActiveSelectionMut::Rectangle(&mut self.rect),
            SelectionMode::Contour => ActiveSelectionMut::Contour(&mut self.contour),
        }
    }

    /// Accepts input only with an image loaded and a manual mode active.
    fn routable(&mut self) -> Option<ActiveSelectionMut<'_>> {
        if !self.has_image {
            return None;
        }
        match self.active_mut() {
            ActiveSelectionMut::Automatic => None,
            active => Some(active),
        }
    }

    pub fn pointer_down(&mut self, raw: Point, surface: Option<&SurfaceGeometry>) {
        let pos = CoordinateMapper::map(surface, raw);
        match self.routable() {
            Some(ActiveSelectionMut::Rectangle(rect)) => {
                // one rectangle at a time
                if rect.preview_box().is_none() {
                    rect.start(pos);
                }
            }
            Some(ActiveSelectionMut::Contour(contour)) => contour.start(pos),
            _ => {}
        }
    }

    pub fn pointer_move(&mut self, raw: Point, surface: Option<&SurfaceGeometry>) {
        let pos = CoordinateMapper::map(surface, raw);
        match self.routable() {
            Some(ActiveSelectionMut::Rectangle(rect)) if rect.is_drawing() => rect.update(pos),
            Some(ActiveSelectionMut::Contour(contour)) if contour.is_drawing() => {
                contour.update(pos)
            }
            _ => {}
        }
    }

    pub fn pointer_up(&mut self) {
        match self.routable() {
            Some(ActiveSelectionMut::Rectangle(rect)) => rect.end(),
            Some(ActiveSelectionMut::Contour(contour)) => contour.end(),
            _ => {}
        }
    }

    /// Whether the active mode has something that can be confirmed.
    pub fn has_usable_selection(&self) -> bool {
        match self.active() {
            ActiveSelection::Automatic => true,
            ActiveSelection::Rectangle(rect) => rect.preview_box().is_some(),
            ActiveSelection::Contour(contour) => contour
                .bounding_box()
                .is_some_and(|bbox| bbox.is_usable()),
        }
    }

    pub fn can_undo(&self) -> bool {
        match self.active() {
            ActiveSelection::Automatic => false,
            ActiveSelection::Rectangle(rect) => rect.preview_box().is_some(),
            ActiveSelection::Contour(contour) => !contour.contour_paths().is_empty(),
        }
    }

    /// The active tracker's box, regardless of size.
    pub fn current_bounding_box(&self) -> Option<BoundingBox> {
        match self.active() {
            ActiveSelection::Automatic => None,
            ActiveSelection::Rectangle(rect) => rect.preview_box(),
            ActiveSelection::Contour(contour) => contour.bounding_box(),
        }
    }

    /// The box to crop to, or `None`.
    ///
    /// `None` means "whole image" only in automatic mode. In a manual mode it
    /// means the selection is missing or too small, which the pipeline
    /// rejects instead of falling back to the whole image.
    pub fn bounding_box_for_segmentation(&self) -> Option<BoundingBox> {
        match self.active() {
            ActiveSelection::Automatic => None,
            _ => self.current_bounding_box().filter(BoundingBox::is_usable),
        }
    }

    /// Undoes one step in the active mode.
    pub fn undo(&mut self) {
        match self.active_mut() {
            ActiveSelectionMut::Automatic => {}
            ActiveSelectionMut::Rectangle(rect) => rect.undo(),
            ActiveSelectionMut::Contour(contour) => contour.undo_last_stroke(),
        }
    }

    /// Clears both trackers.
    pub fn clear_all(&mut self) {
        self.rect.clear();
        self.contour.clear();
    }

    /// Called when the source image is loaded, replaced or removed.
    pub fn on_image_changed(&mut self, has_image: bool) {
        self.has_image = has_image;
        self.clear_all();
    }

    /// Called when a segmentation result has been published.
    pub fn on_result_received(&mut self) {
        self.clear_all();
    }
}
