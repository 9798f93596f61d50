//! Multi-stroke freehand contour selection.

use crate::geometry::{BoundingBox, Point};
use log::debug;

/// One continuous freehand drag.
pub type Stroke = Vec<Point>;

/// Append-only list of completed strokes plus one in-progress stroke.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContourSelectionTracker {
    is_drawing: bool,
    contour_paths: Vec<Stroke>,
    current_path: Stroke,
}

impl ContourSelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a new stroke at `pos`. Always allowed.
    pub fn start(&mut self, pos: Point) {
        self.is_drawing = true;
        self.current_path = vec![pos];
    }

    /// Appends `pos` to the in-progress stroke. Callers gate on [`is_drawing`](Self::is_drawing).
    pub fn update(&mut self, pos: Point) {
        self.current_path.push(pos);
    }

    /// Finishes the stroke; a stroke with fewer than two points leaves no geometry.
    pub fn end(&mut self) {
        let path = std::mem::take(&mut self.current_path);
        if path.len() > 1 {
            debug!("contour stroke {} completed with {} points", self.contour_paths.len(), path.len());
            self.contour_paths.push(path);
        }
        self.is_drawing = false;
    }

    /// Pops the most recently completed stroke.
    pub fn undo_last_stroke(&mut self) {
        self.contour_paths.pop();
    }

    /// Drops every completed and in-progress point.
    pub fn clear(&mut self) {
        self.contour_paths.clear();
        self.current_path.clear();
    }

    /// Box enclosing all completed strokes and the in-progress one.
    ///
    /// Computed on every call since it is queried mid-gesture.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::enclosing(
            self.contour_paths
                .iter()
                .flatten()
                .chain(self.current_path.iter()),
        )
    }

    pub fn is_drawing(&self) -> bool {
        self.is_drawing
    }

    pub fn contour_paths(&self) -> &[Stroke] {
        &self.contour_paths
    }

    pub fn current_path(&self) -> &[Point] {
        &self.current_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(tracker: &mut ContourSelectionTracker, points: &[(f32, f32)]) {
        let mut iter = points.iter().map(|&(x, y)| Point::new(x, y));
        if let Some(first) = iter.next() {
            tracker.start(first);
        }
        for p in iter {
            tracker.update(p);
        }
        tracker.end();
    }

    #[test]
    fn bounding_box_spans_all_strokes() {
        let mut tracker = ContourSelectionTracker::new();
        stroke(&mut tracker, &[(0.0, 0.0), (10.0, 0.0)]);
        stroke(&mut tracker, &[(0.0, 10.0), (10.0, 10.0)]);

        assert_eq!(tracker.bounding_box(), Some(BoundingBox::new(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn bounding_box_includes_in_progress_stroke() {
        let mut tracker = ContourSelectionTracker::new();
        stroke(&mut tracker, &[(0.0, 0.0), (10.0, 10.0)]);
        tracker.start(Point::new(40.0, 5.0));
        tracker.update(Point::new(45.0, 30.0));

        assert_eq!(tracker.bounding_box(), Some(BoundingBox::new(0.0, 0.0, 45.0, 30.0)));
    }

    #[test]
    fn empty_tracker_has_no_box() {
        assert_eq!(ContourSelectionTracker::new().bounding_box(), None);
    }

    #[test]
    fn single_point_stroke_is_dropped() {
        let mut tracker = ContourSelectionTracker::new();
        stroke(&mut tracker, &[(3.0, 3.0)]);
        assert!(tracker.contour_paths().is_empty());
        assert!(tracker.current_path().is_empty());
        assert!(!tracker.is_drawing());
    }

    #[test]
    fn undo_pops_strokes_until_empty() {
        let mut tracker = ContourSelectionTracker::new();
        for i in 0..3 {
            let offset = i as f32 * 20.0;
            stroke(&mut tracker, &[(offset, 0.0), (offset + 5.0, 5.0)]);
        }
        assert_eq!(tracker.contour_paths().len(), 3);

        for remaining in (0..3).rev() {
            tracker.undo_last_stroke();
            assert_eq!(tracker.contour_paths().len(), remaining);
        }

        let before = tracker.clone();
        tracker.undo_last_stroke();
        assert_eq!(tracker, before);
    }

    #[test]
    fn undo_removes_most_recent_stroke_first() {
        let mut tracker = ContourSelectionTracker::new();
        stroke(&mut tracker, &[(0.0, 0.0), (1.0, 1.0)]);
        stroke(&mut tracker, &[(50.0, 50.0), (60.0, 60.0)]);
        tracker.undo_last_stroke();

        assert_eq!(tracker.contour_paths(), &[vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]]);
    }

    #[test]
    fn clear_drops_everything() {
        let mut tracker = ContourSelectionTracker::new();
        stroke(&mut tracker, &[(0.0, 0.0), (20.0, 20.0)]);
        tracker.start(Point::new(5.0, 5.0));
        tracker.clear();

        assert!(tracker.contour_paths().is_empty());
        assert!(tracker.current_path().is_empty());
        assert_eq!(tracker.bounding_box(), None);
    }
}
