//! Geometry primitives in image-native pixel space.
//!
//! Every [`Point`] and [`BoundingBox`] past the coordinate mapper is expressed
//! in pixels of the loaded image, never in on-screen units.

use serde::{Deserialize, Serialize};

/// Minimum edge length (in image pixels) a manual selection must reach.
pub const MIN_SELECTION_SIZE: f32 = 10.0;

/// A position in image-native pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box with non-negative size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Zero-size box anchored at `p`.
    pub fn at(p: Point) -> Self {
        Self::new(p.x, p.y, 0.0, 0.0)
    }

    /// Box with every coordinate multiplied by `sx` horizontally and `sy` vertically.
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy)
    }

    /// Box spanning two opposite corners, whichever direction the drag went.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        Self {
            x: if dx > 0.0 { a.x } else { b.x },
            y: if dy > 0.0 { a.y } else { b.y },
            width: dx.abs(),
            height: dy.abs(),
        }
    }

    /// Smallest box enclosing every point, or `None` for an empty iterator.
    pub fn enclosing<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in iter {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }

    /// Whether the box clears the 10x10 usability threshold.
    pub fn is_usable(&self) -> bool {
        self.width >= MIN_SELECTION_SIZE && self.height >= MIN_SELECTION_SIZE
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Integer pixel rectangle with every component rounded independently.
    pub fn rounded(&self) -> PixelRect {
        PixelRect {
            x: self.x.round() as i64,
            y: self.y.round() as i64,
            width: self.width.round().max(0.0) as u32,
            height: self.height.round().max(0.0) as u32,
        }
    }
}

/// Integer crop rectangle. The origin may be negative or past the image edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_corners_handles_every_drag_direction() {
        let origin = Point::new(50.0, 50.0);
        let expected = |x, y| BoundingBox::new(x, y, 20.0, 30.0);

        // down-right, up-left, down-left, up-right
        assert_eq!(BoundingBox::from_corners(origin, Point::new(70.0, 80.0)), expected(50.0, 50.0));
        assert_eq!(BoundingBox::from_corners(origin, Point::new(30.0, 20.0)), expected(30.0, 20.0));
        assert_eq!(BoundingBox::from_corners(origin, Point::new(30.0, 80.0)), expected(30.0, 50.0));
        assert_eq!(BoundingBox::from_corners(origin, Point::new(70.0, 20.0)), expected(50.0, 20.0));
    }

    #[test]
    fn enclosing_empty_is_none() {
        assert_eq!(BoundingBox::enclosing(&Vec::<Point>::new()), None);
    }

    #[test]
    fn usable_threshold_is_inclusive() {
        assert!(BoundingBox::new(0.0, 0.0, 10.0, 10.0).is_usable());
        assert!(!BoundingBox::new(0.0, 0.0, 9.9, 50.0).is_usable());
        assert!(!BoundingBox::new(0.0, 0.0, 50.0, 9.9).is_usable());
    }

    #[test]
    fn scaled_multiplies_position_and_size() {
        let scaled = BoundingBox::new(10.0, 20.0, 30.0, 40.0).scaled(0.5, 0.25);
        assert_eq!(scaled, BoundingBox::new(5.0, 5.0, 15.0, 10.0));
    }

    #[test]
    fn rounded_rounds_each_component() {
        let rect = BoundingBox::new(1.4, 2.6, 10.5, 9.49).rounded();
        assert_eq!(rect, PixelRect { x: 1, y: 3, width: 11, height: 9 });
    }
}
