//! Selection overlay display list.
//!
//! This module turns the controller's state into drawing primitives for the
//! view layer: the in-progress and committed rectangles, contour strokes, and
//! the size labels. All lengths are in drawing-surface units, i.e. already
//! multiplied by the canvas scale so they look the same at any zoom.

use crate::geometry::{BoundingBox, Point};
use crate::selection::{ActiveSelection, SelectionModeController};

/// Brush size slider bounds.
pub const MIN_BRUSH_SIZE: u8 = 1;
pub const MAX_BRUSH_SIZE: u8 = 5;

/// Straight-alpha RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b, 255)
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self(self.0, self.1, self.2, a)
    }
}

const DRAFT_COLOR: Rgba = Rgba::opaque(0x66, 0x7e, 0xea);
const PREVIEW_COLOR: Rgba = Rgba::opaque(0x48, 0xbb, 0x78);
const CONTOUR_COLOR: Rgba = Rgba::opaque(0x3b, 0x82, 0xf6);
// 20% fill
const FILL_ALPHA: u8 = 51;

/// One drawing primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    /// Filled, outlined rectangle.
    Rect {
        rect: BoundingBox,
        stroke: Rgba,
        fill: Rgba,
        width: f32,
        dash: Option<[f32; 2]>,
    },
    /// Open polyline with round caps and joins.
    Polyline {
        points: Vec<Point>,
        color: Rgba,
        width: f32,
        dash: Option<[f32; 2]>,
    },
    /// Bold text anchored at its baseline start.
    Label {
        text: String,
        pos: Point,
        font_size: f32,
        color: Rgba,
    },
}

/// Builds the overlay for the controller's active mode.
///
/// `scale` is the canvas scale; `brush_size` is clamped to the slider range.
pub fn build(controller: &SelectionModeController, scale: f32, brush_size: u8) -> Vec<OverlayShape> {
    let brush = brush_size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE) as f32;
    let mut shapes = Vec::new();

    match controller.active() {
        ActiveSelection::Automatic => {}
        ActiveSelection::Rectangle(rect) => {
            if let Some(current) = rect.current_box() {
                draft_rect(&mut shapes, current, scale, brush);
            }
            if let Some(preview) = rect.preview_box() {
                preview_rect(&mut shapes, preview, scale, brush);
            }
        }
        ActiveSelection::Contour(contour) => {
            let width = brush * scale;
            for path in contour.contour_paths().iter().filter(|p| p.len() > 1) {
                shapes.push(OverlayShape::Polyline {
                    points: path.clone(),
                    color: CONTOUR_COLOR,
                    width,
                    dash: None,
                });
            }
            if contour.current_path().len() > 1 {
                shapes.push(OverlayShape::Polyline {
                    points: contour.current_path().to_vec(),
                    color: CONTOUR_COLOR,
                    width,
                    dash: Some([5.0 * scale, 5.0 * scale]),
                });
            }
        }
    }
    shapes
}

fn line_width(scale: f32, brush: f32) -> f32 {
    brush.max(1.0) * scale
}

fn size_label(rect: BoundingBox, scale: f32, brush: f32, color: Rgba) -> OverlayShape {
    OverlayShape::Label {
        text: format!("{} × {}", rect.width.round(), rect.height.round()),
        pos: Point::new(rect.x, rect.y - 10.0 * scale),
        font_size: (14.0 * (brush / 2.0)).max(10.0) * scale,
        color,
    }
}

fn draft_rect(shapes: &mut Vec<OverlayShape>, rect: BoundingBox, scale: f32, brush: f32) {
    shapes.push(OverlayShape::Rect {
        rect,
        stroke: DRAFT_COLOR,
        fill: DRAFT_COLOR.with_alpha(FILL_ALPHA),
        width: line_width(scale, brush),
        dash: Some([5.0 * scale, 5.0 * scale]),
    });
    shapes.push(size_label(rect, scale, brush, DRAFT_COLOR));
}

fn preview_rect(shapes: &mut Vec<OverlayShape>, rect: BoundingBox, scale: f32, brush: f32) {
    let width = line_width(scale, brush);
    shapes.push(OverlayShape::Rect {
        rect,
        stroke: PREVIEW_COLOR,
        fill: PREVIEW_COLOR.with_alpha(FILL_ALPHA),
        width,
        dash: Some([10.0 * scale, 5.0 * scale]),
    });

    let corner = (10.0 * (brush / 2.0)).max(6.0) * scale;
    let (l, t, r, b) = (rect.x, rect.y, rect.right(), rect.bottom());
    let brackets = [
        [(l, t + corner), (l, t), (l + corner, t)],
        [(r - corner, t), (r, t), (r, t + corner)],
        [(r, b - corner), (r, b), (r - corner, b)],
        [(l + corner, b), (l, b), (l, b - corner)],
    ];
    for bracket in brackets {
        shapes.push(OverlayShape::Polyline {
            points: bracket.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            color: PREVIEW_COLOR,
            width: width * 1.5,
            dash: None,
        });
    }
    shapes.push(size_label(rect, scale, brush, PREVIEW_COLOR));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::SurfaceGeometry;
    use crate::selection::SelectionMode;

    fn surface() -> SurfaceGeometry {
        SurfaceGeometry {
            left: 0.0,
            top: 0.0,
            display_width: 100.0,
            display_height: 100.0,
            native_width: 100,
            native_height: 100,
        }
    }

    fn controller(mode: SelectionMode) -> SelectionModeController {
        let mut controller = SelectionModeController::new();
        controller.on_image_changed(true);
        controller.set_mode(mode);
        controller
    }

    #[test]
    fn automatic_mode_draws_nothing() {
        assert!(build(&controller(SelectionMode::Automatic), 1.0, 1).is_empty());
    }

    #[test]
    fn committed_rectangle_has_brackets_and_label() {
        let mut controller = controller(SelectionMode::Rectangle);
        controller.pointer_down(Point::new(10.0, 20.0), Some(&surface()));
        controller.pointer_move(Point::new(40.4, 60.0), Some(&surface()));
        controller.pointer_up();

        let shapes = build(&controller, 2.0, 1);
        // outline, four brackets, label
        assert_eq!(shapes.len(), 6);
        match &shapes[0] {
            OverlayShape::Rect { width, dash, stroke, .. } => {
                assert_eq!(*width, 2.0);
                assert_eq!(*dash, Some([20.0, 10.0]));
                assert_eq!(*stroke, PREVIEW_COLOR);
            }
            other => panic!("unexpected shape {:?}", other),
        }
        match shapes.last() {
            Some(OverlayShape::Label { text, pos, font_size, .. }) => {
                assert_eq!(text, "30 × 40");
                assert_eq!(*pos, Point::new(10.0, 0.0));
                assert_eq!(*font_size, 20.0);
            }
            other => panic!("unexpected shape {:?}", other),
        }
    }

    #[test]
    fn in_progress_stroke_is_dashed() {
        let mut controller = controller(SelectionMode::Contour);
        controller.pointer_down(Point::new(0.0, 0.0), Some(&surface()));
        controller.pointer_move(Point::new(5.0, 5.0), Some(&surface()));
        controller.pointer_up();
        controller.pointer_down(Point::new(10.0, 10.0), Some(&surface()));
        controller.pointer_move(Point::new(20.0, 20.0), Some(&surface()));

        let shapes = build(&controller, 1.5, 3);
        assert_eq!(shapes.len(), 2);
        assert!(matches!(&shapes[0], OverlayShape::Polyline { dash: None, width, .. } if *width == 4.5));
        assert!(matches!(&shapes[1], OverlayShape::Polyline { dash: Some(_), .. }));
    }

    #[test]
    fn brush_size_is_clamped() {
        let mut controller = controller(SelectionMode::Contour);
        controller.pointer_down(Point::new(0.0, 0.0), Some(&surface()));
        controller.pointer_move(Point::new(5.0, 5.0), Some(&surface()));
        controller.pointer_up();

        let shapes = build(&controller, 1.0, 40);
        assert!(matches!(&shapes[0], OverlayShape::Polyline { width, .. } if *width == 5.0));
    }
}
