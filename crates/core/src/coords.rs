//! Screen-to-image coordinate mapping.
//!
//! The drawing surface is shown at a CSS-scaled size (e.g. 500x400) while its
//! backing store has the natural resolution of the image (e.g. 1000x800).
//! Pointer events arrive in screen units and must be converted to image
//! pixels before any tracker sees them.

use crate::geometry::Point;

/// On-screen placement and native resolution of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceGeometry {
    /// Screen-space left edge of the displayed surface.
    pub left: f32,
    /// Screen-space top edge of the displayed surface.
    pub top: f32,
    /// Displayed width in screen units.
    pub display_width: f32,
    /// Displayed height in screen units.
    pub display_height: f32,
    /// Backing-store width in image pixels.
    pub native_width: u32,
    /// Backing-store height in image pixels.
    pub native_height: u32,
}

impl SurfaceGeometry {
    fn scale(&self) -> Option<(f32, f32)> {
        if self.display_width <= 0.0 || self.display_height <= 0.0 {
            return None;
        }
        Some((
            self.native_width as f32 / self.display_width,
            self.native_height as f32 / self.display_height,
        ))
    }
}

/// Converts raw pointer positions into image-native pixel coordinates.
///
/// Stateless: geometry is supplied per event because the viewport may have
/// been resized since the previous one.
pub struct CoordinateMapper;

impl CoordinateMapper {
    /// Maps a raw screen position onto the surface's native pixel grid.
    ///
    /// Returns the origin when the surface is not mounted or has no
    /// displayed area yet.
    pub fn map(surface: Option<&SurfaceGeometry>, raw: Point) -> Point {
        let Some(surface) = surface else {
            return Point::ZERO;
        };
        let Some((scale_x, scale_y)) = surface.scale() else {
            return Point::ZERO;
        };
        Point::new(
            (raw.x - surface.left) * scale_x,
            (raw.y - surface.top) * scale_y,
        )
    }
}
