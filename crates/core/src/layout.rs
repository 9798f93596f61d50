//! Keeps the drawing surface aligned with the displayed image.
//!
//! The surface's backing store always matches the image's natural pixel size
//! (one drawing unit per image pixel) while its displayed size follows the
//! image's rendered size, so the overlay lines up under any responsive
//! scaling.

use crate::coords::SurfaceGeometry;
use log::debug;

/// Identity of a loaded image; layout events for any other image are ignored.
pub type ImageId = u64;

/// Where and how large the image is currently rendered on screen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderedRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Measurements of the image element at one moment.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImageMetrics {
    pub natural_width: u32,
    pub natural_height: u32,
    /// `None` until the image has been laid out.
    pub rendered: Option<RenderedRect>,
}

impl ImageMetrics {
    pub fn new(natural_width: u32, natural_height: u32, rendered: RenderedRect) -> Self {
        Self {
            natural_width,
            natural_height,
            rendered: Some(rendered),
        }
    }

    fn is_ready(&self) -> bool {
        self.natural_width > 0
            && self.natural_height > 0
            && self.rendered.is_some_and(|r| r.width > 0.0 && r.height > 0.0)
    }
}

/// Synchronizes the drawing surface with the image it overlays.
#[derive(Debug, Clone)]
pub struct CanvasLayoutSync {
    watching: Option<ImageId>,
    surface: Option<SurfaceGeometry>,
    canvas_scale: f32,
}

impl Default for CanvasLayoutSync {
    fn default() -> Self {
        Self {
            watching: None,
            surface: None,
            canvas_scale: 1.0,
        }
    }
}

impl CanvasLayoutSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `image`, replacing whatever was tracked before.
    pub fn attach(&mut self, image: ImageId, metrics: &ImageMetrics) {
        self.watching = Some(image);
        self.surface = None;
        self.canvas_scale = 1.0;
        self.sync(metrics);
    }

    /// Re-measures after a viewport resize or a late image load.
    pub fn on_viewport_resized(&mut self, image: ImageId, metrics: &ImageMetrics) {
        if self.watching == Some(image) {
            self.sync(metrics);
        }
    }

    /// Stops tracking; later layout events are ignored until the next attach.
    pub fn detach(&mut self) {
        self.watching = None;
        self.surface = None;
        self.canvas_scale = 1.0;
    }

    fn sync(&mut self, metrics: &ImageMetrics) {
        if !metrics.is_ready() {
            return;
        }
        let Some(rendered) = metrics.rendered else {
            return;
        };
        let surface = SurfaceGeometry {
            left: rendered.left,
            top: rendered.top,
            display_width: rendered.width,
            display_height: rendered.height,
            native_width: metrics.natural_width,
            native_height: metrics.natural_height,
        };
        self.canvas_scale = metrics.natural_width as f32 / rendered.width;
        if self.surface != Some(surface) {
            debug!(
                "canvas synced: native {}x{}, displayed {:.0}x{:.0}, scale {:.3}",
                surface.native_width,
                surface.native_height,
                surface.display_width,
                surface.display_height,
                self.canvas_scale
            );
        }
        self.surface = Some(surface);
    }

    pub fn watching(&self) -> Option<ImageId> {
        self.watching
    }

    pub fn surface(&self) -> Option<&SurfaceGeometry> {
        self.surface.as_ref()
    }

    /// Natural width over displayed width.
    pub fn canvas_scale(&self) -> f32 {
        self.canvas_scale
    }

    /// Converts a display-unit length (line width, font size) to drawing units.
    pub fn to_surface_units(&self, display_units: f32) -> f32 {
        display_units * self.canvas_scale
    }
}
