//! Cutout Core Library
//!
//! This library provides the core of the cutout editor: interactive
//! region selection over a displayed image, and a segmentation pipeline that
//! sends the image to a remote background-removal service and publishes the
//! (optionally cropped) transparent cutout.
//!
//! # Overview
//!
//! - **Selection**: rectangle and freehand contour trackers behind a
//!   mode controller, see [`selection`]
//! - **Coordinates**: pointer positions to native image pixels via [`coords`]
//!   and [`layout`]
//! - **Pipeline**: preprocess, segment, crop and publish with
//!   last-request-wins semantics via [`pipeline`]
//! - **Editor**: the facade a view layer drives, see [`CutoutEditor`]
//!
//! # Quick Start
//!
//! ```ignore
//! use cutout_core::{Config, CutoutEditor, HttpSegmentationClient, SelectionMode};
//!
//! cutout_core::init();
//! let config = Config::load()?;
//! let editor = CutoutEditor::new(HttpSegmentationClient::new(&config)?, &config);
//!
//! editor.load_image(std::fs::read("photo.jpg")?)?;
//! editor.set_mode(SelectionMode::Rectangle);
//! // ... pointer events from the view ...
//! editor.confirm_selection().await?;
//! editor.download("out.png")?;
//! ```
//!
//! # Module Structure
//!
//! - [`blob`]: in-memory handles for binary results
//! - [`config`]: configuration loading and management
//! - [`error`]: error types and result aliases
//! - [`id_photo`]: ID-photo composition on a solid background
//! - [`image_processing`]: preprocessing, decoding and cropping
//! - [`overlay`]: selection drawing primitives
//! - [`service`]: the remote segmentation service

pub mod blob;
pub mod config;
pub mod coords;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod id_photo;
pub mod image_processing;
pub mod layout;
pub mod overlay;
pub mod pipeline;
pub mod selection;
pub mod service;

// Re-export primary types for convenience
pub use blob::{BlobHandle, BlobStore};
pub use config::Config;
pub use coords::{CoordinateMapper, SurfaceGeometry};
pub use editor::CutoutEditor;
pub use error::{AppError, Result};
pub use geometry::{BoundingBox, Point};
pub use layout::{CanvasLayoutSync, RenderedRect};
pub use pipeline::{PublishedResult, RequestOutcome, SegmentationPipeline};
pub use selection::{SelectionMode, SelectionModeController};
pub use service::{HttpSegmentationClient, SegmentationService};

/// Loads `.env` files if present.
///
/// Call this once at application startup before [`Config::load`].
pub fn init() {
    let _ = dotenvy::dotenv();
}
