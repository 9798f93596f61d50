//! Editing session facade.
//!
//! [`CutoutEditor`] is what a view layer talks to. It owns the selection
//! controller, the canvas layout, the source image and the segmentation
//! pipeline, and exposes pointer handlers, mode accessors, queries, actions
//! and lifecycle hooks. Every method takes `&self`, so input keeps flowing
//! while [`confirm_selection`](CutoutEditor::confirm_selection) is awaiting
//! the service.

use crate::blob::BlobStore;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::geometry::{BoundingBox, Point};
use crate::image_processing::ImageProcessor;
use crate::layout::{CanvasLayoutSync, ImageId, ImageMetrics, RenderedRect};
use crate::overlay::{self, MIN_BRUSH_SIZE, OverlayShape};
use crate::pipeline::{PipelineSnapshot, PublishedResult, RequestOutcome, SegmentationPipeline};
use crate::selection::{SelectionMode, SelectionModeController};
use crate::service::SegmentationService;
use log::info;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name used when downloading into a directory.
pub const DEFAULT_DOWNLOAD_NAME: &str = "segmented_image.png";

/// The image the user is editing.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub id: ImageId,
    pub bytes: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Default)]
struct Session {
    controller: SelectionModeController,
    layout: CanvasLayoutSync,
    source: Option<SourceImage>,
    next_image_id: ImageId,
    brush_size: u8,
}

pub struct CutoutEditor<S> {
    session: Mutex<Session>,
    pipeline: SegmentationPipeline<S>,
}

impl<S: SegmentationService> CutoutEditor<S> {
    pub fn new(service: S, config: &Config) -> Self {
        Self::with_store(service, config, BlobStore::new())
    }

    /// Creates an editor whose handles live in `store`.
    pub fn with_store(service: S, config: &Config, store: BlobStore) -> Self {
        Self {
            session: Mutex::new(Session {
                brush_size: MIN_BRUSH_SIZE,
                ..Session::default()
            }),
            pipeline: SegmentationPipeline::new(service, config.preprocess, store),
        }
    }

    pub fn pipeline(&self) -> &SegmentationPipeline<S> {
        &self.pipeline
    }

    // -- lifecycle -------------------------------------------------------

    /// Replaces the source image.
    ///
    /// Clears both selections, drops the displayed result and supersedes any
    /// request still in flight.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ImageProcessing`] if the bytes are not a readable image.
    pub fn load_image(&self, bytes: Vec<u8>) -> Result<SourceImage> {
        let (width, height) = ImageProcessor::dimensions(&bytes)?;
        let mut session = self.session.lock();
        session.next_image_id += 1;
        let source = SourceImage {
            id: session.next_image_id,
            bytes: bytes.into(),
            width,
            height,
        };
        info!("image {} loaded ({}x{})", source.id, width, height);
        self.on_image_changed(&mut session, Some(source.clone()));
        Ok(source)
    }

    /// Removes the source image and everything derived from it.
    pub fn reset(&self) {
        let mut session = self.session.lock();
        self.on_image_changed(&mut session, None);
    }

    fn on_image_changed(&self, session: &mut Session, image: Option<SourceImage>) {
        self.pipeline.reset();
        session.controller.on_image_changed(image.is_some());
        session.layout.detach();
        if let Some(image) = &image {
            let pending = ImageMetrics {
                natural_width: image.width,
                natural_height: image.height,
                rendered: None,
            };
            session.layout.attach(image.id, &pending);
        }
        session.source = image;
    }

    /// Reports where the image is rendered after layout or a viewport resize.
    pub fn on_viewport_resized(&self, rendered: RenderedRect) {
        let mut session = self.session.lock();
        let Some((id, width, height)) = session.source.as_ref().map(|s| (s.id, s.width, s.height))
        else {
            return;
        };
        session
            .layout
            .on_viewport_resized(id, &ImageMetrics::new(width, height, rendered));
    }

    pub fn source(&self) -> Option<SourceImage> {
        self.session.lock().source.clone()
    }

    pub fn canvas_scale(&self) -> f32 {
        self.session.lock().layout.canvas_scale()
    }

    // -- pointer input ---------------------------------------------------

    pub fn on_pointer_down(&self, raw: Point) {
        let mut session = self.session.lock();
        let Session { controller, layout, .. } = &mut *session;
        controller.pointer_down(raw, layout.surface());
    }

    pub fn on_pointer_move(&self, raw: Point) {
        let mut session = self.session.lock();
        let Session { controller, layout, .. } = &mut *session;
        controller.pointer_move(raw, layout.surface());
    }

    pub fn on_pointer_up(&self) {
        self.session.lock().controller.pointer_up();
    }

    // -- mode and queries ------------------------------------------------

    pub fn mode(&self) -> SelectionMode {
        self.session.lock().controller.mode()
    }

    pub fn set_mode(&self, mode: SelectionMode) {
        self.session.lock().controller.set_mode(mode);
    }

    pub fn has_usable_selection(&self) -> bool {
        self.session.lock().controller.has_usable_selection()
    }

    pub fn can_undo(&self) -> bool {
        self.session.lock().controller.can_undo()
    }

    pub fn current_bounding_box(&self) -> Option<BoundingBox> {
        self.session.lock().controller.current_bounding_box()
    }

    pub fn set_brush_size(&self, size: u8) {
        self.session.lock().brush_size = size.clamp(MIN_BRUSH_SIZE, overlay::MAX_BRUSH_SIZE);
    }

    /// Drawing primitives for the current selection state.
    pub fn overlay(&self) -> Vec<OverlayShape> {
        let session = self.session.lock();
        overlay::build(&session.controller, session.layout.canvas_scale(), session.brush_size)
    }

    /// The result currently on display.
    pub fn result(&self) -> Option<PublishedResult> {
        self.pipeline.snapshot().result
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.pipeline.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.pipeline.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.pipeline.error()
    }

    // -- actions ---------------------------------------------------------

    pub fn undo(&self) {
        self.session.lock().controller.undo();
    }

    pub fn clear_all(&self) {
        self.session.lock().controller.clear_all();
    }

    /// Sends the current selection for segmentation.
    ///
    /// On a published result both selections are cleared. A request that was
    /// superseded while in flight resolves to [`RequestOutcome::Discarded`]
    /// and changes nothing.
    ///
    /// # Errors
    ///
    /// [`AppError::NoImageLoaded`] and [`AppError::SelectionTooSmall`] before
    /// anything is sent; transport, service and decode errors afterwards.
    /// Selections are left intact on every error.
    pub async fn confirm_selection(&self) -> Result<RequestOutcome> {
        let (source, mode, bbox) = {
            let session = self.session.lock();
            (
                session.source.as_ref().map(|s| s.bytes.clone()),
                session.controller.mode(),
                session.controller.bounding_box_for_segmentation(),
            )
        };

        let outcome = self.pipeline.run(source, mode, bbox).await?;
        if matches!(outcome, RequestOutcome::Published(_)) {
            self.session.lock().controller.on_result_received();
        }
        Ok(outcome)
    }

    /// Encoded PNG of the displayed result, if any.
    pub fn result_bytes(&self) -> Option<Arc<[u8]>> {
        self.pipeline.result_bytes()
    }

    /// Displayed result as a `data:` URL.
    pub fn result_data_url(&self) -> Option<String> {
        self.result_bytes()
            .map(|bytes| ImageProcessor::to_data_url(&bytes, "image/png"))
    }

    /// Writes the displayed result to `path`.
    ///
    /// If `path` is a directory the file is named [`DEFAULT_DOWNLOAD_NAME`].
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NoResult`] when nothing is displayed, or an I/O error.
    pub fn download(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let bytes = self
            .result_bytes()
            .ok_or(AppError::NoResult)?;

        let path = path.as_ref();
        let target = if path.is_dir() {
            path.join(DEFAULT_DOWNLOAD_NAME)
        } else {
            path.to_path_buf()
        };
        fs::write(&target, &bytes)?;
        info!("result written to {}", target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    /// Answers every request with a fixed cutout.
    struct FixedCutout(Vec<u8>);

    impl SegmentationService for FixedCutout {
        fn segment(&self, _image: Vec<u8>, _mime: &'static str) -> BoxFuture<'_, Result<Vec<u8>>> {
            let cutout = self.0.clone();
            Box::pin(async move { Ok(cutout) })
        }
    }

    fn editor() -> CutoutEditor<FixedCutout> {
        let config = Config::builder().build().unwrap();
        let editor = CutoutEditor::new(FixedCutout(png(200, 100)), &config);
        editor.load_image(png(200, 100)).unwrap();
        editor.on_viewport_resized(RenderedRect {
            left: 0.0,
            top: 0.0,
            width: 100.0,
            height: 50.0,
        });
        editor
    }

    fn drag(editor: &CutoutEditor<FixedCutout>, from: (f32, f32), to: (f32, f32)) {
        editor.on_pointer_down(Point::new(from.0, from.1));
        editor.on_pointer_move(Point::new(to.0, to.1));
        editor.on_pointer_up();
    }

    #[test]
    fn load_rejects_non_images() {
        let config = Config::builder().build().unwrap();
        let editor = CutoutEditor::new(FixedCutout(Vec::new()), &config);
        assert!(matches!(editor.load_image(b"nope".to_vec()), Err(AppError::ImageProcessing(_))));
        assert!(editor.source().is_none());
    }

    #[test]
    fn pointer_input_is_mapped_through_the_layout() {
        let editor = editor();
        assert_eq!(editor.canvas_scale(), 2.0);

        editor.set_mode(SelectionMode::Rectangle);
        drag(&editor, (10.0, 5.0), (30.0, 25.0));
        assert_eq!(
            editor.current_bounding_box(),
            Some(BoundingBox::new(20.0, 10.0, 40.0, 40.0))
        );
        assert!(editor.has_usable_selection());
        assert!(!editor.overlay().is_empty());
    }

    #[tokio::test]
    async fn confirmed_rectangle_is_cropped_and_cleared() {
        let editor = editor();
        editor.set_mode(SelectionMode::Rectangle);
        drag(&editor, (10.0, 5.0), (30.0, 25.0));

        let outcome = editor.confirm_selection().await.unwrap();
        let RequestOutcome::Published(result) = outcome else {
            panic!("expected a published result");
        };
        assert!(result.cropped);
        assert_eq!((result.width, result.height), (40, 40));
        assert!(!editor.has_usable_selection());
        assert!(!editor.is_loading());
        assert_eq!(editor.error(), None);
        assert_eq!(editor.result(), Some(result));
        assert!(editor.result_data_url().unwrap().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn too_small_selection_keeps_the_drawing() {
        let editor = editor();
        editor.set_mode(SelectionMode::Contour);
        drag(&editor, (10.0, 10.0), (12.0, 12.0));

        let err = editor.confirm_selection().await.unwrap_err();
        assert!(matches!(err, AppError::SelectionTooSmall { .. }));
        assert!(editor.can_undo());
        assert_eq!(
            editor.error().as_deref(),
            Some("Selection is too small, please draw a larger area")
        );
        assert!(editor.result_bytes().is_none());
    }

    #[tokio::test]
    async fn reset_releases_the_result() {
        let editor = editor();
        editor.confirm_selection().await.unwrap();
        let store = editor.pipeline().store().clone();
        assert_eq!(store.live_count(), 1);

        editor.reset();
        assert_eq!(store.live_count(), 0);
        assert!(editor.source().is_none());
        assert_eq!(editor.snapshot(), PipelineSnapshot::default());
    }

    #[tokio::test]
    async fn download_into_a_directory_uses_the_default_name() {
        let editor = editor();
        assert!(matches!(
            editor.download(std::env::temp_dir()),
            Err(AppError::NoResult)
        ));

        editor.confirm_selection().await.unwrap();
        let dir = std::env::temp_dir().join(format!("cutout-editor-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let written = editor.download(&dir).unwrap();

        assert_eq!(written, dir.join(DEFAULT_DOWNLOAD_NAME));
        assert_eq!(ImageProcessor::dimensions(&fs::read(&written).unwrap()).unwrap(), (200, 100));
        fs::remove_dir_all(&dir).unwrap();
    }
}
