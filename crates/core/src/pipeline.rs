//! Segmentation request pipeline.
//!
//! One invocation runs validate -> issue -> preprocess -> remote call ->
//! decode -> crop or pass through -> publish. Requests overlap freely, but
//! only the most recently issued one may ever change the published state:
//! every state-committing step first compares its captured request id with
//! the latest id, under the same lock that guards the state.
//!
//! Binary artifacts live in [`BlobHandle`]s, so intermediate handles are
//! released exactly once on every exit path, including supersession.

use crate::blob::{BlobHandle, BlobStore, ResultSlot};
use crate::error::{AppError, Result};
use crate::geometry::{BoundingBox, MIN_SELECTION_SIZE};
use crate::image_processing::{ImageProcessor, PreprocessOptions, PreprocessResult};
use crate::selection::SelectionMode;
use crate::service::SegmentationService;
use image::DynamicImage;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;

const RESULT_MIME: &str = "image/png";

/// What the crop stage should do with the cutout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentationTarget {
    /// Publish the full cutout unmodified.
    WholeImage,
    /// Crop the cutout to this box.
    Region(BoundingBox),
}

impl SegmentationTarget {
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            Self::WholeImage => None,
            Self::Region(bbox) => Some(*bbox),
        }
    }
}

/// The result currently on display.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedResult {
    pub request_id: u64,
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Whether the cutout was cropped to a selection.
    pub cropped: bool,
}

/// How an issued request ended, when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Published(PublishedResult),
    /// A newer request was issued first; nothing was changed.
    Discarded { request_id: u64 },
}

/// Read-only view of the pipeline for the view layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSnapshot {
    pub is_loading: bool,
    pub error: Option<String>,
    pub result: Option<PublishedResult>,
}

#[derive(Debug, Default)]
struct PipelineState {
    latest_request: u64,
    is_loading: bool,
    error: Option<String>,
    slot: ResultSlot,
    published: Option<PublishedResult>,
}

/// Runs segmentation requests with last-request-wins semantics.
pub struct SegmentationPipeline<S> {
    service: S,
    options: PreprocessOptions,
    store: BlobStore,
    state: Mutex<PipelineState>,
}

impl<S: SegmentationService> SegmentationPipeline<S> {
    pub fn new(service: S, options: PreprocessOptions, store: BlobStore) -> Self {
        Self {
            service,
            options,
            store,
            state: Mutex::new(PipelineState::default()),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        let state = self.state.lock();
        PipelineSnapshot {
            is_loading: state.is_loading,
            error: state.error.clone(),
            result: state.published.clone(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn set_error(&self, message: Option<String>) {
        self.state.lock().error = message;
    }

    /// Id of the most recently issued request (0 before the first).
    pub fn latest_request(&self) -> u64 {
        self.state.lock().latest_request
    }

    /// Encoded bytes of the displayed result.
    pub fn result_bytes(&self) -> Option<Arc<[u8]>> {
        self.state.lock().slot.get().map(BlobHandle::shared)
    }

    /// Checks the request preconditions.
    ///
    /// # Errors
    ///
    /// [`AppError::NoImageLoaded`] without a source image;
    /// [`AppError::SelectionTooSmall`] in a manual mode without a usable box.
    pub fn validate(
        source: Option<&Arc<[u8]>>,
        mode: SelectionMode,
        bbox: Option<BoundingBox>,
    ) -> Result<SegmentationTarget> {
        if source.is_none() {
            return Err(AppError::NoImageLoaded);
        }
        match mode {
            SelectionMode::Automatic => Ok(SegmentationTarget::WholeImage),
            SelectionMode::Rectangle | SelectionMode::Contour => bbox
                .filter(BoundingBox::is_usable)
                .map(SegmentationTarget::Region)
                .ok_or(AppError::SelectionTooSmall {
                    min: MIN_SELECTION_SIZE,
                }),
        }
    }

    /// Validates, issues and drives one request to completion.
    ///
    /// Validation failures set the user-facing error without touching the
    /// loading flag or the request counter. After issue, failures only reach
    /// the shared state if no newer request exists.
    ///
    /// # Errors
    ///
    /// Validation errors, and pipeline errors of the latest request.
    /// A superseded request resolves to [`RequestOutcome::Discarded`].
    pub async fn run(
        &self,
        source: Option<Arc<[u8]>>,
        mode: SelectionMode,
        bbox: Option<BoundingBox>,
    ) -> Result<RequestOutcome> {
        let target = match Self::validate(source.as_ref(), mode, bbox) {
            Ok(target) => target,
            Err(err) => {
                self.set_error(err.user_message().map(str::to_string));
                return Err(err);
            }
        };
        let Some(source) = source else {
            return Err(AppError::NoImageLoaded);
        };

        let request_id = self.issue();
        info!("segmentation request {} issued ({:?})", request_id, target);

        match self.execute(request_id, source, target).await {
            Ok(published) => Ok(RequestOutcome::Published(published)),
            Err(err) if err.is_stale() => {
                debug!("{}", err);
                Ok(RequestOutcome::Discarded { request_id })
            }
            Err(err) => {
                let mut state = self.state.lock();
                if state.latest_request != request_id {
                    debug!("request {} failed after being superseded: {}", request_id, err);
                    return Ok(RequestOutcome::Discarded { request_id });
                }
                warn!("segmentation request {} failed: {}", request_id, err);
                state.is_loading = false;
                state.error = err.user_message().map(str::to_string);
                Err(err)
            }
        }
    }

    fn issue(&self) -> u64 {
        let mut state = self.state.lock();
        state.latest_request += 1;
        state.is_loading = true;
        state.error = None;
        state.latest_request
    }

    fn ensure_current(&self, request_id: u64) -> Result<()> {
        if self.state.lock().latest_request == request_id {
            Ok(())
        } else {
            Err(AppError::StaleResultDiscarded { request_id })
        }
    }

    async fn execute(
        &self,
        request_id: u64,
        source: Arc<[u8]>,
        target: SegmentationTarget,
    ) -> Result<PublishedResult> {
        let processed = Self::preprocess(source, self.options).await?;
        debug!(
            "request {}: preprocessed {:?} -> {:?} ({:.2}x)",
            request_id, processed.original_size, processed.processed_size, processed.compression_ratio
        );
        let original_size = processed.original_size;

        let cutout = self.service.segment(processed.bytes, processed.mime_type).await?;
        self.ensure_current(request_id)?;

        // The full-result handle must outlive the crop below.
        let full = self.store.create(cutout, RESULT_MIME);
        let decoded = Self::decode(full.shared()).await?;
        self.ensure_current(request_id)?;

        match target {
            SegmentationTarget::WholeImage => {
                let size = (decoded.width(), decoded.height());
                self.publish(request_id, full, size, false)
            }
            SegmentationTarget::Region(bbox) => {
                let bbox = Self::to_cutout_space(bbox, original_size, (decoded.width(), decoded.height()));
                let rect = bbox.rounded();
                let cropped = Self::crop(decoded, bbox).await?;
                let handle = self.store.create(cropped, RESULT_MIME);
                let published = self.publish(request_id, handle, (rect.width, rect.height), true);
                drop(full);
                published
            }
        }
    }

    /// Maps a box in source pixels onto the cutout, which comes back at the
    /// preprocessed resolution.
    fn to_cutout_space(bbox: BoundingBox, source: (u32, u32), cutout: (u32, u32)) -> BoundingBox {
        if source == cutout || source.0 == 0 || source.1 == 0 {
            return bbox;
        }
        bbox.scaled(
            cutout.0 as f32 / source.0 as f32,
            cutout.1 as f32 / source.1 as f32,
        )
    }

    async fn preprocess(source: Arc<[u8]>, options: PreprocessOptions) -> Result<PreprocessResult> {
        tokio::task::spawn_blocking(move || ImageProcessor::preprocess(&source, &options))
            .await
            .map_err(|e| AppError::image(format!("Preprocess task failed: {}", e)))?
    }

    async fn decode(bytes: Arc<[u8]>) -> Result<DynamicImage> {
        tokio::task::spawn_blocking(move || ImageProcessor::decode(&bytes))
            .await
            .map_err(|e| AppError::decode(format!("Decode task failed: {}", e)))?
    }

    async fn crop(image: DynamicImage, bbox: BoundingBox) -> Result<Vec<u8>> {
        tokio::task::spawn_blocking(move || ImageProcessor::crop_to_box(&image, bbox))
            .await
            .map_err(|e| AppError::image(format!("Crop task failed: {}", e)))?
    }

    /// Installs `handle` as the displayed result if `request_id` is still current.
    fn publish(
        &self,
        request_id: u64,
        handle: BlobHandle,
        (width, height): (u32, u32),
        cropped: bool,
    ) -> Result<PublishedResult> {
        let mut state = self.state.lock();
        if state.latest_request != request_id {
            return Err(AppError::StaleResultDiscarded { request_id });
        }

        let published = PublishedResult {
            request_id,
            url: handle.url(),
            width,
            height,
            cropped,
        };
        state.slot.replace(Some(handle));
        state.published = Some(published.clone());
        state.is_loading = false;
        state.error = None;
        info!(
            "request {} published {}x{} result at {}",
            request_id, width, height, published.url
        );
        Ok(published)
    }

    /// Drops the displayed result and supersedes anything in flight.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.latest_request += 1;
        state.is_loading = false;
        state.error = None;
        state.published = None;
        state.slot.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Option<Arc<[u8]>> {
        Some(Arc::from(vec![0u8; 4]))
    }

    type Pipeline = SegmentationPipeline<crate::service::HttpSegmentationClient>;

    #[test]
    fn crop_box_follows_the_cutout_resolution() {
        let bbox = BoundingBox::new(100.0, 40.0, 400.0, 200.0);
        assert_eq!(Pipeline::to_cutout_space(bbox, (3000, 1500), (3000, 1500)), bbox);
        assert_eq!(
            Pipeline::to_cutout_space(bbox, (4000, 2000), (2000, 1000)),
            BoundingBox::new(50.0, 20.0, 200.0, 100.0)
        );
    }

    #[test]
    fn validation_requires_an_image() {
        assert!(matches!(
            Pipeline::validate(None, SelectionMode::Automatic, None),
            Err(AppError::NoImageLoaded)
        ));
    }

    #[test]
    fn automatic_mode_targets_whole_image() {
        let target = Pipeline::validate(
            source().as_ref(),
            SelectionMode::Automatic,
            Some(BoundingBox::new(0.0, 0.0, 50.0, 50.0)),
        )
        .unwrap();
        assert_eq!(target, SegmentationTarget::WholeImage);
        assert_eq!(target.bounding_box(), None);
    }

    #[test]
    fn manual_modes_need_a_usable_box() {
        for mode in [SelectionMode::Rectangle, SelectionMode::Contour] {
            assert!(matches!(
                Pipeline::validate(source().as_ref(), mode, None),
                Err(AppError::SelectionTooSmall { .. })
            ));
            assert!(matches!(
                Pipeline::validate(source().as_ref(), mode, Some(BoundingBox::new(0.0, 0.0, 9.0, 40.0))),
                Err(AppError::SelectionTooSmall { .. })
            ));

            let bbox = BoundingBox::new(1.0, 2.0, 30.0, 40.0);
            assert_eq!(
                Pipeline::validate(source().as_ref(), mode, Some(bbox)).unwrap(),
                SegmentationTarget::Region(bbox)
            );
        }
    }
}
