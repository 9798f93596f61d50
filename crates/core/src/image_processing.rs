//! Image processing and encoding utilities.
//!
//! This module handles the stateless transforms around the segmentation
//! call: downscaling and re-encoding the upload, decoding the returned
//! cutout, and cropping it to the user's selection.
//!
//! # Crop semantics
//!
//! Cropping copies pixels one-to-one with no resampling. The output always
//! has the rounded size of the requested box; any part of the box that lies
//! outside the decoded image comes out fully transparent.

use crate::error::{AppError, Result};
use crate::geometry::BoundingBox;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Longer-edge cap applied before upload.
pub const DEFAULT_MAX_EDGE: u32 = 2048;

/// Lossy re-encode quality applied before upload.
pub const DEFAULT_QUALITY: f32 = 0.85;

/// Output encoding for [`ImageProcessor::preprocess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

/// Settings for the upload transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreprocessOptions {
    /// Longest allowed edge; larger images are scaled down proportionally.
    pub max_edge: u32,
    /// Encoder quality in `[0, 1]`. Only JPEG is lossy.
    pub quality: f32,
    pub format: OutputFormat,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            max_edge: DEFAULT_MAX_EDGE,
            quality: DEFAULT_QUALITY,
            format: OutputFormat::Jpeg,
        }
    }
}

/// Output of [`ImageProcessor::preprocess`].
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub original_size: (u32, u32),
    pub processed_size: (u32, u32),
    /// Encoded output size over input size.
    pub compression_ratio: f32,
}

/// Image processing utilities for the segmentation workflow.
///
/// This struct provides static methods for processing images before upload
/// and after the cutout comes back.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Downscales (never upscales) and re-encodes an uploaded image.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ImageProcessing`] if the input cannot be decoded
    /// or the output cannot be encoded.
    pub fn preprocess(bytes: &[u8], options: &PreprocessOptions) -> Result<PreprocessResult> {
        let original = image::load_from_memory(bytes)
            .map_err(|e| AppError::image(format!("Failed to load image: {}", e)))?;

        let (width, height) = (original.width(), original.height());
        let (target_w, target_h) = Self::fit_within(width, height, options.max_edge);

        let resized = if (target_w, target_h) == (width, height) {
            original
        } else {
            original.resize_exact(target_w, target_h, FilterType::Triangle)
        };

        let encoded = Self::encode(&resized, options.format, options.quality)?;
        let compression_ratio = if bytes.is_empty() {
            0.0
        } else {
            encoded.len() as f32 / bytes.len() as f32
        };

        Ok(PreprocessResult {
            bytes: encoded,
            mime_type: options.format.mime_type(),
            original_size: (width, height),
            processed_size: (target_w, target_h),
            compression_ratio,
        })
    }

    /// Dimensions after proportional scaling so the longer edge is at most `max_edge`.
    pub fn fit_within(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
        let longer = width.max(height);
        if longer == 0 || longer <= max_edge {
            return (width, height);
        }
        let scale = max_edge as f64 / longer as f64;
        let scaled = |v: u32| ((v as f64 * scale).round() as u32).max(1);
        (scaled(width), scaled(height))
    }

    /// Reads the pixel dimensions from the header without decoding the image.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ImageProcessing`] for unrecognised formats.
    pub fn dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| AppError::image(format!("Failed to read image header: {}", e)))?
            .into_dimensions()
            .map_err(|e| AppError::image(format!("Failed to read image dimensions: {}", e)))
    }

    /// Decodes the bytes returned by the segmentation service.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ResultDecodeFailed`] for anything that is not an image.
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|e| AppError::decode(e.to_string()))
    }

    /// Crops `image` to `bbox` and encodes the result as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EmptySelection`] if the box rounds to zero area.
    pub fn crop_to_box(image: &DynamicImage, bbox: BoundingBox) -> Result<Vec<u8>> {
        let cropped = Self::crop_pixels(image, bbox)?;
        Self::encode(&DynamicImage::ImageRgba8(cropped), OutputFormat::Png, 1.0)
    }

    /// Pixel-exact crop; out-of-bounds regions stay transparent.
    pub fn crop_pixels(image: &DynamicImage, bbox: BoundingBox) -> Result<RgbaImage> {
        let rect = bbox.rounded();
        if rect.width == 0 || rect.height == 0 {
            return Err(AppError::EmptySelection);
        }

        let mut canvas = RgbaImage::new(rect.width, rect.height);
        // replace clips against both images, so a negative or overhanging
        // origin just copies the overlapping part
        imageops::replace(&mut canvas, &image.to_rgba8(), -rect.x, -rect.y);
        Ok(canvas)
    }

    /// Encodes to the given format. `quality` only affects JPEG.
    pub fn encode(image: &DynamicImage, format: OutputFormat, quality: f32) -> Result<Vec<u8>> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        let result = match format {
            OutputFormat::Jpeg => {
                let q = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut cursor, q))
            }
            OutputFormat::Png => image.write_with_encoder(PngEncoder::new(&mut cursor)),
            OutputFormat::Webp => {
                let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
                rgba.write_with_encoder(WebPEncoder::new_lossless(&mut cursor))
            }
        };
        result.map_err(|e| AppError::image(format!("Failed to encode image: {}", e)))?;

        Ok(buffer)
    }

    /// Encodes bytes as a `data:` URL.
    pub fn to_data_url(bytes: &[u8], mime_type: &str) -> String {
        format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
    }

    /// Guesses the format of encoded bytes, if recognisable.
    pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }
}
