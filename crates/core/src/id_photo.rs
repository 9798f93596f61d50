//! ID-photo composition.
//!
//! Places a transparent cutout on a solid background colour at one of the
//! standard print sizes (300 dpi).

use crate::error::{AppError, Result};
use crate::image_processing::{ImageProcessor, OutputFormat};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BgColor {
    White,
    #[default]
    Blue,
    Red,
}

impl BgColor {
    pub const ALL: [BgColor; 3] = [BgColor::White, BgColor::Blue, BgColor::Red];

    pub fn hex(&self) -> &'static str {
        match self {
            Self::White => "#FFFFFF",
            Self::Blue => "#438EDB",
            Self::Red => "#D04848",
        }
    }

    pub fn rgb(&self) -> [u8; 3] {
        match self {
            Self::White => [0xFF, 0xFF, 0xFF],
            Self::Blue => [0x43, 0x8E, 0xDB],
            Self::Red => [0xD0, 0x48, 0x48],
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Blue => "blue",
            Self::Red => "red",
        }
    }
}

impl fmt::Display for BgColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for BgColor {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::config(format!("Unknown background colour {:?}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PhotoSize {
    /// 25mm x 35mm
    #[default]
    #[serde(rename = "1inch")]
    OneInch,
    /// 35mm x 49mm
    #[serde(rename = "2inch")]
    TwoInch,
    /// 33mm x 48mm
    #[serde(rename = "small")]
    Small,
    /// 38mm x 53mm
    #[serde(rename = "big")]
    Big,
}

impl PhotoSize {
    pub const ALL: [PhotoSize; 4] = [
        PhotoSize::OneInch,
        PhotoSize::TwoInch,
        PhotoSize::Small,
        PhotoSize::Big,
    ];

    /// Pixel dimensions at 300 dpi.
    pub fn pixels(&self) -> (u32, u32) {
        match self {
            Self::OneInch => (295, 413),
            Self::TwoInch => (413, 579),
            Self::Small => (390, 567),
            Self::Big => (448, 626),
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::OneInch => "1inch",
            Self::TwoInch => "2inch",
            Self::Small => "small",
            Self::Big => "big",
        }
    }
}

impl fmt::Display for PhotoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PhotoSize {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::config(format!("Unknown photo size {:?}", s)))
    }
}

/// Scales `cutout` to cover the target size, centres it and blends it over `color`.
pub fn compose(cutout: &DynamicImage, color: BgColor, size: PhotoSize) -> Result<RgbaImage> {
    let (target_w, target_h) = size.pixels();
    if cutout.width() == 0 || cutout.height() == 0 {
        return Err(AppError::image("Cutout has no pixels"));
    }

    let scale = f64::max(
        target_w as f64 / cutout.width() as f64,
        target_h as f64 / cutout.height() as f64,
    );
    let scaled_w = ((cutout.width() as f64 * scale).round() as u32).max(target_w);
    let scaled_h = ((cutout.height() as f64 * scale).round() as u32).max(target_h);
    let scaled = cutout.resize_exact(scaled_w, scaled_h, FilterType::Lanczos3).to_rgba8();

    let [r, g, b] = color.rgb();
    let mut canvas = RgbaImage::from_pixel(target_w, target_h, Rgba([r, g, b, 255]));
    let offset_x = -(((scaled_w - target_w) / 2) as i64);
    let offset_y = -(((scaled_h - target_h) / 2) as i64);
    imageops::overlay(&mut canvas, &scaled, offset_x, offset_y);
    Ok(canvas)
}

/// [`compose`] followed by JPEG encoding.
pub fn compose_jpeg(cutout: &DynamicImage, color: BgColor, size: PhotoSize) -> Result<Vec<u8>> {
    let composed = compose(cutout, color, size)?;
    ImageProcessor::encode(&DynamicImage::ImageRgba8(composed), OutputFormat::Jpeg, 0.95)
}

/// Download name, e.g. `idphoto_blue_1inch.jpg`.
pub fn file_name(color: BgColor, size: PhotoSize) -> String {
    format!("idphoto_{}_{}.jpg", color, size)
}
