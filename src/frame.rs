//! In-memory raster frames.
//!
//! A [`RasterFrame`] is a fixed-size, row-major grid of pixels with its origin
//! at the top-left corner. Pixels are either RGB triples or single luma bytes;
//! the storage is an [`image`] buffer so frames convert cheaply to and from
//! [`DynamicImage`].

use image::{DynamicImage, GrayImage, RgbImage};

/// How the values of an interchange artifact are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Three values per pixel, each in `0..=255`.
    Rgb,
    /// One value per pixel in `0..=255`.
    Luma,
    /// One value per pixel in `{0, 1}`, scaled to `{0, 255}` in memory.
    Binary,
}

impl ChannelKind {
    /// Number of whitespace-separated values on each pixel line.
    pub fn values_per_pixel(self) -> usize {
        match self {
            ChannelKind::Rgb => 3,
            ChannelKind::Luma | ChannelKind::Binary => 1,
        }
    }

    /// Largest value allowed in the text form.
    pub fn max_stored_value(self) -> u8 {
        match self {
            ChannelKind::Rgb | ChannelKind::Luma => u8::MAX,
            ChannelKind::Binary => 1,
        }
    }
}

/// A single video frame held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterFrame {
    /// 8-bit RGB pixels.
    Rgb(RgbImage),
    /// 8-bit luma pixels.
    Luma(GrayImage),
}

impl RasterFrame {
    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        match self {
            RasterFrame::Rgb(image) => image.width(),
            RasterFrame::Luma(image) => image.width(),
        }
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        match self {
            RasterFrame::Rgb(image) => image.height(),
            RasterFrame::Luma(image) => image.height(),
        }
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Bytes per pixel: 3 for RGB, 1 for luma.
    pub fn channel_count(&self) -> u8 {
        match self {
            RasterFrame::Rgb(_) => 3,
            RasterFrame::Luma(_) => 1,
        }
    }

    /// Tightly packed row-major pixel bytes.
    pub fn as_raw(&self) -> &[u8] {
        match self {
            RasterFrame::Rgb(image) => image.as_raw(),
            RasterFrame::Luma(image) => image.as_raw(),
        }
    }

    /// Convert into a [`DynamicImage`] without copying.
    pub fn into_dynamic(self) -> DynamicImage {
        match self {
            RasterFrame::Rgb(image) => DynamicImage::ImageRgb8(image),
            RasterFrame::Luma(image) => DynamicImage::ImageLuma8(image),
        }
    }
}

impl From<RgbImage> for RasterFrame {
    fn from(image: RgbImage) -> Self {
        RasterFrame::Rgb(image)
    }
}

impl From<GrayImage> for RasterFrame {
    fn from(image: GrayImage) -> Self {
        RasterFrame::Luma(image)
    }
}
