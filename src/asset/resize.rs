//! PNG downscaling.
//!
//! This module handles decoding source PNGs, resampling them to a requested
//! width and re-encoding the result.
//!
//! # Design Decisions
//!
//! - **Width only**: Clients ask for a target width; the height follows from the
//!   source aspect ratio as `trunc(src_height / src_width * width)`, computed in
//!   `f64` in that order. Truncation, not rounding, so output sizes match
//!   fixtures produced by earlier versions of the server.
//!
//! - **Catmull-Rom**: Resampling uses the Catmull-Rom cubic kernel, which keeps
//!   edges reasonably sharp when shrinking photographs.
//!
//! - **Always RGBA**: The source is converted to 8-bit RGBA before resampling,
//!   so the output is always an RGBA PNG regardless of the source color type.
//!
//! - **Bounded output**: The derived height is checked against the resizer's
//!   maximum dimension before any pixel buffer is allocated. A tall, thin
//!   source at a large width would otherwise ask for gigabytes, and a failed
//!   allocation aborts the process rather than unwinding.

use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

use crate::error::AssetError;

/// Largest width a client may request by default.
pub const DEFAULT_MAX_WIDTH: u32 = 8192;

/// Content type of every resized response.
pub const RESIZED_CONTENT_TYPE: &str = "image/png";

// =============================================================================
// PNG Resizer
// =============================================================================

/// Result of a resize: encoded bytes and their pixel dimensions.
#[derive(Debug, Clone)]
pub struct ResizedImage {
    /// Encoded PNG data
    pub data: Bytes,

    /// Output width in pixels
    pub width: u32,

    /// Output height in pixels
    pub height: u32,
}

/// PNG decoder, resampler and encoder.
///
/// # Example
///
/// ```ignore
/// use keepr_assets::asset::PngResizer;
///
/// let resizer = PngResizer::new();
///
/// // Source PNG read from a registered directory
/// let source: Vec<u8> = /* ... */;
///
/// // Shrink to 320 pixels wide
/// let resized = resizer.resize(&source, 320)?;
/// ```
#[derive(Debug, Clone)]
pub struct PngResizer {
    /// Largest output width or height
    max_dimension: u32,
}

impl Default for PngResizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PngResizer {
    /// Create a new PNG resizer bounded by [`DEFAULT_MAX_WIDTH`].
    pub fn new() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_WIDTH,
        }
    }

    /// Set the largest width or height the resizer will produce.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Get the largest width or height the resizer will produce.
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Decode `source`, resample it to `width` pixels wide and encode as PNG.
    ///
    /// # Errors
    ///
    /// - [`AssetError::DecodeFailure`] if the source is not a valid PNG
    /// - [`AssetError::EncodeFailure`] if the derived height truncates to zero,
    ///   either side exceeds the maximum dimension, or encoding fails
    pub fn resize(&self, source: &[u8], width: u32) -> Result<ResizedImage, AssetError> {
        let img = decode_png(source)?;

        let (src_width, src_height) = (img.width(), img.height());
        if src_width == 0 || src_height == 0 {
            return Err(AssetError::DecodeFailure {
                message: format!("source image is empty ({}x{})", src_width, src_height),
            });
        }

        let height = target_height(src_width, src_height, width);
        if width == 0 || height == 0 {
            return Err(AssetError::EncodeFailure {
                message: format!(
                    "target size {}x{} is empty (source {}x{})",
                    width, height, src_width, src_height
                ),
            });
        }

        if width > self.max_dimension || height > self.max_dimension {
            return Err(AssetError::EncodeFailure {
                message: format!(
                    "target size {}x{} exceeds {} pixels (source {}x{})",
                    width, height, self.max_dimension, src_width, src_height
                ),
            });
        }

        let resized = imageops::resize(&img.to_rgba8(), width, height, FilterType::CatmullRom);

        let mut output = Vec::new();
        DynamicImage::ImageRgba8(resized)
            .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
            .map_err(|e| AssetError::EncodeFailure {
                message: e.to_string(),
            })?;

        Ok(ResizedImage {
            data: Bytes::from(output),
            width,
            height,
        })
    }

    /// Get PNG dimensions without fully decoding.
    ///
    /// # Returns
    ///
    /// `(width, height)` in pixels.
    pub fn dimensions(&self, source: &[u8]) -> Result<(u32, u32), AssetError> {
        let reader = ImageReader::with_format(Cursor::new(source), ImageFormat::Png);

        reader
            .into_dimensions()
            .map_err(|e| AssetError::DecodeFailure {
                message: e.to_string(),
            })
    }
}

fn decode_png(source: &[u8]) -> Result<DynamicImage, AssetError> {
    ImageReader::with_format(Cursor::new(source), ImageFormat::Png)
        .decode()
        .map_err(|e| AssetError::DecodeFailure {
            message: e.to_string(),
        })
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Height that keeps the source aspect ratio at the given width.
///
/// Truncates toward zero. `src_width` must be non-zero.
#[inline]
pub fn target_height(src_width: u32, src_height: u32, width: u32) -> u32 {
    (src_height as f64 / src_width as f64 * width as f64) as u32
}

/// Parse a `width` query value.
///
/// Accepts ASCII digits only, in `1..=max_width`.
pub fn parse_width(value: &str, max_width: u32) -> Result<u32, AssetError> {
    let invalid = || AssetError::InvalidWidth {
        value: value.to_string(),
    };

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    match value.parse::<u32>() {
        Ok(width) if width >= 1 && width <= max_width => Ok(width),
        _ => Err(invalid()),
    }
}

// =============================================================================
// Tests
// =============================================================================
