//! Decoding candidate files into upright, immutable RGBA images.

use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::{ImageError, ImageReader, RgbaImage};
use thiserror::Error;
use tracing::debug;

use crate::orientation::{Rotation, read_orientation};

/// Why a single candidate could not be decoded. Never fatal to a session.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ImageError> for DecodeError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Unsupported(e) => Self::UnsupportedFormat(e.to_string()),
            ImageError::IoError(e) => Self::Io(e),
            other => Self::Decode(other.to_string()),
        }
    }
}

/// An orientation-corrected RGBA bitmap.
///
/// The pixels sit behind an `Arc` and are never handed out mutably, so clones
/// share one buffer and can cross threads freely.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: Arc<RgbaImage>,
}

impl DecodedImage {
    #[must_use]
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// `(width, height)` in pixels, after orientation correction.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    #[must_use]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Turns a catalog path into a displayable image.
///
/// Implementations are called from blocking worker threads and may take as
/// long as they need.
pub trait ImageDecoder: Send + Sync {
    /// Decode `path`.
    ///
    /// # Errors
    /// Any [`DecodeError`]; callers treat it as "try another candidate".
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError>;
}

/// Decoder backed by the `image` crate with EXIF rotation applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDecoder;

impl ImageDecoder for FileDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        let bytes = fs::read(path)?;
        decode_bytes(&bytes).inspect_err(|err| debug!(path = %path.display(), "decode failed: {err}"))
    }
}

/// Decode an in-memory encoded image and rotate it upright.
///
/// The format is sniffed from content. Orientation lookup is best effort: a
/// missing or broken EXIF block leaves the image as stored.
///
/// # Errors
/// [`DecodeError::UnsupportedFormat`] when the format is unknown or not
/// compiled in, [`DecodeError::Decode`] for corrupt data.
pub fn decode_bytes(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?
        .into_rgba8();

    let rotation = read_orientation(bytes);
    if rotation != Rotation::None {
        debug!(degrees = rotation.degrees(), "applying exif rotation");
    }
    Ok(DecodedImage::new(rotation.apply(img)))
}
