#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use image::RgbaImage;
use random_slideshow::catalog::Catalog;
use random_slideshow::decode::{DecodeError, DecodedImage, ImageDecoder};
use random_slideshow::display::{DisplaySurface, FitMode};

/// Decodes known paths to blank images of a fixed size; everything else fails.
#[derive(Debug, Default)]
pub struct SizedDecoder {
    sizes: HashMap<PathBuf, (u32, u32)>,
    pub calls: AtomicUsize,
}

impl SizedDecoder {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, (u32, u32))>) -> Self {
        Self {
            sizes: entries
                .into_iter()
                .map(|(p, wh)| (PathBuf::from(p), wh))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl ImageDecoder for SizedDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (w, h) = self
            .sizes
            .get(path)
            .copied()
            .ok_or_else(|| DecodeError::UnsupportedFormat(path.display().to_string()))?;
        Ok(DecodedImage::new(RgbaImage::new(w, h)))
    }
}

/// Slow decoder that records how many decodes overlap.
#[derive(Debug)]
pub struct SlowDecoder {
    delay: Duration,
    size: (u32, u32),
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub calls: AtomicUsize,
}

impl SlowDecoder {
    pub fn new(delay: Duration, size: (u32, u32)) -> Self {
        Self {
            delay,
            size,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

impl ImageDecoder for SlowDecoder {
    fn decode(&self, _path: &Path) -> Result<DecodedImage, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(DecodedImage::new(RgbaImage::new(self.size.0, self.size.1)))
    }
}

/// Decoder that panics on every call.
#[derive(Debug, Default)]
pub struct PanickingDecoder;

impl ImageDecoder for PanickingDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        panic!("decoder crashed on {}", path.display());
    }
}

/// Display surface that remembers what it was asked to show.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub shown: Mutex<Vec<((u32, u32), FitMode)>>,
}

impl RecordingSurface {
    pub fn count(&self) -> usize {
        self.shown.lock().unwrap().len()
    }
}

impl DisplaySurface for RecordingSurface {
    fn show(&self, image: &DecodedImage, fit: FitMode) {
        self.shown.lock().unwrap().push((image.dimensions(), fit));
    }
}

pub fn catalog_of(paths: &[&str]) -> Catalog {
    Catalog::from_vec("/photos", paths.iter().map(PathBuf::from).collect()).unwrap()
}

/// Poll `cond` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
