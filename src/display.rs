//! Collaborator seams on the display side: where frames go and how they fit.
//!
//! The engine hands a [`DecodedImage`] and a [`FitMode`] to a
//! [`DisplaySurface`]; mapping pixels to the screen is the surface's job. The
//! helpers here are for surfaces that want the usual cover/contain layout.

use clap::ValueEnum;
use serde::Deserialize;
use tracing::info;

use crate::decode::DecodedImage;

/// How a frame is laid out in its viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    /// Scale to cover the viewport, cropping overflow.
    FillCropped,
    /// Scale to fit inside the viewport, letterboxing the rest.
    #[default]
    FitContained,
}

/// Screen-space rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Receives frames from the slideshow clock.
pub trait DisplaySurface: Send + Sync {
    fn show(&self, image: &DecodedImage, fit: FitMode);
}

/// Resolves a monitor index to the rectangle a fullscreen window should cover.
pub trait MonitorPlacement {
    fn target_rect(&self, monitor: usize) -> Option<Rect>;
}

/// A named monitor with a fixed working area.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Monitor {
    pub name: String,
    #[serde(flatten)]
    pub area: Rect,
}

/// Monitors listed up front, e.g. from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct StaticMonitors(pub Vec<Monitor>);

impl MonitorPlacement for StaticMonitors {
    fn target_rect(&self, monitor: usize) -> Option<Rect> {
        self.0.get(monitor).map(|m| m.area)
    }
}

/// Scale `src` to cover the canvas, keeping aspect; one side may overflow.
#[must_use]
pub fn resize_to_cover(canvas_w: u32, canvas_h: u32, src_w: u32, src_h: u32) -> (u32, u32) {
    let iw = src_w.max(1) as f32;
    let ih = src_h.max(1) as f32;
    let scale = (canvas_w.max(1) as f32 / iw).max(canvas_h.max(1) as f32 / ih);
    ((iw * scale).round() as u32, (ih * scale).round() as u32)
}

/// Scale `src` to fit inside the canvas, keeping aspect. Never below 1x1.
#[must_use]
pub fn resize_to_contain(canvas_w: u32, canvas_h: u32, src_w: u32, src_h: u32) -> (u32, u32) {
    let iw = src_w.max(1) as f32;
    let ih = src_h.max(1) as f32;
    let scale = (canvas_w.max(1) as f32 / iw).min(canvas_h.max(1) as f32 / ih);
    let w = (iw * scale).round().max(1.0);
    let h = (ih * scale).round().max(1.0);
    (w as u32, h as u32)
}

/// Where an image of `src_w` x `src_h` lands inside `target`, centred.
///
/// With [`FitMode::FillCropped`] the result may extend past `target`.
#[must_use]
pub fn dest_rect(src_w: u32, src_h: u32, target: Rect, fit: FitMode) -> Rect {
    let (w, h) = match fit {
        FitMode::FillCropped => resize_to_cover(target.width, target.height, src_w, src_h),
        FitMode::FitContained => resize_to_contain(target.width, target.height, src_w, src_h),
    };
    let offset = |outer: u32, inner: u32| {
        let centred = (i64::from(outer) - i64::from(inner)) / 2;
        centred.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    };
    Rect {
        x: target.x.saturating_add(offset(target.width, w)),
        y: target.y.saturating_add(offset(target.height, h)),
        width: w,
        height: h,
    }
}

/// Headless surface that logs where each frame would be drawn.
#[derive(Debug, Clone)]
pub struct LogSurface {
    target: Rect,
}

impl LogSurface {
    #[must_use]
    pub const fn new(target: Rect) -> Self {
        Self { target }
    }
}

impl DisplaySurface for LogSurface {
    fn show(&self, image: &DecodedImage, fit: FitMode) {
        let (w, h) = image.dimensions();
        let dest = dest_rect(w, h, self.target, fit);
        info!(
            width = w,
            height = h,
            ?fit,
            x = dest.x,
            y = dest.y,
            dest_w = dest.width,
            dest_h = dest.height,
            "frame"
        );
    }
}
