//! Candidate acceptance by minimum size and orientation class.

use clap::ValueEnum;
use serde::Deserialize;

use crate::decode::DecodedImage;

/// Which aspect classes are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OrientationFilter {
    #[default]
    Any,
    /// Strictly wider than tall.
    Landscape,
    /// Strictly taller than wide.
    Portrait,
}

/// User-adjustable filter, replaced as a whole value whenever it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct FilterConfig {
    pub min_width: u32,
    pub min_height: u32,
    pub orientation: OrientationFilter,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_width: 500,
            min_height: 500,
            orientation: OrientationFilter::Any,
        }
    }
}

impl FilterConfig {
    /// A filter that accepts every image.
    #[must_use]
    pub const fn accept_all() -> Self {
        Self {
            min_width: 0,
            min_height: 0,
            orientation: OrientationFilter::Any,
        }
    }

    /// Decide whether an image of `width` x `height` may be shown.
    ///
    /// Square images fail both `Landscape` and `Portrait`.
    #[must_use]
    pub const fn accepts_dimensions(&self, width: u32, height: u32) -> bool {
        if width < self.min_width || height < self.min_height {
            return false;
        }
        match self.orientation {
            OrientationFilter::Any => true,
            OrientationFilter::Landscape => width > height,
            OrientationFilter::Portrait => height > width,
        }
    }

    #[must_use]
    pub fn accepts(&self, image: &DecodedImage) -> bool {
        let (w, h) = image.dimensions();
        self.accepts_dimensions(w, h)
    }
}
