//! EXIF orientation lookup.
//!
//! Only the pure rotations are honoured. Mirrored orientations (2, 4, 5, 7)
//! are left untouched.

use std::io::Cursor;

use exif::{In, Tag};
use image::RgbaImage;
use image::imageops;
use tracing::trace;

/// Clockwise rotation needed to display an image upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Rotation angle in degrees: 0, 90, 180 or 270.
    #[must_use]
    pub const fn degrees(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Cw90 => 90,
            Self::Cw180 => 180,
            Self::Cw270 => 270,
        }
    }

    /// Whether applying this rotation exchanges width and height.
    #[must_use]
    pub const fn swaps_dimensions(self) -> bool {
        matches!(self, Self::Cw90 | Self::Cw270)
    }

    /// Rotate `img` clockwise by this amount.
    #[must_use]
    pub fn apply(self, img: RgbaImage) -> RgbaImage {
        match self {
            Self::None => img,
            Self::Cw90 => imageops::rotate90(&img),
            Self::Cw180 => imageops::rotate180(&img),
            Self::Cw270 => imageops::rotate270(&img),
        }
    }
}

/// Map a raw EXIF orientation value to the rotation it calls for.
#[must_use]
pub const fn rotation_for_tag(raw: u32) -> Rotation {
    match raw {
        6 => Rotation::Cw90,
        3 => Rotation::Cw180,
        8 => Rotation::Cw270,
        _ => Rotation::None,
    }
}

/// Read the orientation tag from an encoded image held in memory.
///
/// Missing or unparsable metadata yields [`Rotation::None`].
#[must_use]
pub fn read_orientation(encoded: &[u8]) -> Rotation {
    read_orientation_tag(encoded).map_or(Rotation::None, rotation_for_tag)
}

fn read_orientation_tag(encoded: &[u8]) -> Option<u32> {
    let mut cursor = Cursor::new(encoded);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    let field = exif.get_field(Tag::Orientation, In::PRIMARY)?;
    let raw = field.value.get_uint(0)?;
    trace!(orientation = raw, "exif orientation tag");
    Some(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_mapping() {
        assert_eq!(rotation_for_tag(6).degrees(), 90);
        assert_eq!(rotation_for_tag(3).degrees(), 180);
        assert_eq!(rotation_for_tag(8).degrees(), 270);
        for raw in [0, 1, 2, 4, 5, 7, 9, 255, u32::MAX] {
            assert_eq!(rotation_for_tag(raw), Rotation::None, "tag {raw}");
        }
    }

    #[test]
    fn garbage_bytes_mean_no_rotation() {
        assert_eq!(read_orientation(b"definitely not an image"), Rotation::None);
        assert_eq!(read_orientation(&[]), Rotation::None);
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let img = RgbaImage::new(4, 2);
        let rotated = Rotation::Cw90.apply(img.clone());
        assert_eq!(rotated.dimensions(), (2, 4));
        assert_eq!(Rotation::Cw180.apply(img).dimensions(), (4, 2));
        assert!(Rotation::Cw270.swaps_dimensions());
        assert!(!Rotation::Cw180.swaps_dimensions());
    }
}
