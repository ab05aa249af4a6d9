use image::metadata::Orientation;
use image::ImageFormat;

/// Facts about a decoded source image that must travel with its crops.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageMetadata {
    /// Dimensions of the decoded pixels (after rotation, if it was applied).
    pub width: u32,
    pub height: u32,
    /// EXIF orientation read from the source file.
    pub orientation: Orientation,
    /// Whether `orientation` has already been baked into the decoded pixels.
    pub orientation_applied: bool,
    pub format: Option<ImageFormat>,
}

impl ImageMetadata {
    /// Metadata for an in-memory image with no orientation to carry.
    pub fn upright(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            orientation: Orientation::NoTransforms,
            orientation_applied: true,
            format: None,
        }
    }

    /// Orientation still owed to the pixels, if any.
    pub fn pending_orientation(&self) -> Option<Orientation> {
        if self.orientation_applied || self.orientation == Orientation::NoTransforms {
            None
        } else {
            Some(self.orientation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upright_has_nothing_pending() {
        assert_eq!(ImageMetadata::upright(10, 20).pending_orientation(), None);
    }

    #[test]
    fn test_unapplied_rotation_is_pending() {
        let meta = ImageMetadata {
            orientation: Orientation::Rotate90,
            orientation_applied: false,
            ..ImageMetadata::upright(10, 20)
        };
        assert_eq!(meta.pending_orientation(), Some(Orientation::Rotate90));
    }

    #[test]
    fn test_applied_rotation_is_not_pending() {
        let meta = ImageMetadata {
            orientation: Orientation::Rotate180,
            orientation_applied: true,
            ..ImageMetadata::upright(10, 20)
        };
        assert_eq!(meta.pending_orientation(), None);
    }
}
