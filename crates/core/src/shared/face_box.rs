/// Axis-aligned face bounding box in source-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub confidence: f64,
}

impl FaceBox {
    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn iou(&self, other: &FaceBox) -> f64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

/// Integer crop rectangle guaranteed to lie inside its source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Clamps float bounds to a `width` × `height` image.
    ///
    /// Returns `None` when nothing of the rectangle remains inside the image.
    pub fn clamped(x1: f64, y1: f64, x2: f64, y2: f64, width: u32, height: u32) -> Option<Self> {
        let left = x1.round().clamp(0.0, width as f64) as u32;
        let top = y1.round().clamp(0.0, height as f64) as u32;
        let right = x2.round().clamp(0.0, width as f64) as u32;
        let bottom = y2.round().clamp(0.0, height as f64) as u32;

        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        })
    }
}
