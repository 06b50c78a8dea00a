use serde::{Deserialize, Serialize};

/// Axis-aligned box in frame pixels. `x2`/`y2` are exclusive, so a box always
/// satisfies `x2 > x1` and `y2 > y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    /// Clamp arbitrary corners into a `width` x `height` frame.
    /// Returns `None` when nothing of the box is left inside.
    pub fn clamped(x1: i64, y1: i64, x2: i64, y2: i64, width: u32, height: u32) -> Option<Self> {
        let x1 = x1.clamp(0, width as i64) as u32;
        let x2 = x2.clamp(0, width as i64) as u32;
        let y1 = y1.clamp(0, height as i64) as u32;
        let y2 = y2.clamp(0, height as i64) as u32;

        (x2 > x1 && y2 > y1).then_some(Self { x1, y1, x2, y2 })
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> u64 {
        let w = self.x2.min(other.x2).saturating_sub(self.x1.max(other.x1));
        let h = self.y2.min(other.y2).saturating_sub(self.y1.max(other.y1));
        w as u64 * h as u64
    }

    /// Grow the box by `padding` on every side, clamped to the frame.
    pub fn padded(&self, padding: u32, width: u32, height: u32) -> Option<Self> {
        let p = padding as i64;
        Self::clamped(
            self.x1 as i64 - p,
            self.y1 as i64 - p,
            self.x2 as i64 + p,
            self.y2 as i64 + p,
            width,
            height,
        )
    }

    pub fn to_array(&self) -> [u32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// One candidate tag region in a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub label: String,
}

/// Shape statistics of one external contour of the bright-region mask
#[derive(Debug, Clone, PartialEq)]
pub struct TagCandidate {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    /// Polygon area enclosed by the contour
    pub area: f64,
    /// Fraction of pixels in the bounding rectangle darker than the ink threshold
    pub dark_ratio: f32,
}

impl TagCandidate {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn aspect_ratio(&self) -> f32 {
        let w = self.width() as f32;
        let h = self.height() as f32;
        if h == 0.0 {
            return 0.0;
        }
        w / h
    }

    /// Bounding rectangle as an exclusive box
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox {
            x1: self.min_x,
            y1: self.min_y,
            x2: self.max_x + 1,
            y2: self.max_y + 1,
        }
    }
}
