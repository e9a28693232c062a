use serde::{Deserialize, Serialize};

/// A pointer position in overlay pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Position and size of the rendered media element inside its container, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRect {
    pub offset_x: f64,
    pub offset_y: f64,
    pub display_width: f64,
    pub display_height: f64,
}

impl DisplayRect {
    pub fn new(offset_x: f64, offset_y: f64, display_width: f64, display_height: f64) -> Self {
        Self {
            offset_x,
            offset_y,
            display_width,
            display_height,
        }
    }

    pub fn is_measurable(&self) -> bool {
        self.offset_x.is_finite()
            && self.offset_y.is_finite()
            && self.display_width.is_finite()
            && self.display_height.is_finite()
            && self.display_width > 0.0
            && self.display_height > 0.0
    }
}

/// Native pixel dimensions of the decoded frame or canvas buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSize {
    pub width: u32,
    pub height: u32,
}

impl SourceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Sub-region of a [`DisplayRect`] that actually shows source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl ContentBox {
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Finite with a positive area.
    pub fn is_usable(&self) -> bool {
        [self.x, self.y, self.w, self.h].iter().all(|v| v.is_finite()) && self.w > 0.0 && self.h > 0.0
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// Rectangle traced by a pointer drag over the overlay. `w` and `h` are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl DragRect {
    /// Rectangle spanned by two opposite corners, in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            w: (b.x - a.x).abs(),
            h: (b.y - a.y).abs(),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.w.is_finite() && self.h.is_finite()) || self.w <= 0.0 || self.h <= 0.0
    }
}

/// Box expressed as fractions of the source width/height.
///
/// Built by [`crate::geometry::normalize`], which guarantees `0 ≤ x < 1`, `0 ≤ y < 1`,
/// positive size and `x + width ≤ 1`, `y + height ≤ 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedBox {
    pub fn is_valid(&self) -> bool {
        (0.0..1.0).contains(&self.x)
            && (0.0..1.0).contains(&self.y)
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.0 + f64::EPSILON
            && self.y + self.height <= 1.0 + f64::EPSILON
    }

    /// Integer source-pixel corners of this box, the way the device crops it.
    /// Returns `None` when the box rounds to an empty region.
    pub fn to_pixel_box(&self, source: SourceSize) -> Option<PixelBox> {
        let (w, h) = (source.width as f64, source.height as f64);
        let ax = (self.x * w).round() as i64;
        let bx = ((self.x + self.width) * w).round() as i64;
        let ay = (self.y * h).round() as i64;
        let by = ((self.y + self.height) * h).round() as i64;

        let (x0, x1) = (ax.min(bx), ax.max(bx));
        let (y0, y1) = (ay.min(by), ay.max(by));
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelBox { x0, y0, x1, y1 })
    }

    /// Short `[x, y, w, h]` form with two decimals, as shown in toasts.
    pub fn summary(&self) -> String {
        format!(
            "[{:.2}, {:.2}, {:.2}, {:.2}]",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Point expressed as fractions of the content box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

/// Pixel corners `[x0, x1) × [y0, y1)` in source space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_rect_from_any_corner_order() {
        let a = Point::new(300.0, 150.0);
        let b = Point::new(100.0, 50.0);
        let r = DragRect::from_corners(a, b);
        assert_eq!(r, DragRect { x: 100.0, y: 50.0, w: 200.0, h: 100.0 });
        assert_eq!(DragRect::from_corners(b, a), r);
    }

    #[test]
    fn zero_or_nan_size_is_degenerate() {
        assert!(DragRect { x: 1.0, y: 1.0, w: 0.0, h: 5.0 }.is_degenerate());
        assert!(DragRect { x: 1.0, y: 1.0, w: 5.0, h: f64::NAN }.is_degenerate());
        assert!(!DragRect { x: 1.0, y: 1.0, w: 5.0, h: 5.0 }.is_degenerate());
    }

    #[test]
    fn pixel_box_rounds_to_source_grid() {
        let b = NormalizedBox { x: 0.15625, y: 100.0 / 960.0, width: 0.3125, height: 200.0 / 960.0 };
        let px = b.to_pixel_box(SourceSize::new(1280, 960)).unwrap();
        assert_eq!(px, PixelBox { x0: 200, y0: 100, x1: 600, y1: 300 });
    }

    #[test]
    fn pixel_box_rejects_sub_pixel_box() {
        let b = NormalizedBox { x: 0.5, y: 0.5, width: 0.0001, height: 0.2 };
        assert!(b.to_pixel_box(SourceSize::new(100, 100)).is_none());
    }

    #[test]
    fn display_rect_serializes_camel_case() {
        let d = DisplayRect::new(1.0, 2.0, 640.0, 480.0);
        let v = serde_json::to_value(d).unwrap();
        assert_eq!(v["offsetX"], 1.0);
        assert_eq!(v["displayHeight"], 480.0);
    }
}
