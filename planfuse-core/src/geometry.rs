use serde::{Deserialize, Serialize};

/// Keeps `overlap_ratio` defined when both boxes have zero area.
const OVERLAP_EPSILON: f64 = 1e-6;

/// Axis-aligned box in pixel coordinates, corners inclusive-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PixelBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i64 {
        (self.x2 as i64 - self.x1 as i64).max(0)
    }

    pub fn height(&self) -> i64 {
        (self.y2 as i64 - self.y1 as i64).max(0)
    }

    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// A box with positive width and height.
    pub fn is_proper(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }
}

/// Envelope of a polygon: `(min_x, min_y, max_x, max_y)` over all vertices,
/// truncated to whole pixels. `None` for an empty polygon.
pub fn to_axis_aligned_box(polygon: &[[f64; 2]]) -> Option<PixelBox> {
    let first = polygon.first()?;
    let (mut min_x, mut min_y) = (first[0], first[1]);
    let (mut max_x, mut max_y) = (first[0], first[1]);

    for point in &polygon[1..] {
        min_x = min_x.min(point[0]);
        min_y = min_y.min(point[1]);
        max_x = max_x.max(point[0]);
        max_y = max_y.max(point[1]);
    }

    Some(PixelBox::new(
        min_x as i32,
        min_y as i32,
        max_x as i32,
        max_y as i32,
    ))
}

/// Intersection-over-union of two boxes. 0.0 when they do not overlap.
pub fn overlap_ratio(a: &PixelBox, b: &PixelBox) -> f64 {
    let inter = PixelBox::new(a.x1.max(b.x1), a.y1.max(b.y1), a.x2.min(b.x2), a.y2.min(b.y2));
    let inter_area = inter.area() as f64;
    let union = a.area() as f64 + b.area() as f64 - inter_area;
    inter_area / (union + OVERLAP_EPSILON)
}
