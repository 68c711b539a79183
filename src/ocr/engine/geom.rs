use crate::ocr::Quad;

/// Axis-aligned bounding box of a quadrilateral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aabb {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl Aabb {
    pub fn of(quad: &Quad) -> Self {
        let xs = quad.0.map(|p| p.x);
        let ys = quad.0.map(|p| p.y);
        Self {
            x1: xs.iter().copied().min().unwrap_or(0),
            y1: ys.iter().copied().min().unwrap_or(0),
            x2: xs.iter().copied().max().unwrap_or(0),
            y2: ys.iter().copied().max().unwrap_or(0),
        }
    }

    pub fn area(&self) -> f64 {
        (self.x2 - self.x1) as f64 * (self.y2 - self.y1) as f64
    }

    fn intersection(&self, other: &Aabb) -> f64 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0);
        w as f64 * h as f64
    }
}

/// Intersection over union of the two quads' bounding boxes.
/// Returns 0 when the union is empty.
pub(super) fn iou(a: &Quad, b: &Quad) -> f64 {
    let a = Aabb::of(a);
    let b = Aabb::of(b);
    let inter = a.intersection(&b);
    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        return 0.0;
    }
    inter / union
}
