mod cache;
mod engine;

pub use cache::{ModelCache, ModelKey};
pub use engine::{
    list_tesseract_languages, merge_detections, plan_scan_jobs, run_scan_jobs, text_similarity,
    Aabb, MergeThresholds, OcrEngine, OcrParams, Region, ScanJob, Sensitivity, TesseractEngine,
};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointPx {
    pub x: i64,
    pub y: i64,
}

impl PointPx {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    fn offset(self, dx: i64, dy: i64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Four corner points ordered top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quad(pub [PointPx; 4]);

impl Quad {
    /// Axis-aligned rectangle spanning `(x, y)` to `(x + w, y + h)`.
    pub fn from_rect(x: i64, y: i64, w: i64, h: i64) -> Self {
        Quad([
            PointPx::new(x, y),
            PointPx::new(x + w, y),
            PointPx::new(x + w, y + h),
            PointPx::new(x, y + h),
        ])
    }

    pub fn top_left(&self) -> PointPx {
        self.0[0]
    }

    pub fn top_right(&self) -> PointPx {
        self.0[1]
    }

    pub fn bottom_right(&self) -> PointPx {
        self.0[2]
    }

    pub fn bottom_left(&self) -> PointPx {
        self.0[3]
    }

    pub fn translate(&self, dx: i64, dy: i64) -> Self {
        Quad(self.0.map(|point| point.offset(dx, dy)))
    }
}

impl Serialize for Quad {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let corner = |p: PointPx| [p.x, p.y];
        let mut state = serializer.serialize_struct("Quad", 4)?;
        state.serialize_field("top_left", &corner(self.top_left()))?;
        state.serialize_field("top_right", &corner(self.top_right()))?;
        state.serialize_field("bottom_right", &corner(self.bottom_right()))?;
        state.serialize_field("bottom_left", &corner(self.bottom_left()))?;
        state.end()
    }
}

/// One recognized text fragment as returned by the OCR engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextDetection {
    pub text: String,
    pub confidence: f32,
    #[serde(rename = "coordinates")]
    pub quad: Quad,
}

impl TextDetection {
    pub fn new(quad: Quad, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            quad,
        }
    }
}
