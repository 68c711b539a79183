mod geom;
mod merge;
mod parse;
mod preprocess;
mod scan;
mod tesseract;

use anyhow::Result;
use image::DynamicImage;

use crate::ocr::TextDetection;

pub use geom::Aabb;
pub use merge::{merge_detections, text_similarity, MergeThresholds};
pub use scan::{plan_scan_jobs, run_scan_jobs, OcrParams, Region, ScanJob, Sensitivity};
pub use tesseract::{list_tesseract_languages, TesseractEngine};

/// Text recognizer consumed by the scan pipeline.
///
/// Implementations return detections in the pixel space of the image they
/// were given; the caller maps region crops back to the full frame.
pub trait OcrEngine: Send + Sync {
    fn read_text(&self, image: &DynamicImage, params: &OcrParams) -> Result<Vec<TextDetection>>;
}
