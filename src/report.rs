use serde::Serialize;
use std::path::Path;
use time::{format_description, OffsetDateTime};

use crate::gps::ExtractionResult;
use crate::ocr::TextDetection;

/// Everything found in one image.
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub image_path: String,
    pub text_data: Vec<TextDetection>,
    pub processed_at: String,
    pub gps_coordinates: Option<ExtractionResult>,
    pub all_detected_text: Vec<String>,
}

impl ImageReport {
    pub fn new(
        image_path: &Path,
        detections: Vec<TextDetection>,
        gps_coordinates: Option<ExtractionResult>,
    ) -> Self {
        let all_detected_text = detections.iter().map(|d| d.text.clone()).collect();
        Self {
            image_path: image_path.display().to_string(),
            text_data: detections,
            processed_at: format_processed_at(OffsetDateTime::now_utc()),
            gps_coordinates,
            all_detected_text,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageFailure {
    pub image_path: String,
    pub error: String,
}

impl ImageFailure {
    pub fn new(image_path: &Path, error: &anyhow::Error) -> Self {
        Self {
            image_path: image_path.display().to_string(),
            error: format!("{:#}", error),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub results: Vec<ImageReport>,
    pub errors: Vec<ImageFailure>,
}

impl BatchReport {
    pub fn located(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.gps_coordinates.is_some())
            .count()
    }
}

pub(crate) fn format_processed_at(dt: OffsetDateTime) -> String {
    let format = format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(format) = format {
        if let Ok(rendered) = dt.format(&format) {
            return rendered;
        }
    }
    dt.date().to_string()
}
