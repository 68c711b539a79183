use crate::ocr::TextDetection;

use super::geom::iou;

/// Thresholds that decide when two detections describe the same text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeThresholds {
    pub overlap: f64,
    pub text: f64,
}

impl Default for MergeThresholds {
    fn default() -> Self {
        Self {
            overlap: 0.5,
            text: 0.8,
        }
    }
}

/// Collapses detections from every scan job into one reading per text occurrence.
///
/// Detections are visited by descending confidence. A detection whose box
/// overlaps an accepted one by more than `overlap` (IoU) and whose text is
/// more than `text` similar is a duplicate; the higher-confidence reading wins.
pub fn merge_detections(
    mut detections: Vec<TextDetection>,
    thresholds: MergeThresholds,
) -> Vec<TextDetection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<TextDetection> = Vec::new();
    for detection in detections {
        let duplicate = kept.iter().position(|existing| {
            iou(&existing.quad, &detection.quad) > thresholds.overlap
                && text_similarity(&existing.text, &detection.text) > thresholds.text
        });
        match duplicate {
            Some(idx) => {
                if detection.confidence > kept[idx].confidence {
                    kept[idx] = detection;
                }
            }
            None => kept.push(detection),
        }
    }
    kept
}

/// Share of positions where both strings hold the same character, over the
/// longer string's length. Two empty strings are identical.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let (longer, shorter, longer_len) = if a_len > b_len {
        (a, b, a_len)
    } else {
        (b, a, b_len)
    };
    if longer_len == 0 {
        return 1.0;
    }
    let matches = longer
        .chars()
        .zip(shorter.chars())
        .filter(|(x, y)| x == y)
        .count();
    matches as f64 / longer_len as f64
}
