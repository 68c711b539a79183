use std::collections::BTreeMap;

use crate::ocr::{Quad, TextDetection};

use super::scan::OcrParams;

#[derive(Debug, Clone)]
struct WordToken {
    text: String,
    x: i64,
    y: i64,
    w: i64,
    h: i64,
    conf: f32,
}

impl WordToken {
    fn right(&self) -> i64 {
        self.x + self.w
    }

    fn center_y(&self) -> f32 {
        self.y as f32 + self.h as f32 / 2.0
    }
}

/// Turns `tesseract ... tsv` output into detections.
///
/// Word rows (level 5) below the confidence or glyph-size floor are dropped;
/// the rest are grouped by text line and joined while the horizontal gap and
/// vertical drift stay within `width_ths`/`height_ths` of the word height.
pub(super) fn parse_tsv_detections(tsv: &str, params: &OcrParams) -> Vec<TextDetection> {
    let mut lines: BTreeMap<(i32, i32, i32, i32), Vec<WordToken>> = BTreeMap::new();

    for row in tsv.lines().skip(1) {
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < 12 {
            continue;
        }
        let level: i32 = cols[0].parse().unwrap_or(0);
        if level != 5 {
            continue;
        }
        let key = (
            cols[1].parse().unwrap_or(0),
            cols[2].parse().unwrap_or(0),
            cols[3].parse().unwrap_or(0),
            cols[4].parse().unwrap_or(0),
        );
        let conf: f32 = cols[10].parse().unwrap_or(-1.0);
        let text = cols[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }
        let word = WordToken {
            text: text.to_string(),
            x: cols[6].parse().unwrap_or(0),
            y: cols[7].parse().unwrap_or(0),
            w: cols[8].parse().unwrap_or(0),
            h: cols[9].parse().unwrap_or(0),
            conf: conf / 100.0,
        };
        if word.conf < params.text_threshold || word.h < i64::from(params.min_size) {
            continue;
        }
        lines.entry(key).or_default().push(word);
    }

    let mut detections = Vec::new();
    for (_, mut words) in lines {
        words.sort_by_key(|word| word.x);
        for segment in split_segments(words, params) {
            detections.push(build_detection(&segment));
        }
    }
    detections
}

fn split_segments(words: Vec<WordToken>, params: &OcrParams) -> Vec<Vec<WordToken>> {
    let mut segments: Vec<Vec<WordToken>> = Vec::new();
    for word in words {
        if let Some(last) = segments.last().and_then(|segment| segment.last()) {
            let height = last.h.max(word.h).max(1) as f32;
            let gap = (word.x - last.right()) as f32;
            let drift = (word.center_y() - last.center_y()).abs();
            if gap <= params.width_ths * height && drift <= params.height_ths * height {
                if let Some(segment) = segments.last_mut() {
                    segment.push(word);
                }
                continue;
            }
        }
        segments.push(vec![word]);
    }
    segments
}

fn build_detection(words: &[WordToken]) -> TextDetection {
    let x1 = words.iter().map(|w| w.x).min().unwrap_or(0);
    let y1 = words.iter().map(|w| w.y).min().unwrap_or(0);
    let x2 = words.iter().map(|w| w.right()).max().unwrap_or(0);
    let y2 = words.iter().map(|w| w.y + w.h).max().unwrap_or(0);
    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    // weight by length so a long confident word dominates a stray glyph
    let total = words.iter().map(|w| w.text.chars().count()).sum::<usize>().max(1) as f32;
    let confidence = words
        .iter()
        .map(|w| w.conf * w.text.chars().count() as f32)
        .sum::<f32>()
        / total;
    TextDetection::new(Quad::from_rect(x1, y1, x2 - x1, y2 - y1), text, confidence)
}
