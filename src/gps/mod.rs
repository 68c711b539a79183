//! Coordinate extraction from OCR text.
//!
//! A bank of format rules is run over the joined text; each match is parsed
//! into decimal degrees, checked against plausibility and false-positive
//! rules, and the highest-priority survivor wins.

mod exclusion;
mod extract;
mod patterns;
mod validate;

use serde::Serialize;

pub use exclusion::ExclusionBank;
pub use extract::{Candidate, CoordinateExtractor};
pub use patterns::{ddm_to_decimal, dms_to_decimal, rule_bank, FormatFamily, PatternRule};
pub use validate::Rejection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "MEDIUM-HIGH")]
    MediumHigh,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "LOW")]
    Low,
}

impl Confidence {
    pub fn from_priority(priority: u8) -> Self {
        match priority {
            9..=u8::MAX => Confidence::High,
            7..=8 => Confidence::MediumHigh,
            5..=6 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::MediumHigh => "MEDIUM-HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub latitude: f64,
    pub longitude: f64,
    pub source_text: String,
    pub extraction_confidence: Confidence,
}

/// Rough measure of how much GPS vocabulary the text carries.
/// Informational only; selection never looks at it.
pub fn context_score(text: &str) -> u32 {
    const STRONG: &[&str] = &["GPS", "COORDINATES", "LOCATION", "POSITION", "WAYPOINT", "GEOCODED"];
    const MEDIUM: &[&str] = &["LAT", "LON", "LATITUDE", "LONGITUDE", "MAP", "NAVIGATION"];
    const WEAK: &[&str] = &["NORTH", "SOUTH", "EAST", "WEST", "DEGREE", "MINUTE", "SECOND"];
    const SYMBOLS: &[&str] = &["°", "'", "\"", "N", "S", "E", "W"];

    let upper = text.to_uppercase();
    let hits = |words: &[&str]| words.iter().filter(|w| upper.contains(*w)).count() as u32;
    let mut score = 3 * hits(STRONG) + 2 * hits(MEDIUM) + hits(WEAK);
    if SYMBOLS.iter().any(|s| text.contains(s)) {
        score += 1;
    }
    score
}
