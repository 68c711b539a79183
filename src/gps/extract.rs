use anyhow::Result;
use tracing::debug;

use super::exclusion::ExclusionBank;
use super::patterns::{rule_bank, FormatFamily, PatternRule};
use super::validate::validate;
use super::{Confidence, ExtractionResult};

/// A parsed guess that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub latitude: f64,
    pub longitude: f64,
    pub source_text: String,
    pub priority: u8,
    pub family: FormatFamily,
}

/// Finds the best-supported coordinate pair in OCR text.
pub struct CoordinateExtractor {
    rules: Vec<PatternRule>,
    exclusions: ExclusionBank,
}

impl CoordinateExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            rules: rule_bank()?,
            exclusions: ExclusionBank::new()?,
        })
    }

    /// Every validated candidate in discovery order: rules by descending
    /// priority (declaration order within a priority), then matches left to right.
    pub fn candidates(&self, corpus: &str) -> Vec<Candidate> {
        let mut found = Vec::new();
        for rule in &self.rules {
            for caps in rule.regex.captures_iter(corpus) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                let Some((latitude, longitude)) = rule.parse(&caps) else {
                    continue;
                };
                let source_text = whole.as_str().trim().to_string();
                if let Err(reason) = validate(latitude, longitude, &source_text, &self.exclusions) {
                    debug!(?rule.family, %source_text, ?reason, "candidate rejected");
                    continue;
                }
                found.push(Candidate {
                    latitude,
                    longitude,
                    source_text,
                    priority: rule.priority,
                    family: rule.family,
                });
            }
        }
        found
    }

    /// Joins the fragments and returns the highest-priority candidate.
    ///
    /// Ties go to the first candidate in [`Self::candidates`] order, so the
    /// same text always yields the same result.
    pub fn extract<S: AsRef<str>>(&self, fragments: &[S]) -> Option<ExtractionResult> {
        let corpus = fragments
            .iter()
            .map(|fragment| fragment.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        let best = select(self.candidates(&corpus))?;
        debug!(
            family = ?best.family,
            priority = best.priority,
            context_score = super::context_score(&corpus),
            "coordinate selected"
        );
        Some(ExtractionResult {
            latitude: best.latitude,
            longitude: best.longitude,
            source_text: best.source_text,
            extraction_confidence: Confidence::from_priority(best.priority),
        })
    }
}

fn select(candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(current) if current.priority >= candidate.priority => Some(current),
        _ => Some(candidate),
    })
}
