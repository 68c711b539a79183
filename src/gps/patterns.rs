use anyhow::{Context, Result};
use regex::{Captures, Regex};

/// Spellings OCR produces for the degree glyph.
const DEGREE: &str = r"(?:[°º˚o0]|\s*deg(?:rees?)?)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFamily {
    LabeledTag,
    LatLonLabeled,
    DmsDirectionFirst,
    DmsDirectionLast,
    DdmDirectionFirst,
    DdmDirectionLast,
    DecimalDirectionSeparate,
    DecimalDirectionAttached,
    PureDecimal,
    DmsSpaced,
    DmsSpacedReversed,
    DmsCommaSeparated,
}

/// Source patterns in declaration order; `<deg>` expands to [`DEGREE`].
const RULES: &[(FormatFamily, u8, &str)] = &[
    (
        FormatFamily::LabeledTag,
        10,
        r"(?:GPS|COORDINATES?)[:\s]*\(?([+-]?\d{1,2}(?:\.\d{1,8})?)(?:<deg>\s*)?(?:\s*([NS])\b)?\s*,?\s*([+-]?\d{1,3}(?:\.\d{1,8})?)(?:<deg>\s*)?(?:\s*([EW])\b)?\)?",
    ),
    (
        FormatFamily::LatLonLabeled,
        9,
        r"(?:LATITUDE|LAT)[:\s]*([+-]?\d{1,2}(?:\.\d{1,8})?)(?:<deg>\s*)?(?:\s*([NS])\b)?\s*,?\s*(?:LONGITUDE|LONG|LON)[:\s]*([+-]?\d{1,3}(?:\.\d{1,8})?)(?:<deg>\s*)?(?:\s*([EW])\b)?",
    ),
    (
        FormatFamily::DmsDirectionFirst,
        9,
        r#"([NS])\s*(\d{1,2})(?:<deg>\s*)(\d{1,2})['′\s]+(\d{1,2}(?:\.\d+)?)["″\s]*,?\s*([EW])\s*(\d{1,3})(?:<deg>\s*)(\d{1,2})['′\s]+(\d{1,2}(?:\.\d+)?)["″\s]*"#,
    ),
    (
        FormatFamily::DmsDirectionLast,
        9,
        r#"(\d{1,2})(?:<deg>\s*)(\d{1,2})['′\s]+(\d{1,2}(?:\.\d+)?)["″\s]*([NS])\s*,?\s*(\d{1,3})(?:<deg>\s*)(\d{1,2})['′\s]+(\d{1,2}(?:\.\d+)?)["″\s]*([EW])"#,
    ),
    (
        FormatFamily::DdmDirectionFirst,
        8,
        r"([NS])\s*(\d{1,2})(?:<deg>\s*)(\d{1,2}\.?\d*)['′\s]*,?\s*([EW])\s*(\d{1,3})(?:<deg>\s*)(\d{1,2}\.?\d*)['′\s]*",
    ),
    (
        FormatFamily::DdmDirectionLast,
        8,
        r"(\d{1,2})(?:<deg>\s*)(\d{1,2}\.?\d*)['′\s]*([NS])\s*,?\s*(\d{1,3})(?:<deg>\s*)(\d{1,2}\.?\d*)['′\s]*([EW])",
    ),
    (
        FormatFamily::DecimalDirectionSeparate,
        7,
        r"([NS])\s*([+-]?\d{1,2}\.?\d{0,8})(?:<deg>\s*)?,?\s*([EW])\s*([+-]?\d{1,3}\.?\d{0,8})(?:<deg>\s*)?",
    ),
    (
        FormatFamily::DecimalDirectionAttached,
        7,
        r"([+-]?\d{1,2}\.?\d{0,8})(?:<deg>\s*)?([NS])\s*,?\s*([+-]?\d{1,3}\.?\d{0,8})(?:<deg>\s*)?([EW])",
    ),
    (
        FormatFamily::PureDecimal,
        5,
        r"([+-]?\d{1,2}\.\d{4,8})(?:<deg>\s*)?,?\s*([+-]?\d{1,3}\.\d{4,8})(?:<deg>\s*)?",
    ),
    (
        FormatFamily::DmsSpaced,
        8,
        r#"([NS])\s*(\d{1,2})\s*[°º˚o]\s*(\d{1,2})\s*[′']\s*(\d{1,2}\.\d+)\s*[″"]\s*([EW])\s*(\d{1,3})\s*[°º˚o]\s*(\d{1,2})\s*[′']\s*(\d{1,2}\.\d+)\s*[″"]"#,
    ),
    (
        FormatFamily::DmsSpacedReversed,
        8,
        r#"(\d{1,2})\s*[°º˚o]\s*(\d{1,2})\s*[′']\s*(\d{1,2}\.\d+)\s*[″"]\s*([NS])\s*(\d{1,3})\s*[°º˚o]\s*(\d{1,2})\s*[′']\s*(\d{1,2}\.\d+)\s*[″"]\s*([EW])"#,
    ),
    (
        FormatFamily::DmsCommaSeparated,
        9,
        r#"([NS])\s+(\d{1,2})°\s+(\d{1,2})'\s+(\d{1,2}\.\d+)"\s*,\s*([EW])\s+(\d{1,3})°\s+(\d{1,2})'\s+(\d{1,2}\.\d+)""#,
    ),
];

#[derive(Debug, Clone)]
pub struct PatternRule {
    pub family: FormatFamily,
    pub priority: u8,
    pub regex: Regex,
}

/// Compiles the rule bank, ordered by descending priority. Rules sharing a
/// priority keep their declaration order, which makes selection reproducible.
pub fn rule_bank() -> Result<Vec<PatternRule>> {
    let mut rules = RULES
        .iter()
        .map(|&(family, priority, source)| {
            let pattern = format!("(?i){}", source.replace("<deg>", DEGREE));
            let regex = Regex::new(&pattern)
                .with_context(|| format!("invalid coordinate pattern for {:?}", family))?;
            Ok(PatternRule {
                family,
                priority,
                regex,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    Ok(rules)
}

impl PatternRule {
    /// Converts one match into signed decimal degrees.
    /// Returns `None` when a group is missing or not a number.
    pub fn parse(&self, caps: &Captures) -> Option<(f64, f64)> {
        use FormatFamily::*;
        let (lat, lon) = match self.family {
            LabeledTag | LatLonLabeled => (
                hemisphere(number(caps, 1)?, letter(caps, 2)),
                hemisphere(number(caps, 3)?, letter(caps, 4)),
            ),
            DmsDirectionFirst | DmsSpaced | DmsCommaSeparated => (
                hemisphere(dms(caps, 2, 3, 4)?, letter(caps, 1)),
                hemisphere(dms(caps, 6, 7, 8)?, letter(caps, 5)),
            ),
            DmsDirectionLast | DmsSpacedReversed => (
                hemisphere(dms(caps, 1, 2, 3)?, letter(caps, 4)),
                hemisphere(dms(caps, 5, 6, 7)?, letter(caps, 8)),
            ),
            DdmDirectionFirst => (
                hemisphere(ddm(caps, 2, 3)?, letter(caps, 1)),
                hemisphere(ddm(caps, 5, 6)?, letter(caps, 4)),
            ),
            DdmDirectionLast => (
                hemisphere(ddm(caps, 1, 2)?, letter(caps, 3)),
                hemisphere(ddm(caps, 4, 5)?, letter(caps, 6)),
            ),
            DecimalDirectionSeparate => (
                hemisphere(number(caps, 2)?, letter(caps, 1)),
                hemisphere(number(caps, 4)?, letter(caps, 3)),
            ),
            DecimalDirectionAttached => (
                hemisphere(number(caps, 1)?, letter(caps, 2)),
                hemisphere(number(caps, 3)?, letter(caps, 4)),
            ),
            PureDecimal => (number(caps, 1)?, number(caps, 2)?),
        };
        Some((lat, lon))
    }
}

fn number(caps: &Captures, idx: usize) -> Option<f64> {
    caps.get(idx)?.as_str().parse().ok()
}

fn letter(caps: &Captures, idx: usize) -> Option<char> {
    caps.get(idx)?.as_str().chars().next()
}

/// South and west are negative.
fn hemisphere(value: f64, letter: Option<char>) -> f64 {
    match letter.map(|c| c.to_ascii_uppercase()) {
        Some('S') | Some('W') => -value,
        _ => value,
    }
}

pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

pub fn ddm_to_decimal(degrees: f64, minutes: f64) -> f64 {
    degrees + minutes / 60.0
}

fn dms(caps: &Captures, d: usize, m: usize, s: usize) -> Option<f64> {
    Some(dms_to_decimal(
        number(caps, d)?,
        number(caps, m)?,
        number(caps, s)?,
    ))
}

fn ddm(caps: &Captures, d: usize, m: usize) -> Option<f64> {
    Some(ddm_to_decimal(number(caps, d)?, number(caps, m)?))
}
