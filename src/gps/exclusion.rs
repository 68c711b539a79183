use anyhow::{Context, Result};
use regex::RegexSet;

/// Words that make a match trustworthy regardless of the exclusion bank.
const GPS_KEYWORDS: &[&str] = &[
    "GPS", "COORD", "LAT", "LON", "LATITUDE", "LONGITUDE", "MAP", "LOCATION", "POSITION",
];

const DEGREE_MARKS: &[&str] = &["°", "º", "deg", "'", "\""];

/// Readings that look numeric but are not coordinates.
const NOT_COORDINATES: &[&str] = &[
    // clock and calendar
    r"\d{1,2}:\d{2}:\d{2}",
    r"\d{1,2}:\d{2}\s*(?:AM|PM)",
    r"\d{2,4}[-/]\d{1,2}[-/]\d{1,2}",
    r"\d{1,2}/\d{1,2}/\d{2,4}",
    // sizes, money, ratios
    r"[\d.]+\s*(?:KB|MB|GB|TB|KBPS|MBPS|GBPS)",
    r"\$[\d,.]+",
    r"[\d.]+\s*(?:%|PERCENT|PCT)",
    // physical units
    r"[\d.]+\s*(?:MM|CM|M|KM|IN|FT|YD|MI)",
    r"[\d.]+\s*(?:KG|MG|LBS?|OZ)\b",
    r"[\d.]+\s*(?:V|VOLT|A|AMP|W|WATT|OHM)",
    r"[\d.]+\s*(?:°C|°F|CELSIUS|FAHRENHEIT|KELVIN)",
    r"[\d.]+\s*(?:HPA|MBAR|PSI|INHG)\b",
    // camera settings and identifiers
    r"ISO\s*\d+",
    r"F[/\\]\d+",
    r"\d+\s*(?:MP|MEGAPIXEL|MPX)",
    r"SHUTTER\s*SPEED\s*[\d/]+",
    r"(?:SERIAL|MODEL)\s*[:#]?\s*[\w-]+",
    r"VERSION\s*[:#]?\s*[\w.]+",
    r"(?:FOCAL\s*LENGTH|APERTURE|EXPOSURE(?:\s*BIAS)?|RESOLUTION|FILE\s*SIZE)\s*[\d.]+",
    r"(?:BIT\s*RATE|BITRATE|FRAMERATE|SAMPLE\s*RATE)\s*[\d.]+",
    r"(?:DPI|BIT\s*DEPTH|CHANNELS?|TRACK|STREAM|LAYER)\s*\d+",
    r"(?:DURATION|ASPECT\s*RATIO)\s*[\d:.]+",
    r"(?:COLOR\s*SPACE|SCAN\s*TYPE)\s*\w+",
    r"(?:WHITE\s*BALANCE|COMPRESSION|PROFILE|ENCODER|DECODER|FORMAT|CODEC|PIXEL\s*FORMAT|COLOR\s*PROFILE|FLASH|LENS|FILTER|PRESET)\s*\w+",
    r"(?:GAMMA|CONTRAST|BRIGHTNESS|SATURATION|HUE|SHARPNESS|NOISE\s*REDUCTION|DYNAMIC\s*RANGE)\s*[\d.]+",
    // environmental and physical quantities
    r"(?:PRESSURE|HUMIDITY|WIND\s*SPEED|ALTITUDE|DEPTH|WEIGHT|VOLUME|AREA|DENSITY|VISCOSITY|VELOCITY|ACCELERATION|FORCE|ENERGY|POWER|FREQUENCY|WAVELENGTH)\s*[\d.]+",
    // photometry and radiometry
    r"(?:INTENSITY|LUMINANCE|ILLUMINANCE|RADIANCE|IRRADIANCE|FLUX)\s*[\d.]+",
    r"LUMINOUS\s*(?:FLUX|INTENSITY|EMITTANCE|EXPOSURE|ENERGY|EFFICACY|EFFICIENCY)\s*[\d.]+",
    r"(?:SPECTRAL|PHOTON|QUANTUM|RADIOMETRIC|PHOTOMETRIC)\s*(?:LUMINOUS\s*)?(?:POWER|FLUX|INTENSITY|RADIANCE|IRRADIANCE|EMITTANCE|EXPOSURE|ENERGY|EFFICACY|EFFICIENCY|LUMINANCE|ILLUMINANCE)\s*[\d.]+",
];

pub struct ExclusionBank {
    patterns: RegexSet,
}

impl ExclusionBank {
    pub fn new() -> Result<Self> {
        let patterns = RegexSet::new(NOT_COORDINATES.iter().map(|p| format!("(?i){}", p)))
            .with_context(|| "invalid exclusion pattern")?;
        Ok(Self { patterns })
    }

    /// True when `source` reads like a timestamp, unit, camera setting or
    /// other non-coordinate number. GPS keywords override every other check.
    pub fn is_excluded(&self, source: &str) -> bool {
        let upper = source.trim().to_uppercase();
        if has_gps_keyword(&upper) {
            return false;
        }
        if self.patterns.is_match(&upper) {
            return true;
        }
        // a bare label like "SPEED: 45.1234" without any keyword
        if source.contains(':') {
            return true;
        }
        let words = source.split_whitespace().count();
        words > 5 && !DEGREE_MARKS.iter().any(|mark| source.contains(mark))
    }
}

pub(super) fn has_gps_keyword(upper: &str) -> bool {
    GPS_KEYWORDS.iter().any(|keyword| upper.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> ExclusionBank {
        ExclusionBank::new().expect("bank")
    }

    #[test]
    fn rejects_camera_and_clock_readings() {
        let bank = bank();
        for text in [
            "ISO 400, F/2.8, 1/125s",
            "12:45:09",
            "2024-03-18",
            "4.7 MB",
            "$12.50",
            "85%",
            "12.4 km",
            "3.7V",
            "21.5°C",
            "1013 hPa",
            "MODEL: X100V",
            "SPECTRAL RADIANCE 4.52",
            "LUMINOUS EFFICACY 93.1",
        ] {
            assert!(bank.is_excluded(text), "expected exclusion for {text:?}");
        }
    }

    #[test]
    fn keywords_override_exclusions() {
        let bank = bank();
        assert!(!bank.is_excluded("GPS 12:45:09 14.5995 120.9842"));
        assert!(!bank.is_excluded("Location: 12.4 km north"));
    }

    #[test]
    fn plain_dms_is_not_excluded() {
        let bank = bank();
        assert!(!bank.is_excluded("N 9° 38' 42.861\", E 125° 32' 58.411\""));
        assert!(!bank.is_excluded("14.5995N, 120.9842E"));
    }

    #[test]
    fn colon_or_long_prose_without_keyword_is_excluded() {
        let bank = bank();
        assert!(bank.is_excluded("SPEED: 45.1234, 12.5678"));
        assert!(bank.is_excluded("recorded by the dash camera on highway 14.5995 120.9842"));
    }
}
