use super::exclusion::ExclusionBank;

const CONTEXT_INDICATORS: &[&str] = &["N", "S", "E", "W", "GPS", "LAT", "LON", "COORD"];

/// Why a parsed coordinate was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    OutOfRange,
    Excluded,
    Degenerate,
    NullIsland,
    LowPrecision,
    Equatorial,
    Antarctic,
}

/// Applies the plausibility rules in order and reports the first one that fails.
pub(super) fn validate(
    lat: f64,
    lon: f64,
    source: &str,
    exclusions: &ExclusionBank,
) -> Result<(), Rejection> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(Rejection::OutOfRange);
    }
    if exclusions.is_excluded(source) {
        return Err(Rejection::Excluded);
    }
    if lat.fract() == 0.0 && lon.fract() == 0.0 && lat.abs() < 10.0 && lon.abs() < 10.0 {
        return Err(Rejection::Degenerate);
    }
    if lat == 0.0 && lon == 0.0 {
        return Err(Rejection::NullIsland);
    }

    let upper = source.to_uppercase();
    let has_context = CONTEXT_INDICATORS.iter().any(|c| upper.contains(c));
    let required = if has_context { 2 } else { 4 };
    if decimal_places(lat) < required || decimal_places(lon) < required {
        return Err(Rejection::LowPrecision);
    }

    let strong_keyword = upper.contains("GPS") || upper.contains("COORD");
    if lat.abs() < 30.0 && lon.abs() < 30.0 && !strong_keyword {
        return Err(Rejection::Equatorial);
    }
    if lat < -60.0 && !upper.contains("ANTARCTIC") {
        return Err(Rejection::Antarctic);
    }
    Ok(())
}

/// Digits after the point in the shortest round-trip rendering of `|value|`.
/// Whole numbers count as one place, as in `12.0`.
fn decimal_places(value: f64) -> usize {
    let rendered = value.abs().to_string();
    match rendered.split_once('.') {
        Some((_, fraction)) => fraction.len(),
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(lat: f64, lon: f64, source: &str) -> Result<(), Rejection> {
        validate(lat, lon, source, &ExclusionBank::new().expect("bank"))
    }

    #[test]
    fn accepts_tagged_reading() {
        assert_eq!(check(14.5995, 120.9842, "GPS: 14.5995, 120.9842"), Ok(()));
    }

    #[test]
    fn range_is_checked_first() {
        assert_eq!(check(91.0, 10.0, "GPS 91 10"), Err(Rejection::OutOfRange));
        assert_eq!(check(45.0, -180.5, "GPS"), Err(Rejection::OutOfRange));
    }

    #[test]
    fn small_whole_numbers_are_degenerate() {
        assert_eq!(check(3.0, 4.0, "GPS 3 4"), Err(Rejection::Degenerate));
    }

    #[test]
    fn origin_never_survives() {
        assert!(check(0.0, 0.0, "GPS COORDINATES 0.000 0.000").is_err());
        assert_eq!(check(0.0, 0.5, "GPS 0 0.5"), Err(Rejection::LowPrecision));
    }

    #[test]
    fn precision_depends_on_context() {
        assert_eq!(check(45.12, 120.34, "45.12 120.34"), Err(Rejection::LowPrecision));
        assert_eq!(check(45.12, 120.34, "45.12 N 120.34 E"), Ok(()));
        assert_eq!(check(45.1, 120.34, "45.1 N 120.34 E"), Err(Rejection::LowPrecision));
        assert_eq!(check(45.1234, 120.3456, "45.1234 120.3456"), Ok(()));
    }

    #[test]
    fn equatorial_box_needs_strong_keyword() {
        assert_eq!(check(12.3456, 20.5432, "12.3456N 20.5432E"), Err(Rejection::Equatorial));
        assert_eq!(check(12.3456, 20.5432, "GPS 12.3456 20.5432"), Ok(()));
    }

    #[test]
    fn antarctic_needs_its_name() {
        assert_eq!(check(-77.8463, 166.6683, "77.8463S 166.6683E"), Err(Rejection::Antarctic));
        assert_eq!(check(-77.8463, 166.6683, "ANTARCTIC 77.8463S 166.6683E"), Ok(()));
    }

    #[test]
    fn counts_decimal_places() {
        assert_eq!(decimal_places(14.5995), 4);
        assert_eq!(decimal_places(-74.006), 3);
        assert_eq!(decimal_places(12.0), 1);
    }
}
