//! Decimal degrees to EXIF GPS rationals, and a sidecar metadata sink.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::gps::ExtractionResult;
use crate::ocr::TextDetection;

pub const MAP_DATUM: &str = "WGS-84";
pub const GPS_VERSION: [u8; 4] = [2, 2, 0, 0];
const SECONDS_DENOMINATOR: u32 = 1_000_000;

pub const FIELD_VERSION_ID: &str = "GPSVersionID";
pub const FIELD_LATITUDE_REF: &str = "GPSLatitudeRef";
pub const FIELD_LATITUDE: &str = "GPSLatitude";
pub const FIELD_LONGITUDE_REF: &str = "GPSLongitudeRef";
pub const FIELD_LONGITUDE: &str = "GPSLongitude";
pub const FIELD_MAP_DATUM: &str = "GPSMapDatum";

pub const EXIF_GROUP: &str = "Exif";
pub const FIELD_USER_COMMENT: &str = "UserComment";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    /// Whole values keep denominator 1; anything else is stored in millionths.
    pub fn from_f64(value: f64) -> Self {
        if value.fract() == 0.0 {
            Self {
                numerator: value as u32,
                denominator: 1,
            }
        } else {
            Self {
                numerator: (value * f64::from(SECONDS_DENOMINATOR)).round() as u32,
                denominator: SECONDS_DENOMINATOR,
            }
        }
    }

    pub fn to_f64(self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator.max(1))
    }
}

impl From<[u32; 2]> for Rational {
    fn from([numerator, denominator]: [u32; 2]) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

impl From<Rational> for [u32; 2] {
    fn from(value: Rational) -> Self {
        [value.numerator, value.denominator]
    }
}

/// Splits `|decimal|` into whole degrees, whole minutes and fractional seconds.
pub fn decimal_to_dms(decimal: f64) -> [Rational; 3] {
    let magnitude = decimal.abs();
    let degrees = magnitude.floor();
    let minutes_float = (magnitude - degrees) * 60.0;
    let minutes = minutes_float.floor();
    let seconds = (minutes_float - minutes) * 60.0;
    [
        Rational::from_f64(degrees),
        Rational::from_f64(minutes),
        Rational::from_f64(seconds),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeoExifRecord {
    pub latitude_ref: char,
    pub latitude: [Rational; 3],
    pub longitude_ref: char,
    pub longitude: [Rational; 3],
    pub map_datum: &'static str,
}

impl GeoExifRecord {
    pub fn from_decimal(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude_ref: if latitude >= 0.0 { 'N' } else { 'S' },
            latitude: decimal_to_dms(latitude),
            longitude_ref: if longitude >= 0.0 { 'E' } else { 'W' },
            longitude: decimal_to_dms(longitude),
            map_datum: MAP_DATUM,
        }
    }

    pub fn from_extraction(result: &ExtractionResult) -> Self {
        Self::from_decimal(result.latitude, result.longitude)
    }

    /// Signed decimal degrees `(latitude, longitude)`.
    pub fn to_decimal(&self) -> (f64, f64) {
        let unsigned = |dms: &[Rational; 3]| {
            dms[0].to_f64() + dms[1].to_f64() / 60.0 + dms[2].to_f64() / 3600.0
        };
        let lat = unsigned(&self.latitude);
        let lon = unsigned(&self.longitude);
        (
            if self.latitude_ref == 'S' { -lat } else { lat },
            if self.longitude_ref == 'W' { -lon } else { lon },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GpsValue {
    Text(String),
    Rationals(Vec<Rational>),
    Bytes(Vec<u8>),
}

/// Image metadata as seen by the sink: a `GPS` field group plus whatever
/// other groups were already present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataBlock {
    #[serde(rename = "GPS", default, skip_serializing_if = "Option::is_none")]
    pub gps: Option<BTreeMap<String, GpsValue>>,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

impl MetadataBlock {
    /// Writes the record's fields into the `GPS` group, creating the group if needed.
    pub fn apply(&mut self, record: &GeoExifRecord) {
        let gps = self.gps.get_or_insert_with(BTreeMap::new);
        gps.insert(FIELD_VERSION_ID.to_string(), GpsValue::Bytes(GPS_VERSION.to_vec()));
        gps.insert(
            FIELD_LATITUDE_REF.to_string(),
            GpsValue::Text(record.latitude_ref.to_string()),
        );
        gps.insert(
            FIELD_LATITUDE.to_string(),
            GpsValue::Rationals(record.latitude.to_vec()),
        );
        gps.insert(
            FIELD_LONGITUDE_REF.to_string(),
            GpsValue::Text(record.longitude_ref.to_string()),
        );
        gps.insert(
            FIELD_LONGITUDE.to_string(),
            GpsValue::Rationals(record.longitude.to_vec()),
        );
        gps.insert(
            FIELD_MAP_DATUM.to_string(),
            GpsValue::Text(record.map_datum.to_string()),
        );
    }

    /// Sets `Exif.UserComment`, keeping any other fields of the `Exif` group.
    pub fn set_user_comment(&mut self, comment: &str) {
        let group = self
            .other
            .entry(EXIF_GROUP.to_string())
            .or_insert_with(|| serde_json::Value::Object(Default::default()));
        if !group.is_object() {
            *group = serde_json::Value::Object(Default::default());
        }
        if let Some(fields) = group.as_object_mut() {
            fields.insert(
                FIELD_USER_COMMENT.to_string(),
                serde_json::Value::String(comment.to_string()),
            );
        }
    }

    pub fn user_comment(&self) -> Option<&str> {
        self.other
            .get(EXIF_GROUP)?
            .get(FIELD_USER_COMMENT)?
            .as_str()
    }
}

#[derive(Serialize)]
struct OcrComment<'a> {
    ocr_data: &'a [TextDetection],
    processed_at: &'a str,
}

/// JSON payload stored in `UserComment`: the detections and when they were read.
pub fn ocr_comment(detections: &[TextDetection], processed_at: &str) -> Result<String> {
    serde_json::to_string(&OcrComment {
        ocr_data: detections,
        processed_at,
    })
    .with_context(|| "failed to serialize OCR comment")
}

/// Destination for georeference metadata and the OCR record.
pub trait MetadataSink {
    fn write_gps(&mut self, record: &GeoExifRecord) -> Result<()>;

    fn write_user_comment(&mut self, comment: &str) -> Result<()>;
}

impl MetadataSink for MetadataBlock {
    fn write_gps(&mut self, record: &GeoExifRecord) -> Result<()> {
        self.apply(record);
        Ok(())
    }

    fn write_user_comment(&mut self, comment: &str) -> Result<()> {
        self.set_user_comment(comment);
        Ok(())
    }
}

/// Keeps metadata in a `<image>.geo.json` file beside the image.
#[derive(Debug, Clone)]
pub struct SidecarSink {
    path: PathBuf,
}

impl SidecarSink {
    pub fn for_image(image_path: &Path) -> Self {
        let mut name = image_path.as_os_str().to_os_string();
        name.push(".geo.json");
        Self {
            path: PathBuf::from(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the existing block; a missing or blank file is an empty block.
    pub fn load(&self) -> Result<MetadataBlock> {
        if !self.path.exists() {
            return Ok(MetadataBlock::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read metadata: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(MetadataBlock::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse metadata: {}", self.path.display()))
    }

    /// Loads the block, lets `edit` change it and writes it back in one go.
    pub fn update<F>(&self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut MetadataBlock) -> Result<()>,
    {
        let mut block = self.load()?;
        edit(&mut block)?;
        let rendered = serde_json::to_string_pretty(&block)
            .with_context(|| "failed to serialize metadata")?;
        fs::write(&self.path, rendered)
            .with_context(|| format!("failed to write metadata: {}", self.path.display()))?;
        debug!(path = %self.path.display(), "wrote image metadata");
        Ok(())
    }
}

impl MetadataSink for SidecarSink {
    fn write_gps(&mut self, record: &GeoExifRecord) -> Result<()> {
        self.update(|block| block.write_gps(record))
    }

    fn write_user_comment(&mut self, comment: &str) -> Result<()> {
        self.update(|block| block.write_user_comment(comment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn splits_into_rationals() {
        let record = GeoExifRecord::from_decimal(40.7128, -74.006);
        assert_eq!(record.latitude_ref, 'N');
        assert_eq!(record.longitude_ref, 'W');
        assert_eq!(record.latitude[0], Rational { numerator: 40, denominator: 1 });
        assert_eq!(record.latitude[1], Rational { numerator: 42, denominator: 1 });
        assert_eq!(record.latitude[2].denominator, 1_000_000);
        assert!((record.latitude[2].to_f64() - 46.08).abs() < 1e-6);
        assert_eq!(record.longitude[0], Rational { numerator: 74, denominator: 1 });
        assert_eq!(record.map_datum, "WGS-84");
    }

    #[test]
    fn round_trip_is_within_tolerance() {
        for (lat, lon) in [(40.7128, -74.006), (-33.8688, 151.2093), (9.645239, 125.549558)] {
            let (back_lat, back_lon) = GeoExifRecord::from_decimal(lat, lon).to_decimal();
            assert!((back_lat - lat).abs() < 1e-5, "{lat} -> {back_lat}");
            assert!((back_lon - lon).abs() < 1e-5, "{lon} -> {back_lon}");
        }
    }

    #[test]
    fn whole_seconds_use_unit_denominator() {
        let [_, _, seconds] = decimal_to_dms(10.5);
        assert_eq!(seconds, Rational { numerator: 0, denominator: 1 });
    }

    #[test]
    fn empty_block_gets_a_gps_group() {
        let mut block = MetadataBlock::default();
        block
            .write_gps(&GeoExifRecord::from_decimal(-1.5, 2.25))
            .expect("write");
        let gps = block.gps.expect("gps group");
        assert_eq!(gps[FIELD_LATITUDE_REF], GpsValue::Text("S".to_string()));
        assert_eq!(gps[FIELD_MAP_DATUM], GpsValue::Text("WGS-84".to_string()));
        assert_eq!(gps[FIELD_VERSION_ID], GpsValue::Bytes(vec![2, 2, 0, 0]));
    }

    #[test]
    fn user_comment_sits_next_to_gps() {
        let dir = tempdir().expect("tempdir");
        let mut sink = SidecarSink::for_image(&dir.path().join("shot.jpg"));
        let detections = vec![TextDetection::new(
            crate::ocr::Quad::from_rect(0, 0, 10, 4),
            "GPS: 14.5995, 120.9842",
            0.9,
        )];
        let comment = ocr_comment(&detections, "2024-03-09 16:00:00").expect("comment");
        sink.write_user_comment(&comment).expect("comment write");
        sink.write_gps(&GeoExifRecord::from_decimal(14.5995, 120.9842))
            .expect("gps write");

        let block = sink.load().expect("load");
        assert!(block.gps.is_some());
        let stored: serde_json::Value =
            serde_json::from_str(block.user_comment().expect("user comment")).expect("json");
        assert_eq!(stored["processed_at"], "2024-03-09 16:00:00");
        assert_eq!(stored["ocr_data"][0]["text"], "GPS: 14.5995, 120.9842");
        assert_eq!(stored["ocr_data"][0]["coordinates"]["bottom_right"], serde_json::json!([10, 4]));
    }

    #[test]
    fn user_comment_keeps_other_exif_fields() {
        let mut block = MetadataBlock::default();
        block
            .other
            .insert(EXIF_GROUP.to_string(), serde_json::json!({"Make": "Acme"}));
        block.set_user_comment("{}");
        assert_eq!(block.other[EXIF_GROUP]["Make"], "Acme");
        assert_eq!(block.user_comment(), Some("{}"));
    }

    #[test]
    fn sidecar_tolerates_blank_file_and_keeps_other_groups() {
        let dir = tempdir().expect("tempdir");
        let image = dir.path().join("frame.jpg");
        let mut sink = SidecarSink::for_image(&image);
        fs::write(sink.path(), "").expect("blank sidecar");
        sink.write_gps(&GeoExifRecord::from_decimal(14.5995, 120.9842))
            .expect("write blank");

        let mut block = sink.load().expect("load");
        block
            .other
            .insert("Exif".to_string(), serde_json::json!({"UserComment": "hi"}));
        fs::write(sink.path(), serde_json::to_string(&block).expect("json")).expect("rewrite");

        sink.write_gps(&GeoExifRecord::from_decimal(40.7128, -74.006))
            .expect("write again");
        let block = sink.load().expect("reload");
        assert!(block.other.contains_key("Exif"));
        let gps = block.gps.expect("gps group");
        assert_eq!(gps[FIELD_LONGITUDE_REF], GpsValue::Text("W".to_string()));
        assert_eq!(
            sink.path().file_name().and_then(|n| n.to_str()),
            Some("frame.jpg.geo.json")
        );
    }
}
