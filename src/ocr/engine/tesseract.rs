use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use std::io::Write;
use std::process::Command;
use tracing::{debug, warn};

use crate::ocr::TextDetection;

use super::parse::parse_tsv_detections;
use super::preprocess::prepare_for_ocr;
use super::scan::OcrParams;
use super::OcrEngine;

pub fn list_tesseract_languages() -> Result<Vec<String>> {
    let output = Command::new("tesseract")
        .arg("--list-langs")
        .output()
        .with_context(|| "failed to run tesseract --list-langs (is it installed?)")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract --list-langs failed: {}", stderr.trim()));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect())
}

/// OCR engine backed by the `tesseract` command line tool.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    language: String,
}

impl TesseractEngine {
    /// Checks that the language model is installed before any image is read.
    pub fn new(language: &str, accelerated: bool) -> Result<Self> {
        let language = language.trim();
        if language.is_empty() {
            return Err(anyhow!("ocr language is empty"));
        }
        let available = list_tesseract_languages()?;
        let missing = language
            .split('+')
            .filter(|lang| !available.iter().any(|value| value == lang))
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(anyhow!(
                "ocr language(s) not available: {} (available: {})",
                missing.join(", "),
                available.join(", ")
            ));
        }
        if accelerated {
            warn!("tesseract has no GPU backend; running {} on CPU", language);
        }
        debug!(language, "tesseract engine ready");
        Ok(Self {
            language: language.to_string(),
        })
    }

    fn run_tsv(&self, path: &std::path::Path) -> Result<String> {
        let output = Command::new("tesseract")
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--oem")
            .arg("1")
            // sparse text: overlays are scattered lines, not paragraphs
            .arg("--psm")
            .arg("11")
            .arg("tsv")
            .output()
            .with_context(|| "failed to run tesseract (is it installed?)")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tesseract failed: {}", stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl OcrEngine for TesseractEngine {
    fn read_text(&self, image: &DynamicImage, params: &OcrParams) -> Result<Vec<TextDetection>> {
        let prepared = DynamicImage::ImageLuma8(prepare_for_ocr(image));
        let mut tmp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .with_context(|| "failed to create temp file for OCR")?;
        prepared
            .write_to(&mut tmp, image::ImageFormat::Png)
            .with_context(|| "failed to write temp image for OCR")?;
        tmp.flush().ok();

        let tsv = self.run_tsv(tmp.path())?;
        Ok(parse_tsv_detections(&tsv, params))
    }
}
