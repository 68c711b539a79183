use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub mod exif;
pub mod gps;
pub mod logging;
pub mod ocr;
pub mod pipeline;
pub mod report;
pub mod settings;
#[cfg(test)]
mod test_util;

pub use exif::{GeoExifRecord, MetadataBlock, MetadataSink, SidecarSink};
pub use gps::{Confidence, CoordinateExtractor, ExtractionResult};
pub use ocr::{ModelCache, ModelKey, OcrEngine, TextDetection};
pub use pipeline::{process_batch, process_image, run_batch, PipelineOptions};
pub use report::{BatchReport, ImageFailure, ImageReport};

/// Command-line overrides; `None` keeps the layered settings value.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub images: Vec<PathBuf>,
    pub lang: Option<String>,
    pub gpu: bool,
    pub no_multi_pass: bool,
    pub no_roi: bool,
    pub workers: Option<usize>,
    pub embed: bool,
    pub settings_path: Option<String>,
    /// Text-only mode also reports the context score.
    pub verbose: bool,
}

/// Runs a batch over `config.images`, or extracts from `input` lines when no
/// images are given. Returns pretty JSON.
pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;
    apply_overrides(&mut settings, &config);

    let extractor = CoordinateExtractor::new()?;
    if config.images.is_empty() {
        let input = input.unwrap_or_default();
        return extract_from_text(&extractor, &input, config.verbose);
    }

    let key = ModelKey::new(settings.language.clone(), settings.gpu);
    let factory = pipeline::tesseract_factory(&key);
    let options = PipelineOptions {
        multi_pass: settings.multi_pass,
        roi_detection: settings.roi_detection,
        merge: settings.merge,
        sidecar: settings.sidecar,
    };
    let workers = settings.effective_workers();
    info!(images = config.images.len(), workers, "starting batch");
    let report = pipeline::run_batch(
        Arc::new(ModelCache::new()),
        key,
        factory,
        Arc::new(extractor),
        config.images,
        options,
        workers,
    )
    .await?;
    info!(
        processed = report.results.len(),
        located = report.located(),
        failed = report.errors.len(),
        "batch finished"
    );
    serde_json::to_string_pretty(&report).with_context(|| "failed to serialize report")
}

fn apply_overrides(settings: &mut settings::Settings, config: &Config) {
    if let Some(lang) = config.lang.as_deref() {
        if !lang.trim().is_empty() {
            settings.language = lang.trim().to_string();
        }
    }
    if config.gpu {
        settings.gpu = true;
    }
    if config.no_multi_pass {
        settings.multi_pass = false;
    }
    if config.no_roi {
        settings.roi_detection = false;
    }
    if let Some(workers) = config.workers {
        settings.workers = workers;
    }
    if config.embed {
        settings.sidecar = true;
    }
}

#[derive(Serialize)]
struct TextModeOutput {
    result: Option<ExtractionResult>,
    context_score: u32,
}

/// Each non-blank line is one fragment. Prints `null` when nothing is found.
/// With `with_context_score` the result is wrapped as `{result, context_score}`.
pub fn extract_from_text(
    extractor: &CoordinateExtractor,
    input: &str,
    with_context_score: bool,
) -> Result<String> {
    let fragments: Vec<&str> = input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let result = extractor.extract(&fragments);
    let rendered = if with_context_score {
        serde_json::to_string_pretty(&TextModeOutput {
            result,
            context_score: gps::context_score(&fragments.join(" ")),
        })
    } else {
        serde_json::to_string_pretty(&result)
    };
    rendered.with_context(|| "failed to serialize result")
}
