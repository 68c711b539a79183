use anyhow::{anyhow, Context, Result};
use futures_util::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::exif::{ocr_comment, GeoExifRecord, MetadataSink, SidecarSink};
use crate::gps::CoordinateExtractor;
use crate::ocr::{
    merge_detections, plan_scan_jobs, run_scan_jobs, MergeThresholds, ModelCache, ModelKey,
    OcrEngine, TesseractEngine,
};
use crate::report::{BatchReport, ImageFailure, ImageReport};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    pub multi_pass: bool,
    pub roi_detection: bool,
    pub merge: MergeThresholds,
    pub sidecar: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            multi_pass: true,
            roi_detection: true,
            merge: MergeThresholds::default(),
            sidecar: false,
        }
    }
}

/// Engine for `key`, built by `factory` at most once per cache.
pub fn load_engine<E, F>(models: &ModelCache<E>, key: &ModelKey, factory: F) -> Result<Arc<E>>
where
    F: FnOnce() -> Result<E>,
{
    models
        .get_or_create(key, factory)
        .with_context(|| format!("failed to initialise OCR model for {}", key.language))
}

/// Builds the Tesseract engine a key describes.
pub fn tesseract_factory(
    key: &ModelKey,
) -> impl FnOnce() -> Result<TesseractEngine> + Send + 'static {
    let key = key.clone();
    move || TesseractEngine::new(&key.language, key.accelerated)
}

/// Loads the model, then processes the batch.
///
/// A model that cannot be initialised fails the whole call before any image
/// is opened; per-image failures are recorded in the report instead.
pub async fn run_batch<E, F>(
    models: Arc<ModelCache<E>>,
    key: ModelKey,
    factory: F,
    extractor: Arc<CoordinateExtractor>,
    paths: Vec<PathBuf>,
    options: PipelineOptions,
    workers: usize,
) -> Result<BatchReport>
where
    E: OcrEngine + 'static,
    F: FnOnce() -> Result<E> + Send + 'static,
{
    let engine = tokio::task::spawn_blocking(move || load_engine(models.as_ref(), &key, factory))
        .await
        .with_context(|| "model loader task failed")??;
    Ok(process_batch(engine, extractor, paths, options, workers).await)
}

/// Decode, scan, merge and geolocate a single image.
pub fn process_image(
    engine: &dyn OcrEngine,
    extractor: &CoordinateExtractor,
    path: &Path,
    options: &PipelineOptions,
) -> Result<ImageReport> {
    let image = image::open(path)
        .with_context(|| format!("failed to open image: {}", path.display()))?;
    let jobs = plan_scan_jobs(
        image.width(),
        image.height(),
        options.multi_pass,
        options.roi_detection,
    );
    let raw = run_scan_jobs(engine, &image, &jobs)
        .with_context(|| format!("OCR failed: {}", path.display()))?;
    let raw_count = raw.len();
    let detections = merge_detections(raw, options.merge);
    debug!(
        path = %path.display(),
        raw = raw_count,
        merged = detections.len(),
        "detections merged"
    );

    let texts: Vec<&str> = detections.iter().map(|d| d.text.as_str()).collect();
    let coordinates = extractor.extract(&texts);
    match &coordinates {
        Some(found) => info!(
            path = %path.display(),
            latitude = found.latitude,
            longitude = found.longitude,
            confidence = found.extraction_confidence.as_str(),
            "coordinates found"
        ),
        None => debug!(path = %path.display(), "no coordinates found"),
    }

    let report = ImageReport::new(path, detections, coordinates);
    if options.sidecar {
        if let Err(err) = write_sidecar(path, &report) {
            warn!(path = %path.display(), error = %format!("{:#}", err), "failed to write sidecar");
        }
    }
    Ok(report)
}

/// Stores the OCR record for every image, plus GPS fields when a coordinate was found.
fn write_sidecar(path: &Path, report: &ImageReport) -> Result<()> {
    let comment = ocr_comment(&report.text_data, &report.processed_at)?;
    SidecarSink::for_image(path).update(|block| {
        block.write_user_comment(&comment)?;
        if let Some(found) = &report.gps_coordinates {
            block.write_gps(&GeoExifRecord::from_extraction(found))?;
        }
        Ok(())
    })
}

/// Processes `paths` on the blocking pool, at most `workers` at a time.
/// Results keep input order; failed images land in `errors`.
pub async fn process_batch(
    engine: Arc<dyn OcrEngine>,
    extractor: Arc<CoordinateExtractor>,
    paths: Vec<PathBuf>,
    options: PipelineOptions,
    workers: usize,
) -> BatchReport {
    let total = paths.len();
    let done = Arc::new(AtomicUsize::new(0));
    let outcomes: Vec<(PathBuf, Result<ImageReport>)> = stream::iter(paths)
        .map(|path| {
            let engine = Arc::clone(&engine);
            let extractor = Arc::clone(&extractor);
            let done = Arc::clone(&done);
            async move {
                let job_path = path.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    process_image(engine.as_ref(), &extractor, &job_path, &options)
                })
                .await
                .map_err(|err| anyhow!("image worker failed: {}", err))
                .and_then(|result| result);
                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                info!(
                    progress = %format!("{:.0}%", finished as f64 * 100.0 / total as f64),
                    "processed {} of {}",
                    finished,
                    total
                );
                (path, outcome)
            }
        })
        .buffered(workers.max(1))
        .collect()
        .await;

    let mut report = BatchReport::default();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(image_report) => report.results.push(image_report),
            Err(err) => {
                warn!(path = %path.display(), error = %format!("{:#}", err), "image failed");
                report.errors.push(ImageFailure::new(&path, &err));
            }
        }
    }
    report
}
