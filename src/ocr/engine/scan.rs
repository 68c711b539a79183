use anyhow::{anyhow, Result};
use image::DynamicImage;
use tracing::{debug, warn};

use crate::ocr::TextDetection;

use super::preprocess::crop_region;
use super::OcrEngine;

/// Tuning passed to the OCR engine for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcrParams {
    /// Smallest glyph height in pixels that is still reported.
    pub min_size: u32,
    /// Minimum recognition confidence in `[0, 1]`.
    pub text_threshold: f32,
    /// Horizontal merge distance, as a multiple of the text height.
    pub width_ths: f32,
    /// Vertical merge distance, as a multiple of the text height.
    pub height_ths: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sensitivity {
    Low,
    Medium,
    High,
    Max,
}

impl Sensitivity {
    pub fn params(self) -> OcrParams {
        match self {
            Sensitivity::Low => OcrParams {
                min_size: 10,
                text_threshold: 0.8,
                width_ths: 0.5,
                height_ths: 0.5,
            },
            Sensitivity::Medium => OcrParams {
                min_size: 5,
                text_threshold: 0.6,
                width_ths: 0.5,
                height_ths: 0.5,
            },
            Sensitivity::High => OcrParams {
                min_size: 3,
                text_threshold: 0.4,
                width_ths: 0.5,
                height_ths: 0.5,
            },
            Sensitivity::Max => OcrParams {
                min_size: 2,
                text_threshold: 0.3,
                width_ths: 0.3,
                height_ths: 0.3,
            },
        }
    }
}

/// Pixel rectangle `[x1, x2) x [y1, y2)` in full-image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Region {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x1: 0,
            y1: 0,
            x2: width,
            y2: height,
        }
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn is_full(&self, width: u32, height: u32) -> bool {
        *self == Region::full(width, height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanJob {
    pub region: Region,
    pub sensitivity: Sensitivity,
}

/// Corner and edge crops where recording apps usually burn in telemetry.
fn overlay_regions(w: u32, h: u32) -> [Region; 8] {
    let r = |x1, y1, x2, y2| Region { x1, y1, x2, y2 };
    [
        r(0, 0, w / 3, h / 4),
        r(w * 2 / 3, 0, w, h / 4),
        r(w / 3, 0, w * 2 / 3, h / 6),
        r(0, h * 3 / 4, w / 3, h),
        r(w * 2 / 3, h * 3 / 4, w, h),
        r(w / 3, h * 5 / 6, w * 2 / 3, h),
        r(0, h / 3, w / 6, h * 2 / 3),
        r(w * 5 / 6, h / 3, w, h * 2 / 3),
    ]
}

/// Jobs for one image, in the order they are run.
///
/// Region crops come first at maximum sensitivity, then the full frame at
/// rising sensitivity. Without multi-pass only the strict full-frame pass runs.
pub fn plan_scan_jobs(width: u32, height: u32, multi_pass: bool, roi: bool) -> Vec<ScanJob> {
    let mut jobs = Vec::new();
    if roi {
        jobs.extend(overlay_regions(width, height).into_iter().map(|region| ScanJob {
            region,
            sensitivity: Sensitivity::Max,
        }));
    }
    let passes: &[Sensitivity] = if multi_pass {
        &[Sensitivity::Low, Sensitivity::Medium, Sensitivity::High]
    } else {
        &[Sensitivity::Low]
    };
    jobs.extend(passes.iter().map(|&sensitivity| ScanJob {
        region: Region::full(width, height),
        sensitivity,
    }));
    jobs
}

fn run_job(engine: &dyn OcrEngine, image: &DynamicImage, job: &ScanJob) -> Result<Vec<TextDetection>> {
    let (width, height) = (image.width(), image.height());
    let params = job.sensitivity.params();
    if job.region.is_full(width, height) {
        return engine.read_text(image, &params);
    }
    let crop = crop_region(image, &job.region)?;
    let detections = engine.read_text(&crop, &params)?;
    let (dx, dy) = (i64::from(job.region.x1), i64::from(job.region.y1));
    Ok(detections
        .into_iter()
        .map(|d| TextDetection {
            quad: d.quad.translate(dx, dy),
            ..d
        })
        .collect())
}

/// Runs every job and returns all raw detections in full-image coordinates.
///
/// A failing job is logged and skipped. The call only fails when every job
/// failed, in which case the last error is returned.
pub fn run_scan_jobs(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
    jobs: &[ScanJob],
) -> Result<Vec<TextDetection>> {
    let mut detections = Vec::new();
    let mut last_error = None;
    let mut succeeded = 0usize;
    for job in jobs {
        match run_job(engine, image, job) {
            Ok(found) => {
                debug!(?job, count = found.len(), "scan job finished");
                succeeded += 1;
                detections.extend(found);
            }
            Err(err) => {
                warn!(?job, error = %err, "scan job failed; skipping");
                last_error = Some(err);
            }
        }
    }
    match last_error {
        Some(err) if succeeded == 0 => Err(err.context("every scan job failed")),
        _ if jobs.is_empty() => Err(anyhow!("no scan jobs planned")),
        _ => Ok(detections),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::Quad;
    use std::sync::Mutex;

    struct RecordingEngine {
        calls: Mutex<Vec<(u32, u32, OcrParams)>>,
        fail_on_width: Option<u32>,
    }

    impl RecordingEngine {
        fn new(fail_on_width: Option<u32>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on_width,
            }
        }
    }

    impl OcrEngine for RecordingEngine {
        fn read_text(&self, image: &DynamicImage, params: &OcrParams) -> Result<Vec<TextDetection>> {
            self.calls
                .lock()
                .expect("calls lock")
                .push((image.width(), image.height(), *params));
            if Some(image.width()) == self.fail_on_width {
                return Err(anyhow!("engine exploded"));
            }
            Ok(vec![TextDetection::new(Quad::from_rect(1, 2, 3, 4), "x", 0.5)])
        }
    }

    #[test]
    fn plans_regions_then_full_passes() {
        let jobs = plan_scan_jobs(600, 480, true, true);
        assert_eq!(jobs.len(), 11);
        assert!(jobs[..8].iter().all(|job| job.sensitivity == Sensitivity::Max));
        assert_eq!(jobs[0].region, Region { x1: 0, y1: 0, x2: 200, y2: 120 });
        assert_eq!(jobs[5].region, Region { x1: 200, y1: 400, x2: 400, y2: 480 });
        assert_eq!(jobs[7].region, Region { x1: 500, y1: 160, x2: 600, y2: 320 });
        let tiers: Vec<_> = jobs[8..].iter().map(|job| job.sensitivity).collect();
        assert_eq!(tiers, [Sensitivity::Low, Sensitivity::Medium, Sensitivity::High]);
        assert!(jobs[8..].iter().all(|job| job.region.is_full(600, 480)));
    }

    #[test]
    fn single_pass_without_regions() {
        let jobs = plan_scan_jobs(600, 480, false, false);
        assert_eq!(jobs, [ScanJob { region: Region::full(600, 480), sensitivity: Sensitivity::Low }]);
    }

    #[test]
    fn sensitivity_loosens_thresholds() {
        let tiers = [Sensitivity::Low, Sensitivity::Medium, Sensitivity::High, Sensitivity::Max];
        for pair in tiers.windows(2) {
            let (a, b) = (pair[0].params(), pair[1].params());
            assert!(b.min_size < a.min_size);
            assert!(b.text_threshold < a.text_threshold);
        }
    }

    #[test]
    fn region_detections_are_mapped_back() {
        let engine = RecordingEngine::new(None);
        let image = DynamicImage::new_luma8(600, 480);
        let jobs = [ScanJob {
            region: Region { x1: 400, y1: 360, x2: 600, y2: 480 },
            sensitivity: Sensitivity::Max,
        }];
        let found = run_scan_jobs(&engine, &image, &jobs).expect("scan");
        assert_eq!(found[0].quad, Quad::from_rect(401, 362, 3, 4));
        let calls = engine.calls.lock().expect("calls lock");
        assert_eq!((calls[0].0, calls[0].1), (200, 120));
        assert_eq!(calls[0].2, Sensitivity::Max.params());
    }

    #[test]
    fn failing_job_does_not_abort_others() {
        let engine = RecordingEngine::new(Some(200));
        let image = DynamicImage::new_luma8(600, 480);
        let jobs = plan_scan_jobs(600, 480, true, true);
        let found = run_scan_jobs(&engine, &image, &jobs).expect("scan");
        assert_eq!(engine.calls.lock().expect("calls lock").len(), jobs.len());
        // the six 200px-wide crops fail, everything else reports one hit
        assert_eq!(found.len(), jobs.len() - 6);
    }

    #[test]
    fn empty_crop_is_skipped() {
        let engine = RecordingEngine::new(None);
        let image = DynamicImage::new_luma8(600, 480);
        let jobs = [
            ScanJob {
                region: Region { x1: 100, y1: 0, x2: 100, y2: 50 },
                sensitivity: Sensitivity::Max,
            },
            ScanJob {
                region: Region::full(600, 480),
                sensitivity: Sensitivity::Low,
            },
        ];
        let found = run_scan_jobs(&engine, &image, &jobs).expect("scan");
        assert_eq!(found.len(), 1);
        assert_eq!(engine.calls.lock().expect("calls lock").len(), 1);
    }

    #[test]
    fn all_jobs_failing_is_an_error() {
        let engine = RecordingEngine::new(Some(600));
        let image = DynamicImage::new_luma8(600, 480);
        let jobs = plan_scan_jobs(600, 480, true, false);
        assert!(run_scan_jobs(&engine, &image, &jobs).is_err());
    }
}
