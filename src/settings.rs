use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ocr::MergeThresholds;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub language: String,
    pub gpu: bool,
    pub multi_pass: bool,
    pub roi_detection: bool,
    /// Zero means one worker per CPU.
    pub workers: usize,
    pub merge: MergeThresholds,
    pub sidecar: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            gpu: false,
            multi_pass: true,
            roi_detection: true,
            workers: 0,
            merge: MergeThresholds::default(),
            sidecar: false,
        }
    }
}

impl Settings {
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    ocr: Option<OcrSettings>,
    merge: Option<MergeSettings>,
    output: Option<OutputSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    language: Option<String>,
    gpu: Option<bool>,
    multi_pass: Option<bool>,
    roi_detection: Option<bool>,
    workers: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct MergeSettings {
    overlap_threshold: Option<f64>,
    text_threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputSettings {
    sidecar: Option<bool>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings.merge_toml(DEFAULT_SETTINGS_TOML, Path::new("<embedded>"))?;
    ensure_home_settings_file()?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings.merge_toml(&content, &path)?;
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge_toml(&mut self, content: &str, origin: &Path) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)
            .with_context(|| format!("failed to parse settings: {}", origin.display()))?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(ocr) = incoming.ocr {
            if let Some(language) = ocr.language {
                if !language.trim().is_empty() {
                    self.language = language.trim().to_string();
                }
            }
            if let Some(gpu) = ocr.gpu {
                self.gpu = gpu;
            }
            if let Some(multi_pass) = ocr.multi_pass {
                self.multi_pass = multi_pass;
            }
            if let Some(roi) = ocr.roi_detection {
                self.roi_detection = roi;
            }
            if let Some(workers) = ocr.workers {
                self.workers = workers;
            }
        }
        if let Some(merge) = incoming.merge {
            if let Some(overlap) = merge.overlap_threshold {
                if (0.0..=1.0).contains(&overlap) {
                    self.merge.overlap = overlap;
                }
            }
            if let Some(text) = merge.text_threshold {
                if (0.0..=1.0).contains(&text) {
                    self.merge.text = text;
                }
            }
        }
        if let Some(output) = incoming.output {
            if let Some(sidecar) = output.sidecar {
                self.sidecar = sidecar;
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".ocr-geotag-rust"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn embedded_defaults_match_struct_defaults() {
        let mut settings = Settings::default();
        settings
            .merge_toml(DEFAULT_SETTINGS_TOML, Path::new("<embedded>"))
            .expect("embedded");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn writes_home_settings_and_layers_extra_file() {
        with_temp_home(|home| {
            let extra = home.join("extra.toml");
            fs::write(
                &extra,
                "[ocr]\nlanguage = \"jpn\"\nworkers = 3\n[merge]\noverlap_threshold = 0.7\n[output]\nsidecar = true\n",
            )
            .expect("write extra");

            let settings = load_settings(Some(&extra)).expect("settings");
            assert!(home.join(".ocr-geotag-rust").join("settings.toml").exists());
            assert_eq!(settings.language, "jpn");
            assert_eq!(settings.workers, 3);
            assert_eq!(settings.effective_workers(), 3);
            assert_eq!(settings.merge.overlap, 0.7);
            assert_eq!(settings.merge.text, 0.8);
            assert!(settings.sidecar);
            assert!(settings.multi_pass);
        });
    }

    #[test]
    fn home_local_overrides_home() {
        with_temp_home(|home| {
            let dir = home.join(".ocr-geotag-rust");
            fs::create_dir_all(&dir).expect("dir");
            fs::write(dir.join("settings.toml"), "[ocr]\nroi_detection = false\n").expect("write");
            fs::write(dir.join("settings.local.toml"), "[ocr]\ngpu = true\n").expect("write");
            let settings = load_settings(None).expect("settings");
            assert!(!settings.roi_detection);
            assert!(settings.gpu);
        });
    }

    #[test]
    fn missing_extra_file_is_an_error() {
        with_temp_home(|home| {
            let err = load_settings(Some(&home.join("nope.toml"))).expect_err("missing");
            assert!(err.to_string().contains("settings file not found"));
        });
    }

    #[test]
    fn out_of_range_thresholds_are_ignored() {
        let mut settings = Settings::default();
        settings
            .merge_toml("[merge]\ntext_threshold = 1.5\n", Path::new("inline"))
            .expect("merge");
        assert_eq!(settings.merge.text, 0.8);
    }
}
