use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub drawing: DrawingConfig,
    #[serde(default)]
    pub crop: CropConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f32,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f32,
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingConfig {
    /// Smallest accepted box side, in normalized units.
    #[serde(default = "default_min_box_size")]
    pub min_box_size: f32,
    #[serde(default = "default_manual_category")]
    pub manual_category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropConfig {
    #[serde(default = "default_context_ratio")]
    pub context_ratio: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Detections below this confidence are dropped on ingestion.
    #[serde(default)]
    pub min_confidence: f32,
    #[serde(default = "default_false")]
    pub merge_overlaps: bool,
    /// Same-tag detections overlapping more than this are merged.
    #[serde(default = "default_overlap_iou")]
    pub overlap_iou: f32,
    /// Detections overlapping more than this are merged whatever their tag.
    #[serde(default = "default_strong_overlap_iou")]
    pub strong_overlap_iou: f32,
}

// Default value functions
fn default_min_zoom() -> f32 {
    0.5
}

fn default_max_zoom() -> f32 {
    3.0
}

fn default_zoom_step() -> f32 {
    0.25
}

fn default_min_box_size() -> f32 {
    crate::geometry::DEFAULT_MIN_BOX_SIZE
}

fn default_manual_category() -> String {
    crate::state::MANUAL_CATEGORY.to_string()
}

fn default_context_ratio() -> f32 {
    crate::crop::DEFAULT_CONTEXT_RATIO
}

fn default_false() -> bool {
    false
}

fn default_overlap_iou() -> f32 {
    0.3
}

fn default_strong_overlap_iou() -> f32 {
    0.7
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            zoom_step: default_zoom_step(),
        }
    }
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            min_box_size: default_min_box_size(),
            manual_category: default_manual_category(),
        }
    }
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            context_ratio: default_context_ratio(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
            merge_overlaps: false,
            overlap_iou: default_overlap_iou(),
            strong_overlap_iou: default_strong_overlap_iou(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportConfig::default(),
            drawing: DrawingConfig::default(),
            crop: CropConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Replace values the engine cannot work with by their defaults.
    pub fn validated(mut self) -> Self {
        let vp = &self.viewport;
        let zoom_ok = vp.min_zoom > 0.0
            && vp.min_zoom <= 1.0
            && vp.max_zoom >= 1.0
            && vp.zoom_step > 0.0
            && [vp.min_zoom, vp.max_zoom, vp.zoom_step].iter().all(|v| v.is_finite());
        if !zoom_ok {
            log::warn!("Invalid viewport config {:?}; using defaults", self.viewport);
            self.viewport = ViewportConfig::default();
        }
        let (floor, ceiling) = (default_min_zoom(), default_max_zoom());
        let vp = &mut self.viewport;
        if vp.min_zoom < floor || vp.max_zoom > ceiling {
            log::warn!(
                "Zoom range {}..{} exceeds {floor}..{ceiling}; clamping",
                vp.min_zoom,
                vp.max_zoom
            );
            vp.min_zoom = vp.min_zoom.max(floor);
            vp.max_zoom = vp.max_zoom.min(ceiling);
        }

        if !(self.drawing.min_box_size.is_finite() && self.drawing.min_box_size >= 0.0) {
            log::warn!("Invalid min_box_size {}; using default", self.drawing.min_box_size);
            self.drawing.min_box_size = default_min_box_size();
        }
        if self.drawing.manual_category.trim().is_empty() {
            self.drawing.manual_category = default_manual_category();
        }

        if !(self.crop.context_ratio.is_finite() && self.crop.context_ratio > 0.0) {
            log::warn!("Invalid context_ratio {}; using default", self.crop.context_ratio);
            self.crop.context_ratio = default_context_ratio();
        }

        let ingest = &mut self.ingest;
        if !ingest.min_confidence.is_finite() {
            ingest.min_confidence = 0.0;
        }
        ingest.min_confidence = ingest.min_confidence.clamp(0.0, 1.0);
        if !(0.0..=1.0).contains(&ingest.overlap_iou) {
            ingest.overlap_iou = default_overlap_iou();
        }
        if !(0.0..=1.0).contains(&ingest.strong_overlap_iou) {
            ingest.strong_overlap_iou = default_strong_overlap_iou();
        }
        self
    }
}

/// Get the path to the config file
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dirs = directories::ProjectDirs::from("", "", "plan_review").ok_or(ConfigError::NoConfigDir)?;
    Ok(dirs.config_dir().join("config.toml"))
}

/// Load configuration from `path` (or the platform default), falling back to
/// defaults when the file is missing or unusable.
pub fn load_config(path: Option<&Path>) -> EngineConfig {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match config_path() {
            Ok(p) => p,
            Err(e) => {
                log::warn!("{e}. Using default config.");
                return EngineConfig::default();
            }
        },
    };

    if !path.exists() {
        log::debug!("No config at {}; using defaults", path.display());
        return EngineConfig::default();
    }

    match read_config(&path) {
        Ok(config) => config.validated(),
        Err(e) => {
            log::warn!("{e}. Using default config.");
            EngineConfig::default()
        }
    }
}

fn read_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Save configuration to `path`, creating parent directories as needed.
pub fn save_config(config: &EngineConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let toml = toml::to_string_pretty(config)?;

    std::fs::write(path, toml).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
