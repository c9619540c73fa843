//! Configuration and serialization module.

use crate::error::{Result, SceneError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest object identifier in the reference set.
pub const MAX_OBJECT_ID: u32 = 100;
/// Angular step between reference orientations, in degrees.
pub const ANGLE_STEP: u32 = 5;
/// Gaussian blur sigma applied to every finished sample.
pub const BLUR_SIGMA: f32 = 1.0;
/// Largest accepted side of the padded canvas.
pub const MAX_CANVAS_SIDE: u32 = 16384;

/// Scene generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Object identifiers to draw from.
    pub object_ids: Vec<u32>,
    /// Reference orientations to draw from (degrees).
    pub orientation_angles: Vec<u32>,
    /// Number of samples to write.
    pub sample_count: usize,
    /// Objects composited into each sample.
    pub objects_per_sample: usize,
    /// Side of the un-padded canvas in pixels.
    pub output_resolution: u32,
    /// Side of the written sample after resizing.
    pub final_size: u32,
    /// Minimum distance of object centres to the canvas border.
    pub min_border_margin: u32,
    /// Uniform scale factor range.
    pub scale_range: ScaleRange,
    /// Background gray value, also the mask threshold.
    pub background_intensity: u8,
    /// Side of the reference images in pixels.
    pub source_object_size: u32,
    /// Seed for reproducible runs; entropy when absent.
    pub seed: Option<u64>,
    /// Where reference images are read and samples are written.
    pub output: OutputConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            object_ids: (1..=25).collect(),
            orientation_angles: (0..360).step_by(ANGLE_STEP as usize).collect(),
            sample_count: 1000,
            objects_per_sample: 3,
            output_resolution: 512,
            final_size: 256,
            min_border_margin: 64,
            scale_range: ScaleRange::default(),
            background_intensity: 30,
            source_object_size: 128,
            seed: None,
            output: OutputConfig::default(),
        }
    }
}

/// Scale factor bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self { min: 0.75, max: 1.5 }
    }
}

impl ScaleRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, scale: f64) -> bool {
        self.min <= scale && scale <= self.max
    }
}

/// File locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding `obj{id}__{angle}.png` reference images.
    pub library_dir: PathBuf,
    /// Root of the generated data; removed and recreated on each run.
    pub output_dir: PathBuf,
    /// Sub-directory of `output_dir` receiving the images.
    pub image_subdir: String,
    /// Image file extension, which also selects the encoder.
    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            library_dir: PathBuf::from("../../data/coil-100"),
            output_dir: PathBuf::from("../../data/test-1000"),
            image_subdir: "images".to_string(),
            extension: "png".to_string(),
        }
    }
}

impl OutputConfig {
    /// Directory the samples land in.
    pub fn image_dir(&self) -> PathBuf {
        self.output_dir.join(&self.image_subdir)
    }
}

impl SceneConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Side of the square tile that holds any rotated and scaled source image,
    /// also the padding added on every side of the canvas.
    pub fn pad(&self) -> u32 {
        self.pad_extent() as u32
    }

    /// Side of the padded working canvas.
    pub fn canvas_size(&self) -> u32 {
        self.output_resolution + 2 * self.pad()
    }

    fn pad_extent(&self) -> f64 {
        let size = self.source_object_size as f64;
        (self.scale_range.max * (2.0 * size * size).sqrt()).ceil()
    }

    /// Half-open placement interval shared by both axes.
    pub fn placement_range(&self) -> std::ops::Range<u32> {
        self.min_border_margin..self.output_resolution.saturating_sub(self.min_border_margin)
    }

    /// Check every field against its domain.
    pub fn validate(&self) -> Result<()> {
        if self.object_ids.is_empty() {
            return Err(invalid("object_ids must not be empty"));
        }
        if let Some(id) = self
            .object_ids
            .iter()
            .find(|&&id| id == 0 || id > MAX_OBJECT_ID)
        {
            return Err(invalid(format!(
                "object id {} outside 1..={}",
                id, MAX_OBJECT_ID
            )));
        }

        if self.orientation_angles.is_empty() {
            return Err(invalid("orientation_angles must not be empty"));
        }
        if let Some(angle) = self
            .orientation_angles
            .iter()
            .find(|&&a| a >= 360 || a % ANGLE_STEP != 0)
        {
            return Err(invalid(format!(
                "orientation angle {} is not a multiple of {} below 360",
                angle, ANGLE_STEP
            )));
        }

        if self.sample_count == 0 {
            return Err(invalid("sample_count must be positive"));
        }
        if self.output_resolution == 0 || self.final_size == 0 {
            return Err(invalid("output_resolution and final_size must be positive"));
        }
        if self.source_object_size == 0 {
            return Err(invalid("source_object_size must be positive"));
        }

        let ScaleRange { min, max } = self.scale_range;
        if !min.is_finite() || !max.is_finite() || min <= 0.0 {
            return Err(invalid(format!(
                "scale range ({}, {}) must be finite and positive",
                min, max
            )));
        }
        if min > max {
            return Err(invalid(format!(
                "scale range minimum {} exceeds maximum {}",
                min, max
            )));
        }

        if self.placement_range().is_empty() {
            return Err(invalid(format!(
                "border margin {} leaves no placement room in a {} pixel canvas",
                self.min_border_margin, self.output_resolution
            )));
        }

        let canvas_side = self.output_resolution as f64 + 2.0 * self.pad_extent();
        if canvas_side > MAX_CANVAS_SIDE as f64 {
            return Err(invalid(format!(
                "padded canvas side {} exceeds {} pixels",
                canvas_side, MAX_CANVAS_SIDE
            )));
        }

        if self.output.extension.is_empty() {
            return Err(invalid("output extension must not be empty"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> SceneError {
    SceneError::InvalidConfiguration(message.into())
}
