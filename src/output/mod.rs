//! Sample persistence.

use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::config::OutputConfig;
use crate::error::Result;

/// Destination for finished samples.
pub trait SampleSink {
    /// Store sample number `index`.
    fn persist(&mut self, index: usize, image: &RgbImage) -> Result<()>;
}

/// Collects samples in memory.
impl SampleSink for Vec<RgbImage> {
    fn persist(&mut self, _index: usize, image: &RgbImage) -> Result<()> {
        self.push(image.clone());
        Ok(())
    }
}

/// File name of sample `index`, zero-padded to six digits.
pub fn sample_file_name(index: usize, extension: &str) -> String {
    format!("sample_{:06}.{}", index, extension)
}

/// Writes samples as image files into one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    extension: String,
}

impl DirectorySink {
    /// Sink writing into an existing directory.
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    /// Remove any previous output, recreate the layout and return a sink
    /// writing into the image sub-directory.
    pub fn prepare(output: &OutputConfig) -> Result<Self> {
        if output.output_dir.exists() {
            log::info!("Removing previous output at {}", output.output_dir.display());
            std::fs::remove_dir_all(&output.output_dir)?;
        }

        let image_dir = output.image_dir();
        std::fs::create_dir_all(&image_dir)?;

        Ok(Self::new(image_dir, output.extension.clone()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(sample_file_name(index, &self.extension))
    }
}

impl SampleSink for DirectorySink {
    fn persist(&mut self, index: usize, image: &RgbImage) -> Result<()> {
        let path = self.path_for(index);
        image.save(&path)?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}
