//! Synthetic Scene Compositor
//!
//! Generates labeled test images for a visual-recognition pipeline by
//! compositing randomly chosen, randomly posed object crops from a fixed
//! reference set (COIL-100 layout) onto uniform backgrounds:
//! - Affine pose pipeline (translate, rotate, scale, translate back)
//! - Threshold-mask compositing onto a padded canvas
//! - Crop, Gaussian blur and resize to the final sample size

pub mod compositor;
pub mod config;
pub mod error;
pub mod library;
pub mod output;
pub mod sampling;
pub mod transform;

pub use compositor::{generate, Canvas, SceneCompositor};
pub use config::{OutputConfig, ScaleRange, SceneConfig};
pub use error::{Result, SceneError};
pub use library::{DirectoryLibrary, MemoryLibrary, ReferenceLibrary};
pub use output::{DirectorySink, SampleSink};
pub use sampling::{ObjectPose, RandomSource, RngSource};
pub use transform::{AffineOp, AffinePipeline};
