//! Error types for scene generation.

use thiserror::Error;

/// Errors that can abort a generation run.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Reference image missing for object {object_id} at {angle} degrees")]
    MissingReferenceImage { object_id: u32, angle: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Object pose transform is not invertible")]
    DegenerateTransform,
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SceneError>;
