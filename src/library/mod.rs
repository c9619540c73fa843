//! Reference object library.
//!
//! Read-only store of object crops keyed by `(object_id, angle)`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::error::{Result, SceneError};

/// Source of reference object images.
pub trait ReferenceLibrary {
    /// Fetch the image of `object_id` seen from `angle` degrees.
    fn fetch(&self, object_id: u32, angle: u32) -> Result<RgbImage>;
}

/// Library backed by a COIL-100 style directory of `obj{id}__{angle}.png` files.
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
    expected_size: Option<u32>,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            expected_size: None,
        }
    }

    /// Warn when a fetched image is not `size` x `size`.
    pub fn with_expected_size(mut self, size: u32) -> Self {
        self.expected_size = Some(size);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_name(object_id: u32, angle: u32) -> String {
        format!("obj{}__{}.png", object_id, angle)
    }

    pub fn path_for(&self, object_id: u32, angle: u32) -> PathBuf {
        self.root.join(Self::file_name(object_id, angle))
    }
}

impl ReferenceLibrary for DirectoryLibrary {
    fn fetch(&self, object_id: u32, angle: u32) -> Result<RgbImage> {
        let path = self.path_for(object_id, angle);
        if !path.is_file() {
            return Err(SceneError::MissingReferenceImage { object_id, angle });
        }

        let image = image::open(&path)?.to_rgb8();

        if let Some(size) = self.expected_size {
            if image.width() != size || image.height() != size {
                log::warn!(
                    "Reference {} is {}x{}, expected {}x{}",
                    path.display(),
                    image.width(),
                    image.height(),
                    size,
                    size
                );
            }
        }

        Ok(image)
    }
}

/// In-memory library.
#[derive(Debug, Clone, Default)]
pub struct MemoryLibrary {
    images: HashMap<(u32, u32), RgbImage>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object_id: u32, angle: u32, image: RgbImage) {
        self.images.insert((object_id, angle), image);
    }

    pub fn with(mut self, object_id: u32, angle: u32, image: RgbImage) -> Self {
        self.insert(object_id, angle, image);
        self
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ReferenceLibrary for MemoryLibrary {
    fn fetch(&self, object_id: u32, angle: u32) -> Result<RgbImage> {
        self.images
            .get(&(object_id, angle))
            .cloned()
            .ok_or(SceneError::MissingReferenceImage { object_id, angle })
    }
}

impl<L: ReferenceLibrary + ?Sized> ReferenceLibrary for &L {
    fn fetch(&self, object_id: u32, angle: u32) -> Result<RgbImage> {
        (**self).fetch(object_id, angle)
    }
}
