//! Affine pose transforms in homogeneous 2D coordinates.
//!
//! A pose is built as an ordered list of elementary operators and collapsed
//! into a single 3x3 matrix, so the operation order can be checked without
//! rendering anything.

use glam::{DMat3, DVec2};
use imageproc::geometric_transformations::Projection;

use crate::error::{Result, SceneError};

/// Elementary affine operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AffineOp {
    /// Shift by the given offset.
    Translate(DVec2),
    /// Counter-clockwise rotation in radians (clockwise on screen, y down).
    Rotate(f64),
    /// Uniform scaling about the origin.
    Scale(f64),
}

impl AffineOp {
    pub fn matrix(&self) -> DMat3 {
        match *self {
            AffineOp::Translate(offset) => DMat3::from_translation(offset),
            AffineOp::Rotate(angle) => DMat3::from_angle(angle),
            AffineOp::Scale(factor) => DMat3::from_scale(DVec2::splat(factor)),
        }
    }
}

/// Operators in application order: the first entry touches a point first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AffinePipeline {
    ops: Vec<AffineOp>,
}

impl AffinePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operator applied after everything already in the pipeline.
    pub fn then(mut self, op: AffineOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Insert an operator applied before everything already in the pipeline.
    pub fn prepend(mut self, op: AffineOp) -> Self {
        self.ops.insert(0, op);
        self
    }

    pub fn ops(&self) -> &[AffineOp] {
        &self.ops
    }

    /// Collapse into one matrix: for ops `[a, b, c]` this is `C · B · A`.
    pub fn matrix(&self) -> DMat3 {
        self.ops
            .iter()
            .fold(DMat3::IDENTITY, |acc, op| op.matrix() * acc)
    }

    /// Map a point through the whole pipeline.
    pub fn apply(&self, point: DVec2) -> DVec2 {
        self.matrix().transform_point2(point)
    }

    /// Pose of one object: centre the `source_size` image on the origin,
    /// scale, rotate, then centre it inside a `tile_size` square.
    /// Collapses to `T2 · R · S · T1`.
    pub fn object_pose(source_size: u32, rotation: f64, scale: f64, tile_size: u32) -> Self {
        let source_center = 0.5 * source_size as f64;
        let tile_center = 0.5 * tile_size as f64;

        Self::new()
            .then(AffineOp::Translate(DVec2::splat(-source_center)))
            .then(AffineOp::Scale(scale))
            .then(AffineOp::Rotate(rotation))
            .then(AffineOp::Translate(DVec2::splat(tile_center)))
    }

    /// Convert to an imageproc projection mapping source to output pixels.
    pub fn to_projection(&self) -> Result<Projection> {
        let rows = self.matrix().transpose().to_cols_array();
        let mut coefficients = [0f32; 9];
        for (dst, src) in coefficients.iter_mut().zip(rows.iter()) {
            *dst = *src as f32;
        }
        Projection::from_matrix(coefficients).ok_or(SceneError::DegenerateTransform)
    }
}
