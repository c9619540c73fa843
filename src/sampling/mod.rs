//! Random draws for object selection and placement.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SceneConfig;

/// Source of uniform random draws.
///
/// Every draw is independent; implementations decide how values are produced,
/// which lets tests pin poses to fixed values.
pub trait RandomSource {
    /// Index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;

    /// Integer in `low..high`. The range is never empty.
    fn int_in(&mut self, low: u32, high: u32) -> u32;

    /// Float in `low..high`, or `low` when `low >= high`.
    fn float_in(&mut self, low: f64, high: f64) -> f64;
}

/// Adapter over any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    /// Reproducible source.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Source seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Seeded when `seed` is given, entropy otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }

    fn int_in(&mut self, low: u32, high: u32) -> u32 {
        self.rng.random_range(low..high)
    }

    fn float_in(&mut self, low: f64, high: f64) -> f64 {
        if low < high {
            self.rng.random_range(low..high)
        } else {
            low
        }
    }
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn pick(&mut self, len: usize) -> usize {
        (**self).pick(len)
    }

    fn int_in(&mut self, low: u32, high: u32) -> u32 {
        (**self).int_in(low, high)
    }

    fn float_in(&mut self, low: f64, high: f64) -> f64 {
        (**self).float_in(low, high)
    }
}

/// One object's identity and pose within a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectPose {
    pub object_id: u32,
    /// Reference orientation in degrees.
    pub angle: u32,
    /// Placement centre in un-padded canvas coordinates.
    pub x: u32,
    pub y: u32,
    pub scale: f64,
    /// In-plane rotation in radians.
    pub rotation: f64,
}

impl ObjectPose {
    /// Draw a pose from a validated configuration.
    pub fn sample<S: RandomSource + ?Sized>(config: &SceneConfig, source: &mut S) -> Self {
        let object_id = config.object_ids[source.pick(config.object_ids.len())];
        let angle = config.orientation_angles[source.pick(config.orientation_angles.len())];

        let placement = config.placement_range();
        let x = source.int_in(placement.start, placement.end);
        let y = source.int_in(placement.start, placement.end);

        let scale = source.float_in(config.scale_range.min, config.scale_range.max);
        let rotation = source.float_in(0.0, TAU);

        Self {
            object_id,
            angle,
            x,
            y,
            scale,
            rotation,
        }
    }
}
