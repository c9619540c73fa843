//! Scene compositor.
//!
//! Builds each sample on a padded canvas: every object is warped into a
//! square tile by its pose transform and pasted through a brightness mask,
//! then the padding is cut away and the result is blurred and resized.

use glam::DVec2;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{warp_into, Interpolation};

use crate::config::{SceneConfig, BLUR_SIGMA};
use crate::error::Result;
use crate::library::ReferenceLibrary;
use crate::output::SampleSink;
use crate::sampling::{ObjectPose, RandomSource};
use crate::transform::{AffineOp, AffinePipeline};

/// Gray pixel with all channels at `intensity`.
pub fn background_pixel(intensity: u8) -> Rgb<u8> {
    Rgb([intensity, intensity, intensity])
}

/// A pixel is foreground when any channel is brighter than the threshold.
pub fn is_foreground(pixel: &Rgb<u8>, threshold: u8) -> bool {
    pixel.0.iter().any(|&c| c > threshold)
}

/// Padded working image for one sample.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbImage,
    resolution: u32,
    pad: u32,
    threshold: u8,
}

impl Canvas {
    /// Uniform canvas of side `resolution + 2 * pad`.
    pub fn new(resolution: u32, pad: u32, background_intensity: u8) -> Self {
        let side = resolution + 2 * pad;
        Self {
            image: RgbImage::from_pixel(side, side, background_pixel(background_intensity)),
            resolution,
            pad,
            threshold: background_intensity,
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn pad(&self) -> u32 {
        self.pad
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Top-left corner, in padded coordinates, of a `tile_size` tile centred
    /// on the un-padded point `(x, y)`. Negative when the tile is wider than
    /// twice the padding.
    pub fn tile_origin(&self, x: u32, y: u32, tile_size: u32) -> (i64, i64) {
        let offset = self.pad as i64 - (tile_size / 2) as i64;
        (x as i64 + offset, y as i64 + offset)
    }

    /// Paste the foreground pixels of `tile` centred on `(x, y)`.
    /// Background pixels of the tile leave the canvas untouched; tile pixels
    /// falling outside the canvas are dropped.
    pub fn composite(&mut self, tile: &RgbImage, x: u32, y: u32) {
        let (left, top) = self.tile_origin(x, y, tile.width());
        let (width, height) = self.image.dimensions();

        for (tx, ty, pixel) in tile.enumerate_pixels() {
            let cx = left + tx as i64;
            let cy = top + ty as i64;
            if cx < 0 || cy < 0 || cx >= width as i64 || cy >= height as i64 {
                continue;
            }
            if is_foreground(pixel, self.threshold) {
                self.image.put_pixel(cx as u32, cy as u32, *pixel);
            }
        }
    }

    /// Drop the padding, leaving a `resolution` x `resolution` image.
    pub fn into_cropped(self) -> RgbImage {
        imageops::crop_imm(
            &self.image,
            self.pad,
            self.pad,
            self.resolution,
            self.resolution,
        )
        .to_image()
    }
}

/// Copy of `source` surrounded by a one pixel `background` frame.
///
/// Bilinear sampling needs both neighbours inside the image, so without the
/// frame the last row and column of the source would never be sampled.
pub fn with_border(source: &RgbImage, background: Rgb<u8>) -> RgbImage {
    let mut framed = RgbImage::from_pixel(source.width() + 2, source.height() + 2, background);
    imageops::replace(&mut framed, source, 1, 1);
    framed
}

/// Warp `source` through `pose` into a `tile_size` square, filling uncovered
/// area with `background`.
pub fn warp_object(
    source: &RgbImage,
    pose: &AffinePipeline,
    tile_size: u32,
    background: Rgb<u8>,
) -> Result<RgbImage> {
    let framed = with_border(source, background);
    let projection = pose
        .clone()
        .prepend(AffineOp::Translate(DVec2::splat(-1.0)))
        .to_projection()?;

    let mut tile = RgbImage::from_pixel(tile_size, tile_size, background);
    warp_into(&framed, &projection, Interpolation::Bilinear, background, &mut tile);
    Ok(tile)
}

/// Blur the cropped canvas and resize it to `final_size`.
pub fn finish_sample(cropped: &RgbImage, final_size: u32) -> RgbImage {
    let blurred = gaussian_blur_f32(cropped, BLUR_SIGMA);
    imageops::resize(&blurred, final_size, final_size, FilterType::Triangle)
}

/// Generates composite scenes from a reference library.
#[derive(Debug, Clone)]
pub struct SceneCompositor<L> {
    config: SceneConfig,
    library: L,
    pad: u32,
}

impl<L: ReferenceLibrary> SceneCompositor<L> {
    /// Validate `config` and bind it to `library`.
    pub fn new(config: SceneConfig, library: L) -> Result<Self> {
        config.validate()?;
        let pad = config.pad();
        Ok(Self {
            config,
            library,
            pad,
        })
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn pad(&self) -> u32 {
        self.pad
    }

    pub fn new_canvas(&self) -> Canvas {
        Canvas::new(
            self.config.output_resolution,
            self.pad,
            self.config.background_intensity,
        )
    }

    /// Fetch, warp and composite one object.
    pub fn place_object(&self, canvas: &mut Canvas, pose: &ObjectPose) -> Result<()> {
        let source = self.library.fetch(pose.object_id, pose.angle)?;

        log::debug!(
            "Placing object {} ({} deg) at ({}, {}), scale {:.3}, rotation {:.3} rad",
            pose.object_id,
            pose.angle,
            pose.x,
            pose.y,
            pose.scale,
            pose.rotation
        );

        let transform = AffinePipeline::object_pose(
            self.config.source_object_size,
            pose.rotation,
            pose.scale,
            self.pad,
        );
        let tile = warp_object(
            &source,
            &transform,
            self.pad,
            background_pixel(self.config.background_intensity),
        )?;

        canvas.composite(&tile, pose.x, pose.y);
        Ok(())
    }

    /// Crop, blur and resize a finished canvas.
    pub fn finish(&self, canvas: Canvas) -> RgbImage {
        finish_sample(&canvas.into_cropped(), self.config.final_size)
    }

    /// Render one sample with freshly drawn poses.
    pub fn render_sample<S: RandomSource + ?Sized>(&self, source: &mut S) -> Result<RgbImage> {
        let mut canvas = self.new_canvas();
        for _ in 0..self.config.objects_per_sample {
            let pose = ObjectPose::sample(&self.config, source);
            self.place_object(&mut canvas, &pose)?;
        }
        Ok(self.finish(canvas))
    }

    /// Render and persist `sample_count` samples, stopping at the first error.
    /// Returns the number of samples written.
    pub fn generate<S, K>(&self, source: &mut S, sink: &mut K) -> Result<usize>
    where
        S: RandomSource + ?Sized,
        K: SampleSink + ?Sized,
    {
        let count = self.config.sample_count;
        log::info!(
            "Generating {} samples, {} objects each, canvas {} + 2x{} padding",
            count,
            self.config.objects_per_sample,
            self.config.output_resolution,
            self.pad
        );

        for index in 0..count {
            log::info!("Sample {}/{}", index, count);
            let sample = self.render_sample(source)?;
            sink.persist(index, &sample)?;
        }

        Ok(count)
    }
}

/// Validate `config`, then render and persist every sample.
pub fn generate<L, S, K>(config: &SceneConfig, library: L, source: &mut S, sink: &mut K) -> Result<usize>
where
    L: ReferenceLibrary,
    S: RandomSource + ?Sized,
    K: SampleSink + ?Sized,
{
    SceneCompositor::new(config.clone(), library)?.generate(source, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputConfig, ScaleRange};
    use crate::error::SceneError;
    use crate::library::{DirectoryLibrary, MemoryLibrary};
    use crate::output::DirectorySink;
    use crate::sampling::RngSource;

    const BG: u8 = 30;

    /// Draws the first element, the lowest placement and range midpoints.
    struct FixedSource;

    impl RandomSource for FixedSource {
        fn pick(&mut self, _len: usize) -> usize {
            0
        }

        fn int_in(&mut self, low: u32, _high: u32) -> u32 {
            low
        }

        fn float_in(&mut self, low: f64, high: f64) -> f64 {
            low + 0.5 * (high - low).max(0.0)
        }
    }

    /// 4x4 sources on a 24 px canvas; pad is ceil(sqrt(32)) = 6.
    fn small_config() -> SceneConfig {
        SceneConfig {
            object_ids: vec![5],
            orientation_angles: vec![0],
            sample_count: 2,
            objects_per_sample: 1,
            output_resolution: 24,
            final_size: 16,
            min_border_margin: 4,
            scale_range: ScaleRange::new(1.0, 1.0),
            background_intensity: BG,
            source_object_size: 4,
            seed: None,
            output: OutputConfig::default(),
        }
    }

    fn gradient_source(blue: u8) -> RgbImage {
        RgbImage::from_fn(4, 4, |x, y| Rgb([100 + 20 * x as u8, 60 + 20 * y as u8, blue]))
    }

    fn identity_pose(object_id: u32, x: u32, y: u32) -> ObjectPose {
        ObjectPose {
            object_id,
            angle: 0,
            x,
            y,
            scale: 1.0,
            rotation: 0.0,
        }
    }

    #[test]
    fn test_mask_threshold_is_strict() {
        assert!(!is_foreground(&Rgb([BG, BG, BG]), BG));
        assert!(!is_foreground(&Rgb([0, 0, 0]), BG));
        assert!(is_foreground(&Rgb([BG + 1, 0, 0]), BG));
        assert!(is_foreground(&Rgb([0, 0, 255]), BG));
    }

    #[test]
    fn test_canvas_is_padded_uniform_background() {
        let canvas = Canvas::new(24, 6, BG);
        assert_eq!(canvas.resolution(), 24);
        assert_eq!(canvas.pad(), 6);
        assert_eq!(canvas.image().dimensions(), (36, 36));
        assert!(canvas.image().pixels().all(|p| *p == background_pixel(BG)));

        let cropped = canvas.into_cropped();
        assert_eq!(cropped.dimensions(), (24, 24));
    }

    #[test]
    fn test_identity_pose_reproduces_source() {
        let compositor = SceneCompositor::new(
            small_config(),
            MemoryLibrary::new().with(5, 0, gradient_source(200)),
        )
        .unwrap();
        assert_eq!(compositor.pad(), 6);

        let mut canvas = compositor.new_canvas();
        compositor
            .place_object(&mut canvas, &identity_pose(5, 10, 10))
            .unwrap();

        // Source centre (2, 2) lands on the padded placement point (16, 16).
        let source = gradient_source(200);
        for v in 0..4 {
            for u in 0..4 {
                assert_eq!(
                    canvas.image().get_pixel(14 + u, 14 + v),
                    source.get_pixel(u, v),
                    "mismatch at source ({}, {})",
                    u,
                    v
                );
            }
        }
    }

    #[test]
    fn test_composite_only_touches_tile_footprint() {
        let compositor = SceneCompositor::new(
            small_config(),
            MemoryLibrary::new().with(5, 0, gradient_source(200)),
        )
        .unwrap();

        let mut canvas = compositor.new_canvas();
        compositor
            .place_object(&mut canvas, &identity_pose(5, 10, 10))
            .unwrap();

        let (left, top) = canvas.tile_origin(10, 10, compositor.pad());
        let tile = left..left + compositor.pad() as i64;
        let rows = top..top + compositor.pad() as i64;
        for (x, y, pixel) in canvas.image().enumerate_pixels() {
            if !(tile.contains(&(x as i64)) && rows.contains(&(y as i64))) {
                assert_eq!(*pixel, background_pixel(BG), "stray pixel at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_uniform_source_keeps_every_pixel() {
        let source = RgbImage::from_pixel(4, 4, Rgb([200, 200, 200]));
        let compositor =
            SceneCompositor::new(small_config(), MemoryLibrary::new().with(5, 0, source)).unwrap();

        let mut canvas = compositor.new_canvas();
        compositor
            .place_object(&mut canvas, &identity_pose(5, 10, 10))
            .unwrap();

        let foreground = canvas
            .image()
            .pixels()
            .filter(|p| is_foreground(p, BG))
            .count();
        assert_eq!(foreground, 16);
    }

    #[test]
    fn test_border_frame_surrounds_source() {
        let framed = with_border(&gradient_source(200), background_pixel(BG));
        assert_eq!(framed.dimensions(), (6, 6));
        assert_eq!(*framed.get_pixel(0, 0), background_pixel(BG));
        assert_eq!(*framed.get_pixel(5, 5), background_pixel(BG));
        assert_eq!(*framed.get_pixel(1, 1), *gradient_source(200).get_pixel(0, 0));
        assert_eq!(*framed.get_pixel(4, 4), *gradient_source(200).get_pixel(3, 3));
    }

    #[test]
    fn test_oversized_tile_is_clipped_to_canvas() {
        let mut canvas = Canvas::new(4, 1, BG);
        let tile = RgbImage::from_pixel(12, 12, Rgb([90, 90, 90]));

        assert_eq!(canvas.tile_origin(0, 0, 12), (-5, -5));
        canvas.composite(&tile, 0, 0);

        // Origin (-5, -5): canvas pixels up to index 6 are covered.
        assert!(canvas
            .image()
            .pixels()
            .all(|p| *p == Rgb([90, 90, 90])));
    }

    #[test]
    fn test_later_objects_occlude_earlier_ones() {
        let mut front = gradient_source(220);
        // A background-valued hole shows what is underneath.
        front.put_pixel(1, 1, background_pixel(BG));

        let library = MemoryLibrary::new()
            .with(1, 0, RgbImage::from_pixel(4, 4, Rgb([250, 40, 40])))
            .with(2, 0, front.clone());
        let config = SceneConfig {
            object_ids: vec![1, 2],
            ..small_config()
        };
        let compositor = SceneCompositor::new(config, library).unwrap();

        let mut canvas = compositor.new_canvas();
        compositor
            .place_object(&mut canvas, &identity_pose(1, 10, 10))
            .unwrap();
        compositor
            .place_object(&mut canvas, &identity_pose(2, 10, 10))
            .unwrap();

        assert_eq!(*canvas.image().get_pixel(14, 14), *front.get_pixel(0, 0));
        assert_eq!(*canvas.image().get_pixel(16, 14), *front.get_pixel(2, 0));
        assert_eq!(*canvas.image().get_pixel(15, 15), Rgb([250, 40, 40]));
    }

    #[test]
    fn test_generate_writes_every_sample_at_final_size() {
        let library = MemoryLibrary::new()
            .with(1, 0, gradient_source(90))
            .with(1, 5, gradient_source(120))
            .with(2, 0, gradient_source(150))
            .with(2, 5, gradient_source(180));
        let config = SceneConfig {
            object_ids: vec![1, 2],
            orientation_angles: vec![0, 5],
            sample_count: 5,
            objects_per_sample: 3,
            scale_range: ScaleRange::new(0.5, 1.5),
            ..small_config()
        };

        let mut sink: Vec<RgbImage> = Vec::new();
        let written = generate(&config, &library, &mut RngSource::seeded(11), &mut sink).unwrap();

        assert_eq!(written, 5);
        assert_eq!(sink.len(), 5);
        assert!(sink.iter().all(|s| s.dimensions() == (16, 16)));
    }

    #[test]
    fn test_fixed_draws_give_identical_samples() {
        let compositor = SceneCompositor::new(
            small_config(),
            MemoryLibrary::new().with(5, 0, gradient_source(200)),
        )
        .unwrap();

        let mut sink: Vec<RgbImage> = Vec::new();
        compositor.generate(&mut FixedSource, &mut sink).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0], sink[1]);
        assert!(sink[0].pixels().any(|p| is_foreground(p, BG)));
    }

    #[test]
    fn test_same_seed_reproduces_run() {
        let library = MemoryLibrary::new().with(5, 0, gradient_source(200));
        let config = SceneConfig {
            scale_range: ScaleRange::new(0.5, 1.5),
            sample_count: 3,
            ..small_config()
        };

        let mut first: Vec<RgbImage> = Vec::new();
        let mut second: Vec<RgbImage> = Vec::new();
        generate(&config, &library, &mut RngSource::seeded(4), &mut first).unwrap();
        generate(&config, &library, &mut RngSource::seeded(4), &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_objects_yields_processed_background() {
        let config = SceneConfig {
            objects_per_sample: 0,
            sample_count: 3,
            ..small_config()
        };
        let compositor = SceneCompositor::new(config, MemoryLibrary::new()).unwrap();
        let expected = compositor.finish(compositor.new_canvas());

        let mut sink: Vec<RgbImage> = Vec::new();
        compositor
            .generate(&mut RngSource::seeded(0), &mut sink)
            .unwrap();

        assert_eq!(sink.len(), 3);
        for sample in &sink {
            assert_eq!(*sample, expected);
            assert!(sample.pixels().all(|p| p.0.iter().all(|&c| c.abs_diff(BG) <= 1)));
        }
    }

    #[test]
    fn test_missing_reference_aborts_run() {
        let config = SceneConfig {
            object_ids: vec![9],
            ..small_config()
        };
        let mut sink: Vec<RgbImage> = Vec::new();
        let result = generate(&config, MemoryLibrary::new(), &mut FixedSource, &mut sink);

        assert!(matches!(
            result,
            Err(SceneError::MissingReferenceImage { object_id: 9, angle: 0 })
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_invalid_configuration_fails_before_sampling() {
        let config = SceneConfig {
            min_border_margin: 12,
            ..small_config()
        };
        let mut sink: Vec<RgbImage> = Vec::new();
        let result = generate(&config, MemoryLibrary::new(), &mut FixedSource, &mut sink);

        assert!(matches!(result, Err(SceneError::InvalidConfiguration(_))));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_directory_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let library_dir = root.path().join("coil-100");
        std::fs::create_dir_all(&library_dir).unwrap();
        gradient_source(200)
            .save(library_dir.join(DirectoryLibrary::file_name(5, 0)))
            .unwrap();

        let config = SceneConfig {
            output: OutputConfig {
                library_dir: library_dir.clone(),
                output_dir: root.path().join("test-data"),
                ..Default::default()
            },
            ..small_config()
        };

        let mut sink = DirectorySink::prepare(&config.output).unwrap();
        let library = DirectoryLibrary::new(&config.output.library_dir).with_expected_size(4);
        let written = generate(&config, library, &mut RngSource::seeded(8), &mut sink).unwrap();
        assert_eq!(written, 2);

        for index in 0..2 {
            let path = config.output.image_dir().join(format!("sample_{:06}.png", index));
            let image = image::open(&path).unwrap().to_rgb8();
            assert_eq!(image.dimensions(), (16, 16));
        }
    }
}
