//! Synthetic Scene Compositor
//!
//! Entry point: `scene-compositor [config.json]`. Without an argument the
//! built-in COIL-100 parameters are used.

use std::path::PathBuf;

use scene_compositor::{DirectoryLibrary, DirectorySink, RngSource, SceneCompositor, SceneConfig};

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run() {
        log::error!("Scene generation failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> scene_compositor::Result<()> {
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            SceneConfig::load(&path)?
        }
        None => SceneConfig::default(),
    };

    let library = DirectoryLibrary::new(&config.output.library_dir)
        .with_expected_size(config.source_object_size);
    log::info!(
        "Reading objects from {}, writing to {}",
        library.root().display(),
        config.output.image_dir().display()
    );

    let compositor = SceneCompositor::new(config, library)?;
    let config = compositor.config();

    let mut sink = DirectorySink::prepare(&config.output)?;
    let mut source = RngSource::from_seed_option(config.seed);

    let written = compositor.generate(&mut source, &mut sink)?;
    log::info!("Generated {} samples", written);

    Ok(())
}
