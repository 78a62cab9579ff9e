//! A viewer that spins a model loaded from a filesystem image, driven by a controller.
//!
//! The keyboard stands in for controller port 1 (see [input]). Enter pauses; while
//! paused, I, J and L rotate the model about X, Y and Z, and E and Q scale it.

#![warn(rust_2018_idioms, missing_debug_implementations)]

use std::fs;

use n64_sys::dfs::RomImage;
use tracing::{info, warn};

pub use app::*;
pub use config::*;
pub use error::*;

pub mod animation;
mod app;
pub mod clock;
mod config;
mod error;
pub mod input;
mod logging;
pub mod present;
pub mod sample_rom;
mod window;

/// Initializes logging, opens a window and runs the viewer until the window is closed.
pub fn run(config: &Config) {
    logging::init(&config.log_file_path());

    logging::print_to_log_file(&"-".repeat(80));
    if !config.title().is_empty() {
        info!("{}", config.title());
    }
    info!(
        "Platform: {} {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );

    let rom = window::handle_err(load_rom(config));
    window::handle_err(window::open_window_and_run(config, rom));
}

/// Reads the configured filesystem image, falling back to the built-in sample.
pub fn load_rom(config: &Config) -> Result<RomImage, ViewerError> {
    match config.rom_path() {
        Some(path) if path.is_file() => {
            let bytes = fs::read(&path).map_err(|error| ViewerError::RomRead {
                path: path.clone(),
                error,
            })?;
            info!("Loaded {}", path.display());
            Ok(RomImage::parse(bytes)?)
        }
        Some(path) => {
            warn!("{} not found, using the sample ROM", path.display());
            sample_rom::sample_rom()
        }
        None => sample_rom::sample_rom(),
    }
}

#[cfg(test)]
mod test {
    use std::env;

    use super::*;

    #[test]
    fn test_load_rom_falls_back_to_sample() {
        let config = Config::new()
            .with_root_dir(env::temp_dir())
            .with_rom_path("model_viewer_missing.dfs");
        let rom = load_rom(&config).unwrap();
        assert!(rom.entry(sample_rom::MODEL_FILE).is_some());

        let rom = load_rom(&Config::new()).unwrap();
        assert!(rom.entry(sample_rom::MODEL_FILE).is_some());
    }

    #[test]
    fn test_load_rom_from_file() {
        let dir = env::temp_dir();
        let bytes = n64_sys::dfs::RomBuilder::new()
            .add_file("other.bin", vec![1, 2, 3], 0)
            .build()
            .unwrap();
        fs::write(dir.join("model_viewer_test.dfs"), bytes).unwrap();

        let config = Config::new()
            .with_root_dir(&dir)
            .with_rom_path("model_viewer_test.dfs");
        let rom = load_rom(&config).unwrap();
        assert_eq!(rom.file_names().collect::<Vec<_>>(), vec!["other.bin"]);
    }

    #[test]
    fn test_load_rom_rejects_garbage() {
        let dir = env::temp_dir();
        fs::write(dir.join("model_viewer_garbage.dfs"), b"not a rom").unwrap();

        let config = Config::new()
            .with_root_dir(&dir)
            .with_rom_path("model_viewer_garbage.dfs");
        assert!(matches!(
            load_rom(&config),
            Err(ViewerError::Sys(n64_sys::SysError::Asset(_)))
        ));
    }
}
