use std::{
    env,
    path::{Path, PathBuf},
};

/// Configuration for the viewer window and environment.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    root_dir: PathBuf,
    relative_log_file_path: PathBuf,

    title: String,
    rom_path: Option<PathBuf>,
    window_scale: u32,
}

impl Default for Config {
    fn default() -> Self {
        let root_dir = if cfg!(debug_assertions) {
            env::current_dir().expect("failed to locate current working directory")
        } else {
            let mut path = env::current_exe().expect("failed to locate executable");
            path.pop();
            path
        };

        Self {
            root_dir,
            relative_log_file_path: "log.txt".into(),

            title: String::new(),
            rom_path: None,
            window_scale: 3,
        }
    }
}

impl Config {
    /// Returns the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the directory that log files should be saved.
    ///
    /// By default:
    /// - In debug mode, this is the current working directory.
    /// - In release mode, this is the directory containing the executable.
    pub fn root_dir(&self) -> &Path {
        self.root_dir.as_path()
    }

    /// Sets the directory that log files should be saved.
    pub fn with_root_dir(mut self, root_dir: impl AsRef<Path>) -> Self {
        self.root_dir = root_dir.as_ref().to_path_buf();
        self
    }

    /// Gets the log file path relative to the root directory.
    pub fn relative_log_file_path(&self) -> &Path {
        self.relative_log_file_path.as_path()
    }

    /// Sets the log file path relative to the root directory.
    pub fn with_relative_log_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.relative_log_file_path = path.as_ref().to_path_buf();
        self
    }

    /// Returns the absolute log file path.
    pub fn log_file_path(&self) -> PathBuf {
        self.root_dir.join(&self.relative_log_file_path)
    }

    /// Returns the window title.
    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Sets the window title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Returns the filesystem image to mount at `rom:/`, relative to the root directory.
    ///
    /// When unset, or when the file doesn't exist, the built-in sample image is used.
    pub fn rom_path(&self) -> Option<PathBuf> {
        self.rom_path.as_ref().map(|path| self.root_dir.join(path))
    }

    /// Sets the filesystem image to mount at `rom:/`.
    pub fn with_rom_path(mut self, path: impl AsRef<Path>) -> Self {
        self.rom_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Returns the initial window size as a multiple of the display resolution.
    pub fn window_scale(&self) -> u32 {
        self.window_scale
    }

    /// Sets the initial window size as a multiple of the display resolution.
    pub fn with_window_scale(mut self, scale: u32) -> Self {
        self.window_scale = scale.max(1);
        self
    }
}
