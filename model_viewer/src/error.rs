#![allow(missing_docs)]

use std::{error::Error, fmt, io, path::PathBuf};

use n64_sys::{AssetError, DfsError, MemoryError, SysError};
use t3d::ModelError;

#[derive(Debug)]
pub enum ViewerError {
    Sys(SysError),
    Model(ModelError),
    RomRead { path: PathBuf, error: io::Error },
    Window(String),
    Gpu(String),
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerError::Sys(error) => write!(f, "{}", error),
            ViewerError::Model(error) => write!(f, "{}", error),
            ViewerError::RomRead { path, error } => {
                write!(f, "failed to read {}: {}", path.display(), error)
            }
            ViewerError::Window(message) => write!(f, "window error: {}", message),
            ViewerError::Gpu(message) => write!(f, "GPU error: {}", message),
        }
    }
}

impl Error for ViewerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ViewerError::Sys(error) => Some(error),
            ViewerError::Model(error) => Some(error),
            ViewerError::RomRead { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<SysError> for ViewerError {
    fn from(v: SysError) -> Self {
        Self::Sys(v)
    }
}

impl From<ModelError> for ViewerError {
    fn from(v: ModelError) -> Self {
        Self::Model(v)
    }
}

impl From<AssetError> for ViewerError {
    fn from(v: AssetError) -> Self {
        Self::Sys(v.into())
    }
}

impl From<DfsError> for ViewerError {
    fn from(v: DfsError) -> Self {
        Self::Sys(v.into())
    }
}

impl From<MemoryError> for ViewerError {
    fn from(v: MemoryError) -> Self {
        Self::Sys(v.into())
    }
}

impl From<n64_sys::DisplayError> for ViewerError {
    fn from(v: n64_sys::DisplayError) -> Self {
        Self::Sys(v.into())
    }
}
