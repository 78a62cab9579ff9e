#![allow(missing_docs)]

use std::{error::Error, fmt};

use n64_sys::{AssetError, SysError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    BadMagic,
    UnsupportedVersion(u16),
    Truncated,
    UnsupportedCommand([u32; 2]),
    VertexOutOfRange { offset: u32, count: u32 },
    Asset(AssetError),
    Sys(SysError),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::BadMagic => write!(f, "not a T3DM model"),
            ModelError::UnsupportedVersion(version) => {
                write!(f, "unsupported model version: {}", version)
            }
            ModelError::Truncated => write!(f, "model data is truncated"),
            ModelError::UnsupportedCommand([w0, w1]) => {
                write!(f, "unsupported command in model: {:#010X} {:#010X}", w0, w1)
            }
            ModelError::VertexOutOfRange { offset, count } => write!(
                f,
                "vertex load out of range: {} vertices at byte offset {}",
                count, offset
            ),
            ModelError::Asset(error) => write!(f, "{}", error),
            ModelError::Sys(error) => write!(f, "{}", error),
        }
    }
}

impl Error for ModelError {}

impl From<AssetError> for ModelError {
    fn from(v: AssetError) -> Self {
        Self::Asset(v)
    }
}

impl From<SysError> for ModelError {
    fn from(v: SysError) -> Self {
        Self::Sys(v)
    }
}

impl From<n64_sys::MemoryError> for ModelError {
    fn from(v: n64_sys::MemoryError) -> Self {
        Self::Sys(v.into())
    }
}
