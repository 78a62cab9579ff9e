#![allow(missing_docs)]

use std::{error::Error, fmt};

use fast3d::F3DError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    OutOfMemory { requested: usize, available: usize },
    OutOfBounds { addr: u32, len: usize },
    MisalignedAccess { addr: u32, align: usize },
    InvalidBlock(u32),
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::OutOfMemory {
                requested,
                available,
            } => write!(
                f,
                "out of RDRAM: requested {} bytes, {} available",
                requested, available
            ),
            MemoryError::OutOfBounds { addr, len } => {
                write!(f, "access out of bounds: {:#010X} (+{})", addr, len)
            }
            MemoryError::MisalignedAccess { addr, align } => {
                write!(f, "misaligned access: {:#010X} (align {})", addr, align)
            }
            MemoryError::InvalidBlock(id) => write!(f, "invalid or freed block: {}", id),
        }
    }
}

impl Error for MemoryError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DfsError {
    BadMagic,
    UnsupportedVersion(u16),
    Truncated,
    FileNotFound(String),
    NotMounted(String),
    AlreadyMounted(String),
}

impl fmt::Display for DfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DfsError::BadMagic => write!(f, "not a filesystem image"),
            DfsError::UnsupportedVersion(version) => {
                write!(f, "unsupported filesystem image version: {}", version)
            }
            DfsError::Truncated => write!(f, "filesystem image is truncated"),
            DfsError::FileNotFound(path) => write!(f, "file not found: {}", path),
            DfsError::NotMounted(path) => write!(f, "no filesystem mounted for: {}", path),
            DfsError::AlreadyMounted(mount_point) => {
                write!(f, "mount point already in use: {}", mount_point)
            }
        }
    }
}

impl Error for DfsError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    Dfs(DfsError),
    CompressionLevelNotInitialized(u8),
    UnsupportedLevel(u8),
    Corrupt { path: String, reason: String },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::Dfs(error) => write!(f, "{}", error),
            AssetError::CompressionLevelNotInitialized(level) => {
                write!(f, "compression level {} was not initialized", level)
            }
            AssetError::UnsupportedLevel(level) => {
                write!(f, "unsupported compression level: {}", level)
            }
            AssetError::Corrupt { path, reason } => {
                write!(f, "corrupt asset {}: {}", path, reason)
            }
        }
    }
}

impl Error for AssetError {}

impl From<DfsError> for AssetError {
    fn from(v: DfsError) -> Self {
        Self::Dfs(v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    NotInitialized,
    InvalidBufferCount(u32),
    NoFreeBuffer,
    UnknownSurface(u32),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::NotInitialized => write!(f, "display is closed"),
            DisplayError::InvalidBufferCount(count) => {
                write!(f, "invalid number of display buffers: {}", count)
            }
            DisplayError::NoFreeBuffer => write!(f, "every display buffer is being drawn"),
            DisplayError::UnknownSurface(addr) => {
                write!(f, "surface {:#010X} is not a display buffer", addr)
            }
        }
    }
}

impl Error for DisplayError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysError {
    Memory(MemoryError),
    F3D(F3DError),
    Asset(AssetError),
    Display(DisplayError),
}

impl fmt::Display for SysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SysError::Memory(error) => write!(f, "{}", error),
            SysError::F3D(error) => write!(f, "{}", error),
            SysError::Asset(error) => write!(f, "{}", error),
            SysError::Display(error) => write!(f, "{}", error),
        }
    }
}

impl Error for SysError {}

impl From<MemoryError> for SysError {
    fn from(v: MemoryError) -> Self {
        Self::Memory(v)
    }
}

impl From<F3DError> for SysError {
    fn from(v: F3DError) -> Self {
        Self::F3D(v)
    }
}

impl From<AssetError> for SysError {
    fn from(v: AssetError) -> Self {
        Self::Asset(v)
    }
}

impl From<DfsError> for SysError {
    fn from(v: DfsError) -> Self {
        Self::Asset(v.into())
    }
}

impl From<DisplayError> for SysError {
    fn from(v: DisplayError) -> Self {
        Self::Display(v)
    }
}
