#![allow(missing_docs)]

use core::fmt;
use std::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum F3DError {
    InvalidCommand([u32; 2]),
    InvalidVertexIndex(u32),
    MatrixStackUnderflow,
    MissingColorImage,
}

impl fmt::Display for F3DError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            F3DError::InvalidCommand([w0, w1]) => {
                write!(f, "invalid F3D command: {:#010X} {:#010X}", w0, w1)
            }
            F3DError::InvalidVertexIndex(index) => {
                write!(f, "invalid vertex index: {}", index)
            }
            F3DError::MatrixStackUnderflow => write!(f, "popMatrix without push"),
            F3DError::MissingColorImage => write!(f, "draw without SetColorImage"),
        }
    }
}

impl error::Error for F3DError {}
