//! Decoding, encoding, and interpreting of Nintendo 64 Fast3D commands.
//!
//! Note: this crate covers the subset of Fast3D that untextured, lit geometry
//! needs. Commands outside that subset decode to [cmd::F3DCommand::Unknown]
//! and are ignored by [interpret].

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
#![allow(clippy::needless_range_loop)]

pub use error::*;

pub mod cmd;
pub mod decode;
pub mod encode;
mod error;
mod f3d_render_data;
pub mod interpret;
pub mod util;
