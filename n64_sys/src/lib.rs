//! A hosted stand-in for the Nintendo 64 system libraries.
//!
//! Programs allocate from [Rdram], build frames through the [RspQueue], and present them
//! with a triple-buffered [Display]. RDP work is done in software when a frame is
//! detached (see [raster]).

#![warn(rust_2018_idioms)]

pub use asset::AssetStore;
pub use display::{Display, Surface};
pub use error::*;
pub use joypad::{Joypad, JoypadButtons, JoypadInputs, JoypadPort};
pub use rdram::Rdram;
pub use rspq::{Block, Pointer, RspQueue, RspqStats};

pub mod asset;
pub mod dfs;
pub mod display;
mod error;
pub mod joypad;
pub mod raster;
mod rdpq;
pub mod rdram;
pub mod rspq;
