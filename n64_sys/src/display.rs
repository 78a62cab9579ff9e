//! Framebuffers in RDRAM and the video interface that scans them out.
//!
//! Each buffer cycles through Free -> Drawing ([Display::get]) -> Ready
//! ([Display::show]) -> Scanout ([Display::vblank]) -> Free.

use std::collections::VecDeque;

use fast3d::{cmd::ComponentSize, util::rgba_16_to_32};
use tracing::{debug, info};

use crate::{DisplayError, Rdram, SysError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

pub const RESOLUTION_320X240: Resolution = Resolution {
    width: 320,
    height: 240,
};

pub const RESOLUTION_640X480: Resolution = Resolution {
    width: 640,
    height: 480,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitDepth {
    Bpp16,
    Bpp32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gamma {
    None,
    Correct,
}

/// Video interface output filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Disabled,
    Resample,
    ResampleAntialias,
}

impl Filter {
    /// Whether scan-out interpolates between pixels when scaled.
    pub fn is_resampled(self) -> bool {
        !matches!(self, Filter::Disabled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayConfig {
    pub resolution: Resolution,
    pub depth: BitDepth,
    pub num_buffers: u32,
    pub gamma: Gamma,
    pub filter: Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceFormat {
    Rgba16,
    Rgba32,
}

impl SurfaceFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            SurfaceFormat::Rgba16 => 2,
            SurfaceFormat::Rgba32 => 4,
        }
    }

    pub fn component_size(self) -> ComponentSize {
        match self {
            SurfaceFormat::Rgba16 => ComponentSize::Bits16,
            SurfaceFormat::Rgba32 => ComponentSize::Bits32,
        }
    }
}

/// An image in RDRAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Surface {
    pub addr: u32,
    pub width: u32,
    pub height: u32,
    pub format: SurfaceFormat,
}

impl Surface {
    pub fn alloc(
        rdram: &mut Rdram,
        width: u32,
        height: u32,
        format: SurfaceFormat,
    ) -> Result<Self, SysError> {
        let surface = Self {
            addr: 0,
            width,
            height,
            format,
        };
        let addr = rdram.alloc_uncached(surface.byte_size())?;
        Ok(Self { addr, ..surface })
    }

    pub fn stride(&self) -> u32 {
        self.width * self.format.bytes_per_pixel()
    }

    pub fn byte_size(&self) -> usize {
        (self.stride() * self.height) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferState {
    Free,
    Drawing,
    Ready,
    Scanout,
}

#[derive(Debug)]
pub struct Display {
    config: DisplayConfig,
    buffers: Vec<(Surface, BufferState)>,
    zbuf: Surface,
    ready: VecDeque<usize>,
    scanout: Option<usize>,
    frames_shown: u64,
    open: bool,
}

impl Display {
    /// Allocates the framebuffers and a matching 16 bit depth buffer.
    pub fn init(rdram: &mut Rdram, config: DisplayConfig) -> Result<Self, SysError> {
        if !(1..=32).contains(&config.num_buffers) {
            return Err(DisplayError::InvalidBufferCount(config.num_buffers).into());
        }

        let Resolution { width, height } = config.resolution;
        let format = match config.depth {
            BitDepth::Bpp16 => SurfaceFormat::Rgba16,
            BitDepth::Bpp32 => SurfaceFormat::Rgba32,
        };

        let mut buffers = Vec::new();
        for _ in 0..config.num_buffers {
            let surface = Surface::alloc(rdram, width, height, format)?;
            buffers.push((surface, BufferState::Free));
        }
        let zbuf = Surface::alloc(rdram, width, height, SurfaceFormat::Rgba16)?;

        info!(
            "display: {}x{} {:?}, {} buffers, {:?}",
            width, height, config.depth, config.num_buffers, config.filter
        );
        Ok(Self {
            config,
            buffers,
            zbuf,
            ready: VecDeque::new(),
            scanout: None,
            frames_shown: 0,
            open: true,
        })
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    fn find_free(&self) -> Option<usize> {
        self.buffers
            .iter()
            .position(|(_, state)| *state == BufferState::Free)
    }

    /// Returns a buffer to draw into.
    ///
    /// When every buffer is in flight, this waits for the next vertical blank.
    pub fn get(&mut self) -> Result<Surface, DisplayError> {
        if !self.open {
            return Err(DisplayError::NotInitialized);
        }

        let mut index = self.find_free();
        while index.is_none() && !self.ready.is_empty() {
            self.vblank();
            index = self.find_free();
        }
        // With a single buffer, draw over the one being scanned out.
        if index.is_none() {
            index = self.scanout.take();
        }

        let index = index.ok_or(DisplayError::NoFreeBuffer)?;
        self.buffers[index].1 = BufferState::Drawing;
        Ok(self.buffers[index].0)
    }

    pub fn get_zbuf(&self) -> Surface {
        self.zbuf
    }

    /// Queues a finished buffer for scan-out.
    pub fn show(&mut self, surface: Surface) -> Result<(), DisplayError> {
        let index = self
            .buffers
            .iter()
            .position(|(s, state)| s.addr == surface.addr && *state == BufferState::Drawing)
            .ok_or(DisplayError::UnknownSurface(surface.addr))?;

        self.buffers[index].1 = BufferState::Ready;
        self.ready.push_back(index);
        self.frames_shown += 1;
        Ok(())
    }

    /// Moves the oldest ready buffer to scan-out, freeing the previous one.
    pub fn vblank(&mut self) {
        if let Some(index) = self.ready.pop_front() {
            if let Some(old) = self.scanout.replace(index) {
                self.buffers[old].1 = BufferState::Free;
            }
            self.buffers[index].1 = BufferState::Scanout;
        }
    }

    /// The buffer being scanned out, as rgba8 pixels.
    pub fn scanout_rgba8(&self, rdram: &Rdram) -> Result<Option<Vec<u8>>, SysError> {
        let surface = match self.scanout {
            Some(index) => self.buffers[index].0,
            None => return Ok(None),
        };

        let bytes = rdram.slice(surface.addr, surface.byte_size())?;
        let mut pixels = Vec::with_capacity((surface.width * surface.height * 4) as usize);
        match surface.format {
            SurfaceFormat::Rgba16 => {
                for px in bytes.chunks_exact(2) {
                    let [r, g, b, _] = rgba_16_to_32(u16::from_be_bytes([px[0], px[1]]));
                    pixels.extend([r, g, b, 0xFF]);
                }
            }
            SurfaceFormat::Rgba32 => {
                for px in bytes.chunks_exact(4) {
                    pixels.extend([px[0], px[1], px[2], 0xFF]);
                }
            }
        }

        if self.config.gamma == Gamma::Correct {
            for (i, c) in pixels.iter_mut().enumerate() {
                if i % 4 != 3 {
                    *c = ((*c as f32 / 255.0).powf(1.0 / 2.2) * 255.0).round() as u8;
                }
            }
        }
        Ok(Some(pixels))
    }

    pub fn close(&mut self) {
        if self.open {
            debug!("display: closed after {} frames", self.frames_shown);
            self.open = false;
            self.ready.clear();
            self.scanout = None;
            for (_, state) in &mut self.buffers {
                *state = BufferState::Free;
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}
