use std::ops;

use fast3d::util::Matrixf;
use n64_sys::{Pointer, RspQueue, SysError};

pub fn deg_to_rad(deg: f32) -> f32 {
    deg * std::f32::consts::PI / 180.0
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3(pub [f32; 3]);

impl Vec3 {
    pub const ZERO: Self = Self([0.0; 3]);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self([x, y, z])
    }

    pub fn len(&self) -> f32 {
        self.0.iter().map(|c| c * c).sum::<f32>().sqrt()
    }

    /// Normalizes in place. The zero vector is left unchanged.
    pub fn norm(&mut self) {
        let len = self.len();
        if len > 0.0 {
            for c in &mut self.0 {
                *c /= len;
            }
        }
    }
}

impl ops::Index<usize> for Vec3 {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

/// A matrix in the N64 s15.16 fixed point format, stored in RDRAM.
///
/// Commands reference the matrix by address, so writing a new value is visible to every
/// command list that uses it, including recorded blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedMatrix {
    addr: u32,
}

impl FixedMatrix {
    pub const SIZE: usize = 64;

    pub fn alloc(rspq: &mut RspQueue) -> Result<Self, SysError> {
        let addr = rspq.rdram_mut().alloc_uncached(Self::SIZE)?;
        Ok(Self { addr })
    }

    pub fn write(&self, rspq: &mut RspQueue, m: &Matrixf) -> Result<(), SysError> {
        let words: Vec<u32> = m.to_fixed().into_iter().map(|w| w as u32).collect();
        rspq.rdram_mut().write_u32s(self.addr, &words)?;
        Ok(())
    }

    pub fn read(&self, rspq: &RspQueue) -> Result<Matrixf, SysError> {
        let mut words = [0u32; 16];
        rspq.rdram().read_u32s(self.addr, &mut words)?;
        let fixed: Vec<i32> = words.iter().map(|&w| w as i32).collect();
        Ok(Matrixf::from_fixed(&fixed))
    }

    pub fn addr(&self) -> u32 {
        self.addr
    }

    pub fn pointer(&self) -> Pointer {
        Pointer::Rdram(self.addr)
    }
}
