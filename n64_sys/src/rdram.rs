//! Emulated main memory.
//!
//! RDRAM is a fixed-size big endian byte arena. Allocations are never moved or freed, so
//! an address handed out by [Rdram::alloc] stays valid for the life of the program.

use tracing::debug;

use crate::MemoryError;

/// The default RDRAM size (8 MiB, with the expansion pak).
pub const RDRAM_SIZE: usize = 8 * 1024 * 1024;

/// The bottom of RDRAM is reserved, so no allocation returns a null address.
const HEAP_START: usize = 0x400;

#[derive(Clone)]
pub struct Rdram {
    bytes: Vec<u8>,
    heap_top: usize,
}

impl std::fmt::Debug for Rdram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rdram")
            .field("size", &self.bytes.len())
            .field("heap_top", &format_args!("{:#X}", self.heap_top))
            .finish()
    }
}

impl Default for Rdram {
    fn default() -> Self {
        Self::new(RDRAM_SIZE)
    }
}

impl Rdram {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
            heap_top: HEAP_START.min(size),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// The number of bytes allocated so far.
    pub fn used(&self) -> usize {
        self.heap_top
    }

    /// Allocates `size` bytes aligned to `align` (a power of two).
    pub fn alloc(&mut self, size: usize, align: usize) -> Result<u32, MemoryError> {
        debug_assert!(align.is_power_of_two());
        let start = (self.heap_top + align - 1) & !(align - 1);
        let end = start.checked_add(size).filter(|&end| end <= self.bytes.len());
        match end {
            Some(end) => {
                self.heap_top = end;
                debug!("alloc {} bytes at {:#010X}", size, start);
                Ok(start as u32)
            }
            None => Err(MemoryError::OutOfMemory {
                requested: size,
                available: self.bytes.len().saturating_sub(start),
            }),
        }
    }

    /// Allocates zeroed memory that is shared with the RSP and RDP.
    ///
    /// The host has no data cache to bypass, so this only guarantees the 16 byte
    /// alignment that DMA transfers need.
    pub fn alloc_uncached(&mut self, size: usize) -> Result<u32, MemoryError> {
        let addr = self.alloc(size, 16)?;
        self.bytes[addr as usize..addr as usize + size].fill(0);
        Ok(addr)
    }

    fn range(&self, addr: u32, len: usize, align: usize) -> Result<std::ops::Range<usize>, MemoryError> {
        let start = addr as usize;
        if start % align != 0 {
            return Err(MemoryError::MisalignedAccess { addr, align });
        }
        match start.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(MemoryError::OutOfBounds { addr, len }),
        }
    }

    pub fn read_u8s(&self, addr: u32, dst: &mut [u8]) -> Result<(), MemoryError> {
        let range = self.range(addr, dst.len(), 1)?;
        dst.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    pub fn read_u16s(&self, addr: u32, dst: &mut [u16]) -> Result<(), MemoryError> {
        let range = self.range(addr, dst.len() * 2, 2)?;
        for (d, s) in dst.iter_mut().zip(self.bytes[range].chunks_exact(2)) {
            *d = u16::from_be_bytes([s[0], s[1]]);
        }
        Ok(())
    }

    pub fn read_u32s(&self, addr: u32, dst: &mut [u32]) -> Result<(), MemoryError> {
        let range = self.range(addr, dst.len() * 4, 4)?;
        for (d, s) in dst.iter_mut().zip(self.bytes[range].chunks_exact(4)) {
            *d = u32::from_be_bytes([s[0], s[1], s[2], s[3]]);
        }
        Ok(())
    }

    pub fn read_u32(&self, addr: u32) -> Result<u32, MemoryError> {
        let mut w = [0];
        self.read_u32s(addr, &mut w)?;
        Ok(w[0])
    }

    pub fn write_u8s(&mut self, addr: u32, src: &[u8]) -> Result<(), MemoryError> {
        let range = self.range(addr, src.len(), 1)?;
        self.bytes[range].copy_from_slice(src);
        Ok(())
    }

    pub fn write_u16s(&mut self, addr: u32, src: &[u16]) -> Result<(), MemoryError> {
        let range = self.range(addr, src.len() * 2, 2)?;
        for (d, s) in self.bytes[range].chunks_exact_mut(2).zip(src) {
            d.copy_from_slice(&s.to_be_bytes());
        }
        Ok(())
    }

    pub fn write_u32s(&mut self, addr: u32, src: &[u32]) -> Result<(), MemoryError> {
        let range = self.range(addr, src.len() * 4, 4)?;
        for (d, s) in self.bytes[range].chunks_exact_mut(4).zip(src) {
            d.copy_from_slice(&s.to_be_bytes());
        }
        Ok(())
    }

    /// Mutable access to a byte range, for bulk pixel writes.
    pub fn slice_mut(&mut self, addr: u32, len: usize) -> Result<&mut [u8], MemoryError> {
        let range = self.range(addr, len, 1)?;
        Ok(&mut self.bytes[range])
    }

    pub fn slice(&self, addr: u32, len: usize) -> Result<&[u8], MemoryError> {
        let range = self.range(addr, len, 1)?;
        Ok(&self.bytes[range])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_alloc_alignment_and_no_null() {
        let mut rdram = Rdram::new(0x10000);
        let a = rdram.alloc(3, 1).unwrap();
        assert!(a >= HEAP_START as u32);
        let b = rdram.alloc_uncached(64).unwrap();
        assert_eq!(b % 16, 0);
        assert!(b >= a + 3);
    }

    #[test]
    fn test_out_of_memory() {
        let mut rdram = Rdram::new(0x800);
        assert!(rdram.alloc(0x300, 16).is_ok());
        assert!(matches!(
            rdram.alloc(0x300, 16),
            Err(MemoryError::OutOfMemory { .. })
        ));
    }

    #[test]
    fn test_big_endian_access() {
        let mut rdram = Rdram::new(0x1000);
        let addr = rdram.alloc(8, 4).unwrap();
        rdram.write_u32s(addr, &[0x1234_5678]).unwrap();

        let mut bytes = [0; 4];
        rdram.read_u8s(addr, &mut bytes).unwrap();
        assert_eq!(bytes, [0x12, 0x34, 0x56, 0x78]);

        let mut halves = [0; 2];
        rdram.read_u16s(addr, &mut halves).unwrap();
        assert_eq!(halves, [0x1234, 0x5678]);
    }

    #[test]
    fn test_bounds_and_alignment_checks() {
        let rdram = Rdram::new(0x1000);
        let mut w = [0u32; 2];
        assert_eq!(
            rdram.read_u32s(0xFFC, &mut w),
            Err(MemoryError::OutOfBounds { addr: 0xFFC, len: 8 })
        );
        assert_eq!(
            rdram.read_u32s(0x402, &mut w),
            Err(MemoryError::MisalignedAccess { addr: 0x402, align: 4 })
        );
    }
}
