use fast3d::util::{Matrixf, Viewport as VpData};
use n64_sys::{Pointer, RspQueue, SysError};
use tracing::debug;

use crate::math::Vec3;

const VP_SIZE: u32 = 16;
const MATRIX_SIZE: u32 = 64;

/// A camera rendering to a rectangle of the screen.
///
/// The viewport owns one RDRAM buffer holding its hardware viewport, projection matrix
/// and view matrix. [crate::T3d::viewport_attach] writes the current values there.
#[derive(Debug, Clone)]
pub struct Viewport {
    offset: [u32; 2],
    size: [u32; 2],
    pub(crate) proj: Matrixf,
    pub(crate) view: Matrixf,
    addr: u32,
}

impl Viewport {
    /// A viewport covering the whole screen.
    pub fn create(rspq: &mut RspQueue, screen_size: [u32; 2]) -> Result<Self, SysError> {
        Self::create_rect(rspq, [0, 0], screen_size)
    }

    pub fn create_rect(
        rspq: &mut RspQueue,
        offset: [u32; 2],
        size: [u32; 2],
    ) -> Result<Self, SysError> {
        let addr = rspq
            .rdram_mut()
            .alloc_uncached((VP_SIZE + 2 * MATRIX_SIZE) as usize)?;
        debug!("t3d: viewport {:?}+{:?} at {:#010X}", size, offset, addr);
        Ok(Self {
            offset,
            size,
            proj: Matrixf::identity(),
            view: Matrixf::identity(),
            addr,
        })
    }

    pub fn offset(&self) -> [u32; 2] {
        self.offset
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.size[0] as f32 / self.size[1] as f32
    }

    /// `fov` is the vertical field of view in radians.
    pub fn set_projection(&mut self, fov: f32, near: f32, far: f32) {
        self.proj = Matrixf::perspective(fov, self.aspect_ratio(), near, far);
    }

    pub fn look_at(&mut self, eye: &Vec3, target: &Vec3, up: &Vec3) {
        self.view = Matrixf::look_at(eye.0, target.0, up.0);
    }

    pub fn view_matrix(&self) -> &Matrixf {
        &self.view
    }

    pub fn proj_matrix(&self) -> &Matrixf {
        &self.proj
    }

    pub(crate) fn vp_pointer(&self) -> Pointer {
        Pointer::Rdram(self.addr)
    }

    pub(crate) fn proj_pointer(&self) -> Pointer {
        Pointer::Rdram(self.addr + VP_SIZE)
    }

    pub(crate) fn view_pointer(&self) -> Pointer {
        Pointer::Rdram(self.addr + VP_SIZE + MATRIX_SIZE)
    }

    /// Writes the viewport and both matrices to RDRAM.
    pub(crate) fn upload(&self, rspq: &mut RspQueue) -> Result<(), SysError> {
        let rdram = rspq.rdram_mut();
        rdram.write_u16s(self.addr, &VpData::from_rect(self.offset, self.size).to_u16s())?;
        for (m, offset) in [(&self.proj, VP_SIZE), (&self.view, VP_SIZE + MATRIX_SIZE)] {
            let words: Vec<u32> = m.to_fixed().into_iter().map(|w| w as u32).collect();
            rdram.write_u32s(self.addr + offset, &words)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use n64_sys::Rdram;

    use super::*;
    use crate::math::deg_to_rad;

    #[test]
    fn test_projection_uses_aspect_ratio() {
        let mut rspq = RspQueue::init(Rdram::new(0x1000));
        let mut viewport = Viewport::create(&mut rspq, [320, 240]).unwrap();
        viewport.set_projection(deg_to_rad(90.0), 10.0, 150.0);

        let proj = viewport.proj_matrix();
        assert!((proj.0[1][1] - 1.0).abs() < 1e-5);
        assert!((proj.0[0][0] - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_upload_writes_viewport() {
        let mut rspq = RspQueue::init(Rdram::new(0x1000));
        let viewport = Viewport::create(&mut rspq, [320, 240]).unwrap();
        viewport.upload(&mut rspq).unwrap();

        let mut vp = [0u16; 8];
        rspq.rdram()
            .read_u16s(viewport.vp_pointer().rdram().unwrap(), &mut vp)
            .unwrap();
        assert_eq!(vp, [640, 480, 0x1FF, 0, 640, 480, 0x1FF, 0]);
    }
}
