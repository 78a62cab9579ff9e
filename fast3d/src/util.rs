//! Utilities for working with Fast3D-related data.

#![allow(missing_docs)]

use core::fmt;
use std::{mem, ops};

use bytemuck::cast_slice_mut;

use crate::{cmd::MatrixOp, interpret::F3DMemory, F3DError};

/// A 4x4 matrix acting on column vectors, so translation is stored in the last column.
#[derive(Clone, Default, PartialEq)]
pub struct Matrixf(pub [[f32; 4]; 4]);

impl Matrixf {
    pub fn identity() -> Self {
        Self([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// A view matrix for a camera at `from` facing `to`.
    ///
    /// `up` does not need to be normalized or perpendicular to the view direction.
    pub fn look_at(from: [f32; 3], to: [f32; 3], up: [f32; 3]) -> Self {
        let z = normalize3([from[0] - to[0], from[1] - to[1], from[2] - to[2]]);
        let x = normalize3(cross(up, z));
        let y = cross(z, x);

        let mut mtx = Self::identity();
        for (i, axis) in [x, y, z].into_iter().enumerate() {
            mtx.0[i][0] = axis[0];
            mtx.0[i][1] = axis[1];
            mtx.0[i][2] = axis[2];
            mtx.0[i][3] = -(from[0] * axis[0] + from[1] * axis[1] + from[2] * axis[2]);
        }
        mtx
    }

    /// fov_y is in radians
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut mtx = Self::identity();

        let y_scale = (fov_y / 2.0).cos() / (fov_y / 2.0).sin();
        mtx.0[0][0] = y_scale / aspect;
        mtx.0[1][1] = y_scale;
        mtx.0[2][2] = (near + far) / (near - far);
        mtx.0[3][2] = -1.0;
        mtx.0[2][3] = 2.0 * near * far / (near - far);
        mtx.0[3][3] = 0.0;

        mtx
    }

    /// Rotate xyz by c in radians and translate by b.
    ///
    /// The rotation about x is applied first, then y, then z.
    pub fn rotate_xyz_and_translate(b: [f32; 3], c: [f32; 3]) -> Self {
        let sx = c[0].sin();
        let cx = c[0].cos();

        let sy = c[1].sin();
        let cy = c[1].cos();

        let sz = c[2].sin();
        let cz = c[2].cos();

        let mut mtx = Matrixf::default();

        mtx.0[0][0] = cy * cz;
        mtx.0[1][0] = cy * sz;
        mtx.0[2][0] = -sy;
        mtx.0[3][0] = 0.0;

        mtx.0[0][1] = sx * sy * cz - cx * sz;
        mtx.0[1][1] = sx * sy * sz + cx * cz;
        mtx.0[2][1] = sx * cy;
        mtx.0[3][1] = 0.0;

        mtx.0[0][2] = cx * sy * cz + sx * sz;
        mtx.0[1][2] = cx * sy * sz - sx * cz;
        mtx.0[2][2] = cx * cy;
        mtx.0[3][2] = 0.0;

        mtx.0[0][3] = b[0];
        mtx.0[1][3] = b[1];
        mtx.0[2][3] = b[2];
        mtx.0[3][3] = 1.0;

        mtx
    }

    /// Scale, then rotate by euler angles (radians), then translate.
    pub fn from_srt_euler(scale: [f32; 3], rot: [f32; 3], translate: [f32; 3]) -> Self {
        let mut mtx = Self::rotate_xyz_and_translate(translate, rot);
        for i in 0..3 {
            for j in 0..3 {
                mtx.0[i][j] *= scale[j];
            }
        }
        mtx
    }

    pub fn from_fixed(m: &[i32]) -> Self {
        assert_eq!(m.len(), 16, "incorrect fixed point matrix size");
        let mut r = Self::default();
        for i in [0, 2] {
            for j in 0..4 {
                let int_part = m[j * 2 + i / 2] as u32;
                let frac_part = m[8 + j * 2 + i / 2] as u32;
                r.0[i][j] = ((int_part & 0xFFFF0000) | (frac_part >> 16)) as i32 as f32 / 65536.0;
                r.0[i + 1][j] = ((int_part << 16) | (frac_part & 0xFFFF)) as i32 as f32 / 65536.0;
            }
        }
        r
    }

    pub fn to_fixed(&self) -> Vec<i32> {
        let mut r = vec![0; 16];
        for i in [0, 2] {
            for j in 0..4 {
                let v1 = (self.0[i][j] * 65536.0) as i32 as u32;
                let v2 = (self.0[i + 1][j] * 65536.0) as i32 as u32;
                let frac_part = (v1 << 16) | (v2 & 0xFFFF);
                let int_part = (v1 & 0xFFFF0000) | (v2 >> 16);
                r[j * 2 + i / 2] = int_part as i32;
                r[8 + j * 2 + i / 2] = frac_part as i32;
            }
        }
        r
    }

    pub fn transpose(&self) -> Self {
        let mut r = Self::default();
        for i in 0..4 {
            for j in 0..4 {
                r.0[i][j] = self.0[j][i];
            }
        }
        r
    }

    /// Transforms a direction, ignoring translation.
    pub fn transform_dir(&self, v: [f32; 3]) -> [f32; 3] {
        let r = self * [v[0], v[1], v[2], 0.0];
        [r[0], r[1], r[2]]
    }
}

impl fmt::Debug for Matrixf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrixf [")?;
        for i in 0..4 {
            write!(f, "  [ ")?;
            for j in 0..4 {
                write!(f, "\t{:.3} ", self.0[i][j])?;
            }
            writeln!(f, "\t]")?;
        }
        write!(f, "]")?;
        Ok(())
    }
}

impl ops::Mul<&Matrixf> for &Matrixf {
    type Output = Matrixf;

    fn mul(self, rhs: &Matrixf) -> Self::Output {
        let mut out = Matrixf::default();
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    out.0[i][j] += self.0[i][k] * rhs.0[k][j];
                }
            }
        }
        out
    }
}

impl ops::Mul<[f32; 4]> for &Matrixf {
    type Output = [f32; 4];

    fn mul(self, rhs: [f32; 4]) -> Self::Output {
        let mut out = [0.0; 4];
        for i in 0..4 {
            for k in 0..4 {
                out[i] += self.0[i][k] * rhs[k];
            }
        }
        out
    }
}

pub fn read_matrix<M: F3DMemory>(
    memory: &M,
    ptr: M::Ptr,
    offset: usize,
) -> Result<Vec<i32>, M::Error> {
    let mut m = vec![0; 16];
    memory.read_u32(cast_slice_mut(&mut m), ptr, offset)?;
    Ok(m)
}

pub fn normalize(v: [f32; 4]) -> [f32; 4] {
    let mag = dot(v, v).sqrt();
    if mag == 0.0 {
        v
    } else {
        scalar_mul(v, 1.0 / mag)
    }
}

pub fn normalize3(v: [f32; 3]) -> [f32; 3] {
    let n = normalize([v[0], v[1], v[2], 0.0]);
    [n[0], n[1], n[2]]
}

pub fn dot(v: [f32; 4], w: [f32; 4]) -> f32 {
    v[0] * w[0] + v[1] * w[1] + v[2] * w[2] + v[3] * w[3]
}

pub fn cross(v: [f32; 3], w: [f32; 3]) -> [f32; 3] {
    [
        v[1] * w[2] - v[2] * w[1],
        v[2] * w[0] - v[0] * w[2],
        v[0] * w[1] - v[1] * w[0],
    ]
}

pub fn scalar_mul(v: [f32; 4], s: f32) -> [f32; 4] {
    [v[0] * s, v[1] * s, v[2] * s, v[3] * s]
}

#[derive(Debug)]
pub struct MatrixState {
    pub stack: Vec<Matrixf>,
    pub cur: Matrixf,
}

impl Default for MatrixState {
    fn default() -> Self {
        Self {
            stack: Vec::new(),
            cur: Matrixf::identity(),
        }
    }
}

impl MatrixState {
    pub fn execute(&mut self, m: Matrixf, op: MatrixOp, push: bool) {
        if push {
            self.stack.push(self.cur.clone());
        }
        match op {
            MatrixOp::Load => self.cur = m,
            MatrixOp::Mul => self.cur = &self.cur * &m,
        }
    }

    pub fn pop(&mut self) -> Result<(), F3DError> {
        self.cur = self.stack.pop().ok_or(F3DError::MatrixStackUnderflow)?;
        Ok(())
    }
}

/// Viewport scale and translation, in quarter pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    pub scale: [i16; 4],
    pub trans: [i16; 4],
}

impl Viewport {
    /// A viewport covering the given pixel rectangle.
    pub fn from_rect(offset: [u32; 2], size: [u32; 2]) -> Self {
        let half_w = (size[0] * 2) as i16;
        let half_h = (size[1] * 2) as i16;
        Self {
            scale: [half_w, half_h, 0x1FF, 0],
            trans: [
                (offset[0] * 4) as i16 + half_w,
                (offset[1] * 4) as i16 + half_h,
                0x1FF,
                0,
            ],
        }
    }

    pub fn to_u16s(&self) -> [u16; 8] {
        let mut r = [0; 8];
        for i in 0..4 {
            r[i] = self.scale[i] as u16;
            r[4 + i] = self.trans[i] as u16;
        }
        r
    }
}

pub fn read_viewport<M: F3DMemory>(
    memory: &M,
    ptr: M::Ptr,
    offset: usize,
) -> Result<Viewport, M::Error> {
    let mut v = Viewport::default();
    memory.read_u16(cast_slice_mut(&mut v.scale), ptr, offset)?;
    memory.read_u16(cast_slice_mut(&mut v.trans), ptr, offset + 8)?;
    Ok(v)
}

/// A vertex as laid out in memory.
///
/// When lighting is enabled, `cn` holds a signed normal instead of a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Vertex {
    pub pos: [i16; 3],
    pub padding: u16,
    pub uv: [i16; 2],
    pub cn: [u8; 4],
}

impl Vertex {
    pub const SIZE: usize = 16;

    /// Big endian, as stored in RDRAM.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut b = [0; Self::SIZE];
        for i in 0..3 {
            b[2 * i..2 * i + 2].copy_from_slice(&self.pos[i].to_be_bytes());
        }
        b[6..8].copy_from_slice(&self.padding.to_be_bytes());
        b[8..10].copy_from_slice(&self.uv[0].to_be_bytes());
        b[10..12].copy_from_slice(&self.uv[1].to_be_bytes());
        b[12..16].copy_from_slice(&self.cn);
        b
    }
}

pub fn read_vertices<M: F3DMemory>(
    memory: &M,
    ptr: M::Ptr,
    offset: usize,
    count: usize,
) -> Result<Vec<Vertex>, M::Error> {
    let stride = mem::size_of::<Vertex>();
    let mut vs = Vec::new();
    for i in 0..count {
        let mut v = Vertex::default();
        let voffset = offset + i * stride;
        memory.read_u16(cast_slice_mut(&mut v.pos), ptr, voffset)?;
        memory.read_u16(cast_slice_mut(&mut v.uv), ptr, voffset + 8)?;
        memory.read_u8(cast_slice_mut(&mut v.cn), ptr, voffset + 12)?;
        vs.push(v);
    }
    Ok(vs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Light {
    pub color: [u8; 3],
    pub pad1: u8,
    pub color_copy: [u8; 3],
    pub pad2: u8,
    pub dir: [i8; 3],
    pub pad3: u8,
}

impl Light {
    pub const SIZE: usize = 16;

    /// A light with the given color, and a direction scaled to the signed byte range.
    pub fn new(color: [u8; 3], dir: [f32; 3]) -> Self {
        let to_i8 = |c: f32| (c * 127.0).round().clamp(-127.0, 127.0) as i8;
        Self {
            color,
            color_copy: color,
            dir: [to_i8(dir[0]), to_i8(dir[1]), to_i8(dir[2])],
            ..Default::default()
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut b = [0; Self::SIZE];
        b[0..3].copy_from_slice(&self.color);
        b[4..7].copy_from_slice(&self.color_copy);
        for i in 0..3 {
            b[8 + i] = self.dir[i] as u8;
        }
        b
    }
}

pub fn read_light<M: F3DMemory>(memory: &M, ptr: M::Ptr) -> Result<Light, M::Error> {
    let mut light = Light::default();
    memory.read_u8(&mut light.color, ptr, 0)?;
    memory.read_u8(&mut light.color_copy, ptr, 4)?;
    memory.read_u8(cast_slice_mut(&mut light.dir), ptr, 8)?;
    Ok(light)
}

pub fn rgba_16_to_32(rgba16: u16) -> [u8; 4] {
    [
        (((rgba16 >> 8) & 0xF8) as u32 * 255 / 0xF8) as u8,
        (((rgba16 >> 3) & 0xF8) as u32 * 255 / 0xF8) as u8,
        (((rgba16 << 2) & 0xF8) as u32 * 255 / 0xF8) as u8,
        (rgba16 & 0x1) as u8 * 255,
    ]
}

pub fn rgba_32_to_16([r, g, b, a]: [u8; 4]) -> u16 {
    ((r as u16 >> 3) << 11) | ((g as u16 >> 3) << 6) | ((b as u16 >> 3) << 1) | (a >= 128) as u16
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_close(a: &Matrixf, b: &Matrixf, eps: f32) {
        for i in 0..4 {
            for j in 0..4 {
                assert!(
                    (a.0[i][j] - b.0[i][j]).abs() <= eps,
                    "{:?} != {:?} at [{}][{}]",
                    a,
                    b,
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn test_fixed_point_preserves_srt_matrix() {
        let m = Matrixf::from_srt_euler([0.1, 0.1, 0.1], [0.3, -1.2, 2.0], [5.0, -3.5, 12.25]);
        let fixed = m.to_fixed();
        assert_close(&Matrixf::from_fixed(&fixed), &m, 1.0 / 32768.0);
    }

    #[test]
    fn test_fixed_point_identity_layout() {
        let fixed = Matrixf::identity().to_fixed();
        // Integer halves of the diagonal are 1, fractional halves are 0.
        assert_eq!(fixed[0], 0x0001_0000);
        assert_eq!(fixed[2], 0x0000_0001);
        assert_eq!(fixed[5], 0x0001_0000);
        assert_eq!(fixed[7], 0x0000_0001);
        assert!(fixed[8..].iter().all(|&w| w == 0));
    }

    #[test]
    fn test_look_at_places_target_in_front() {
        let view = Matrixf::look_at([0.0, 20.0, 40.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let target = &view * [0.0, 0.0, 0.0, 1.0];
        let dist = (20.0f32 * 20.0 + 40.0 * 40.0).sqrt();
        assert!(target[0].abs() < 1e-4);
        assert!(target[1].abs() < 1e-4);
        assert!((target[2] + dist).abs() < 1e-3);
    }

    #[test]
    fn test_srt_scale_applies_before_rotation() {
        let m = Matrixf::from_srt_euler([2.0, 2.0, 2.0], [0.0, std::f32::consts::FRAC_PI_2, 0.0], [0.0; 3]);
        let v = &m * [1.0, 0.0, 0.0, 1.0];
        assert!(v[0].abs() < 1e-5);
        assert!((v[2] + 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_matrix_stack_underflow() {
        let mut state = MatrixState::default();
        state.execute(Matrixf::identity(), MatrixOp::Mul, true);
        assert!(state.pop().is_ok());
        assert_eq!(state.pop(), Err(F3DError::MatrixStackUnderflow));
    }

    #[test]
    fn test_rgba16_conversion() {
        assert_eq!(rgba_32_to_16([0xFF, 0xFF, 0xFF, 0xFF]), 0xFFFF);
        assert_eq!(rgba_16_to_32(0xF801), [0xFF, 0, 0, 0xFF]);
        assert_eq!(rgba_32_to_16([0, 0, 0xFF, 0]), 0x003E);
    }
}
