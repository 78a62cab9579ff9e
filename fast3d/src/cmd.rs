//! Rust types representing Fast3D commands.

#![allow(missing_docs)]

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::decode::RawF3DCommand;

/// A decoded Fast3D command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum F3DCommand<Ptr> {
    NoOp,
    Unknown(RawF3DCommand<Ptr>),

    // SP commands
    SPMatrix {
        matrix: Ptr,
        mode: MatrixMode,
        op: MatrixOp,
        push: bool,
    },
    SPViewport(Ptr),
    SPLight {
        light: Ptr,
        n: u32,
    },
    SPVertex {
        v: Ptr,
        n: u32,
        v0: u32,
    },
    SPDisplayList(Ptr),
    SPBranchList(Ptr),
    SPOneTriangle {
        v0: u32,
        v1: u32,
        v2: u32,
        flag: u32,
    },
    SPPopMatrix(MatrixMode),
    SPNumLights(u32),
    SPEndDisplayList,
    SPSetGeometryMode(GeometryModes),
    SPClearGeometryMode(GeometryModes),

    // DP commands
    DPSetCycleType(CycleType),
    DPSetColorImage(Image<Ptr>),
    DPSetDepthImage(Ptr),
    DPSetCombineMode(CombineMode),
    DPSetEnvColor(Rgba32),
    DPSetPrimColor(Rgba32),
    DPSetFillColor([FillColor; 2]),
    DPFillRectangle(Rectangle<u32>),
    DPSetScissor(ScissorMode, Rectangle<u16>),
    DPFullSync,
    DPPipeSync,
}

impl<Ptr> F3DCommand<Ptr> {
    /// Converts every pointer operand of the command with `f`.
    ///
    /// This is used to relocate display lists whose pointers are stored as offsets.
    pub fn map_ptr<T>(self, mut f: impl FnMut(Ptr) -> T) -> F3DCommand<T> {
        use F3DCommand::*;

        match self {
            NoOp => NoOp,
            Unknown(raw) => Unknown(RawF3DCommand {
                w0: raw.w0,
                w1: raw.w1,
                w1_ptr: f(raw.w1_ptr),
            }),
            SPMatrix {
                matrix,
                mode,
                op,
                push,
            } => SPMatrix {
                matrix: f(matrix),
                mode,
                op,
                push,
            },
            SPViewport(ptr) => SPViewport(f(ptr)),
            SPLight { light, n } => SPLight { light: f(light), n },
            SPVertex { v, n, v0 } => SPVertex { v: f(v), n, v0 },
            SPDisplayList(ptr) => SPDisplayList(f(ptr)),
            SPBranchList(ptr) => SPBranchList(f(ptr)),
            SPOneTriangle { v0, v1, v2, flag } => SPOneTriangle { v0, v1, v2, flag },
            SPPopMatrix(mode) => SPPopMatrix(mode),
            SPNumLights(n) => SPNumLights(n),
            SPEndDisplayList => SPEndDisplayList,
            SPSetGeometryMode(mode) => SPSetGeometryMode(mode),
            SPClearGeometryMode(mode) => SPClearGeometryMode(mode),
            DPSetCycleType(cycle_type) => DPSetCycleType(cycle_type),
            DPSetColorImage(image) => DPSetColorImage(Image {
                fmt: image.fmt,
                size: image.size,
                width: image.width,
                img: f(image.img),
            }),
            DPSetDepthImage(ptr) => DPSetDepthImage(f(ptr)),
            DPSetCombineMode(mode) => DPSetCombineMode(mode),
            DPSetEnvColor(color) => DPSetEnvColor(color),
            DPSetPrimColor(color) => DPSetPrimColor(color),
            DPSetFillColor(color) => DPSetFillColor(color),
            DPFillRectangle(rect) => DPFillRectangle(rect),
            DPSetScissor(mode, rect) => DPSetScissor(mode, rect),
            DPFullSync => DPFullSync,
            DPPipeSync => DPPipeSync,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MatrixMode {
    Proj = 1,
    ModelView = 0,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MatrixOp {
    Load = 2,
    Mul = 0,
}

bitflags! {
    pub struct GeometryModes: u32 {
        const ZBUFFER             = 0x00000001;
        const TEXTURE_ENABLE      = 0x00000002;
        const SHADE               = 0x00000004;
        const SHADING_SMOOTH      = 0x00000200;
        const CULL_FRONT          = 0x00001000;
        const CULL_BACK           = 0x00002000;
        const FOG                 = 0x00010000;
        const LIGHTING            = 0x00020000;
        const TEXTURE_GEN         = 0x00040000;
        const TEXTURE_GEN_LINEAR  = 0x00080000;
        const LOD                 = 0x00100000;
        const CLIPPING            = 0x00800000;
    }
}

impl Default for GeometryModes {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum CycleType {
    OneCycle = 0,
    TwoCycle = 1,
    Copy = 2,
    Fill = 3,
}

impl Default for CycleType {
    fn default() -> Self {
        Self::OneCycle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Image<Ptr> {
    pub fmt: ImageFormat,
    pub size: ComponentSize,
    pub width: u32,
    pub img: Ptr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ImageFormat {
    Rgba = 0,
    Yuv = 1,
    Ci = 2,
    Ia = 3,
    I = 4,
}

impl Default for ImageFormat {
    fn default() -> Self {
        Self::Rgba
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ComponentSize {
    Bits4 = 0,
    Bits8 = 1,
    Bits16 = 2,
    Bits32 = 3,
}

impl Default for ComponentSize {
    fn default() -> Self {
        Self::Bits16
    }
}

impl ComponentSize {
    pub fn num_bits(self) -> u32 {
        match self {
            ComponentSize::Bits4 => 4,
            ComponentSize::Bits8 => 8,
            ComponentSize::Bits16 => 16,
            ComponentSize::Bits32 => 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CombineMode {
    pub color1: ColorCombineMode,
    pub alpha1: ColorCombineMode,
    pub color2: ColorCombineMode,
    pub alpha2: ColorCombineMode,
}

impl CombineMode {
    pub fn one_cycle(color: ColorCombineMode, alpha: ColorCombineMode) -> Self {
        Self {
            color1: color,
            alpha1: alpha,
            color2: color,
            alpha2: alpha,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorCombineMode {
    /// [A, B, C, D]  ->  (A - B) * C + D
    pub args: [ColorCombineComponent; 4],
}

impl From<[u8; 4]> for ColorCombineMode {
    fn from(v: [u8; 4]) -> Self {
        Self {
            args: [
                ColorCombineComponent::from_u8(v[0]),
                ColorCombineComponent::from_u8(v[1]),
                ColorCombineComponent::from_u8(v[2]),
                ColorCombineComponent::from_u8(v[3]),
            ],
        }
    }
}

impl From<ColorCombineComponent> for ColorCombineMode {
    fn from(v: ColorCombineComponent) -> Self {
        Self {
            args: [
                ColorCombineComponent::Zero,
                ColorCombineComponent::Zero,
                ColorCombineComponent::Zero,
                v,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ColorCombineComponent {
    CombinedOrPrimLodFraction = 0,
    Texel0 = 1,
    Texel1 = 2,
    Prim = 3,
    Shade = 4,
    Env = 5,
    CenterOrScaleOrOne = 6,
    CombinedAlphaOrNoiseOrK4OrZero = 7,
    Texel0Alpha = 8,
    Texel1Alpha = 9,
    PrimAlpha = 10,
    ShadeAlpha = 11,
    EnvAlpha = 12,
    LodFraction = 13,
    PrimLodFraction = 14,
    K5 = 15,
    Zero = 31,
}

impl Default for ColorCombineComponent {
    fn default() -> Self {
        Self::Zero
    }
}

impl ColorCombineComponent {
    fn from_u8(v: u8) -> Self {
        v.try_into().unwrap_or(Self::Zero)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba32 {
    pub const WHITE: Self = Self::new(0xFF, 0xFF, 0xFF, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn from_rgb_a([r, g, b]: [u8; 3], a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_u32(w: u32) -> Self {
        Self {
            r: (w >> 24) as u8,
            g: (w >> 16) as u8,
            b: (w >> 8) as u8,
            a: w as u8,
        }
    }

    pub fn to_u32(self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }
}

/// Either rgba5551 or zdz (z = 14 bits, dz = 2 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FillColor(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rectangle<T> {
    pub ulx: T,
    pub uly: T,
    pub lrx: T,
    pub lry: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[allow(clippy::enum_variant_names)]
pub enum ScissorMode {
    NonInterlace = 0,
    OddInterlace = 3,
    EvenInterlace = 2,
}

impl Default for ScissorMode {
    fn default() -> Self {
        Self::NonInterlace
    }
}
