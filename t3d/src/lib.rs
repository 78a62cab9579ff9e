//! A small 3D engine on top of the RSP command queue.
//!
//! Geometry goes through the Fast3D microcode path: matrices and lights live in RDRAM and
//! are referenced by the commands that [T3d] submits, so per-frame values are read when
//! the frame is rendered.

#![warn(rust_2018_idioms)]

use fast3d::{
    cmd::{
        ColorCombineComponent, ColorCombineMode, CombineMode, CycleType, F3DCommand, FillColor,
        GeometryModes, Image, ImageFormat, MatrixMode, MatrixOp, Rectangle, Rgba32, ScissorMode,
    },
    util::{normalize3, rgba_32_to_16, Light, Matrixf},
};
use n64_sys::{raster::DEPTH_CLEAR, Pointer, RspQueue, Surface, SysError};
use tracing::info;

pub use error::*;
pub use math::*;
pub use model::{Model, ModelBuilder, ModelVertex};
pub use viewport::Viewport;

mod error;
mod math;
pub mod model;
mod viewport;

pub const MAX_LIGHTS: usize = 7;

/// Color = primitive color * shade color. Alpha likewise.
pub fn combine_prim_shade() -> CombineMode {
    use ColorCombineComponent::*;

    let mode = ColorCombineMode {
        args: [Prim, Zero, Shade, Zero],
    };
    CombineMode::one_cycle(mode, mode)
}

fn image_for(surface: &Surface) -> Image<Pointer> {
    Image {
        fmt: ImageFormat::Rgba,
        size: surface.format.component_size(),
        width: surface.width,
        img: Pointer::Rdram(surface.addr),
    }
}

fn full_rect(surface: &Surface) -> Rectangle<u32> {
    Rectangle {
        ulx: 0,
        uly: 0,
        lrx: surface.width - 1,
        lry: surface.height - 1,
    }
}

#[derive(Debug)]
pub struct T3d {
    /// Light slots in RDRAM. Directional lights come first, then the ambient light.
    lights_addr: u32,
    ambient: [u8; 4],
    view: Matrixf,
}

impl T3d {
    pub fn init(rspq: &mut RspQueue) -> Result<Self, SysError> {
        let lights_addr = rspq
            .rdram_mut()
            .alloc_uncached((MAX_LIGHTS + 1) * Light::SIZE)?;
        info!("t3d: init");
        Ok(Self {
            lights_addr,
            ambient: [0, 0, 0, 0xFF],
            view: Matrixf::identity(),
        })
    }

    fn light_pointer(&self, slot: usize) -> Pointer {
        Pointer::Rdram(self.lights_addr + (slot * Light::SIZE) as u32)
    }

    fn write_light(&self, rspq: &mut RspQueue, slot: usize, light: &Light) -> Result<(), SysError> {
        let addr = self.light_pointer(slot).rdram()?;
        rspq.rdram_mut().write_u8s(addr, &light.to_bytes())?;
        Ok(())
    }

    /// Resets render state for a new frame of 3D rendering.
    pub fn frame_start(&mut self, rspq: &mut RspQueue) {
        rspq.submit(F3DCommand::DPPipeSync);
        rspq.submit(F3DCommand::SPClearGeometryMode(GeometryModes::all()));
        rspq.submit(F3DCommand::SPSetGeometryMode(
            GeometryModes::ZBUFFER
                | GeometryModes::SHADE
                | GeometryModes::LIGHTING
                | GeometryModes::CULL_BACK
                | GeometryModes::SHADING_SMOOTH,
        ));
        rspq.submit(F3DCommand::DPSetCycleType(CycleType::OneCycle));
        rspq.submit(F3DCommand::DPSetCombineMode(combine_prim_shade()));
        rspq.submit(F3DCommand::DPSetPrimColor(Rgba32::WHITE));
    }

    /// Uploads the viewport's current matrices and makes it the render target region.
    pub fn viewport_attach(
        &mut self,
        rspq: &mut RspQueue,
        viewport: &Viewport,
    ) -> Result<(), SysError> {
        viewport.upload(rspq)?;

        rspq.submit(F3DCommand::SPViewport(viewport.vp_pointer()));
        rspq.submit(F3DCommand::SPMatrix {
            matrix: viewport.proj_pointer(),
            mode: MatrixMode::Proj,
            op: MatrixOp::Load,
            push: false,
        });
        rspq.submit(F3DCommand::SPMatrix {
            matrix: viewport.view_pointer(),
            mode: MatrixMode::ModelView,
            op: MatrixOp::Load,
            push: false,
        });

        let [x, y] = viewport.offset();
        let [w, h] = viewport.size();
        rspq.submit(F3DCommand::DPSetScissor(
            ScissorMode::NonInterlace,
            Rectangle {
                ulx: (x * 4) as u16,
                uly: (y * 4) as u16,
                lrx: ((x + w) * 4) as u16,
                lry: ((y + h) * 4) as u16,
            },
        ));

        self.view = viewport.view.clone();
        Ok(())
    }

    /// Fills the attached color surface.
    pub fn screen_clear_color(&mut self, rspq: &mut RspQueue, color: [u8; 4]) {
        let surface = rspq
            .attached_color()
            .expect("t3d_screen_clear_color: no surface attached");
        let fill = FillColor(rgba_32_to_16(color));

        rspq.submit(F3DCommand::DPPipeSync);
        rspq.submit(F3DCommand::DPSetCycleType(CycleType::Fill));
        rspq.submit(F3DCommand::DPSetFillColor([fill, fill]));
        rspq.submit(F3DCommand::DPFillRectangle(full_rect(&surface)));
        rspq.submit(F3DCommand::DPPipeSync);
        rspq.submit(F3DCommand::DPSetCycleType(CycleType::OneCycle));
    }

    /// Resets the attached depth buffer to the far plane.
    pub fn screen_clear_depth(&mut self, rspq: &mut RspQueue) {
        let color = rspq
            .attached_color()
            .expect("t3d_screen_clear_depth: no surface attached");
        let depth = rspq
            .attached_depth()
            .expect("t3d_screen_clear_depth: no depth buffer attached");
        let fill = FillColor(DEPTH_CLEAR);

        rspq.submit(F3DCommand::DPPipeSync);
        rspq.submit(F3DCommand::DPSetCycleType(CycleType::Fill));
        rspq.submit(F3DCommand::DPSetColorImage(image_for(&depth)));
        rspq.submit(F3DCommand::DPSetFillColor([fill, fill]));
        rspq.submit(F3DCommand::DPFillRectangle(full_rect(&depth)));
        rspq.submit(F3DCommand::DPPipeSync);
        rspq.submit(F3DCommand::DPSetColorImage(image_for(&color)));
        rspq.submit(F3DCommand::DPSetCycleType(CycleType::OneCycle));
    }

    /// Sets the ambient color, uploaded by [T3d::light_set_count].
    pub fn light_set_ambient(&mut self, color: [u8; 4]) {
        self.ambient = color;
    }

    /// Sets directional light `index` (0 based). `dir` is in world space and should be
    /// normalized; it points towards the light.
    pub fn light_set_directional(
        &mut self,
        rspq: &mut RspQueue,
        index: usize,
        color: [u8; 4],
        dir: &Vec3,
    ) -> Result<(), SysError> {
        assert!(index < MAX_LIGHTS, "t3d_light_set_directional: bad index {}", index);

        let eye_dir = normalize3(self.view.transform_dir(dir.0));
        let light = Light::new([color[0], color[1], color[2]], eye_dir);
        self.write_light(rspq, index, &light)?;
        rspq.submit(F3DCommand::SPLight {
            light: self.light_pointer(index),
            n: index as u32 + 1,
        });
        Ok(())
    }

    /// Sets the number of directional lights, and uploads the ambient light after them.
    pub fn light_set_count(&mut self, rspq: &mut RspQueue, count: usize) -> Result<(), SysError> {
        assert!(count <= MAX_LIGHTS, "t3d_light_set_count: bad count {}", count);

        let [r, g, b, _] = self.ambient;
        self.write_light(rspq, count, &Light::new([r, g, b], [0.0; 3]))?;
        rspq.submit(F3DCommand::SPLight {
            light: self.light_pointer(count),
            n: count as u32 + 1,
        });
        rspq.submit(F3DCommand::SPNumLights(count as u32));
        Ok(())
    }

    /// Multiplies a model matrix onto the model view stack, saving the previous top.
    pub fn matrix_push(&mut self, rspq: &mut RspQueue, matrix: Pointer) {
        rspq.submit(F3DCommand::SPMatrix {
            matrix,
            mode: MatrixMode::ModelView,
            op: MatrixOp::Mul,
            push: true,
        });
    }

    pub fn matrix_pop(&mut self, rspq: &mut RspQueue, count: u32) {
        for _ in 0..count {
            rspq.submit(F3DCommand::SPPopMatrix(MatrixMode::ModelView));
        }
    }

    pub fn model_draw(&mut self, rspq: &mut RspQueue, model: &Model) {
        rspq.submit(F3DCommand::SPDisplayList(model.display_list()));
    }

    pub fn destroy(self) {
        info!("t3d: destroy");
    }
}
