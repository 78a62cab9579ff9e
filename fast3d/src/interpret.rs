//! A display list interpreter that produces a self-contained [F3DRenderData] object that is
//! straightforward to rasterize.
//!
//! After implementing [F3DMemory] for loading vertex/matrix/light/dl data from memory,
//! [interpret_f3d_display_list] can be called.
//!
//! Memory is read when the command referencing it is interpreted, so the render data
//! reflects the memory contents at interpretation time rather than when the display list
//! was built.

use core::fmt;
use std::mem;

use derivative::Derivative;

pub use crate::f3d_render_data::*;
use crate::{cmd::*, util::*, F3DError};

/// A trait with methods for reading from RDRAM.
///
/// This needs to be implemented so that [interpret_f3d_display_list] can read
/// objects from memory (viewports, matrices, lights, display lists, etc).
pub trait F3DMemory {
    /// The pointer type that can be read from a display list command.
    ///
    /// PartialEq is only used for checking if the color image is equal to the depth
    /// image.
    type Ptr: fmt::Debug + Copy + PartialEq;
    /// Error that can be thrown when reading from memory.
    type Error: From<F3DError>;
    /// An iterator over a display list that is read from memory.
    type DlIter<'a>: Iterator<Item = Result<F3DCommand<Self::Ptr>, Self::Error>>
    where
        Self: 'a;

    /// Returns the top level display list to be interpreted.
    fn root_dl(&self) -> Result<Self::DlIter<'_>, Self::Error>;
    /// Reads a child display list from memory at the given address.
    fn read_dl(&self, ptr: Self::Ptr) -> Result<Self::DlIter<'_>, Self::Error>;

    /// Reads dst.len() u8s from memory, starting at ptr + offset (in bytes).
    fn read_u8(&self, dst: &mut [u8], ptr: Self::Ptr, offset: usize) -> Result<(), Self::Error>;
    /// Reads dst.len() u16s from memory, starting at ptr + offset (in bytes).
    fn read_u16(&self, dst: &mut [u16], ptr: Self::Ptr, offset: usize) -> Result<(), Self::Error>;
    /// Reads dst.len() u32s from memory, starting at ptr + offset (in bytes).
    fn read_u32(&self, dst: &mut [u32], ptr: Self::Ptr, offset: usize) -> Result<(), Self::Error>;
}

/// Processes `memory.root_dl()` and returns draw data in a simpler to render and
/// self-contained [F3DRenderData] object.
///
/// `screen_size` is the size of the color image in pixels.
pub fn interpret_f3d_display_list<M: F3DMemory>(
    memory: &M,
    screen_size: [u32; 2],
) -> Result<F3DRenderData<M::Ptr>, M::Error> {
    let mut interpreter = Interpreter {
        memory: Some(memory),
        screen_size,
        result: Some(F3DRenderData::new(screen_size)),
        ..Default::default()
    };
    interpreter.interpret(memory.root_dl()?)?;
    let render_data = interpreter.finish();
    Ok(render_data)
}

const NUM_VERTEX_SLOTS: usize = 16;
const NUM_LIGHT_SLOTS: usize = 8;

/// A vertex after transformation and lighting.
#[derive(Debug, Clone, Copy, Default)]
struct LoadedVertex {
    pos: [f32; 4],
    shade: Rgba32,
}

#[derive(Debug, Derivative)]
#[derivative(Default(bound = ""))]
struct Interpreter<'m, M: F3DMemory> {
    memory: Option<&'m M>,
    screen_size: [u32; 2],
    result: Option<F3DRenderData<M::Ptr>>,

    color_image: Option<Image<M::Ptr>>,
    depth_image: Option<M::Ptr>,

    viewport: Option<Viewport>,
    scissor: Option<(ScissorMode, Rectangle<u16>)>,
    model_view: MatrixState,
    proj: MatrixState,

    cycle_type: CycleType,
    combine_mode: CombineMode,
    env_color: Rgba32,
    prim_color: Rgba32,
    fill_color: [FillColor; 2],

    lights: [Light; NUM_LIGHT_SLOTS],
    num_dir_lights: u32,

    geometry_mode: GeometryModes,

    vertices: [Option<LoadedVertex>; NUM_VERTEX_SLOTS],
    vertex_buffer: Vec<f32>,
    num_vertices: u32,
}

impl<'m, M: F3DMemory> Interpreter<'m, M> {
    fn finish(mut self) -> F3DRenderData<M::Ptr> {
        self.flush();
        self.result.take().unwrap_or_else(|| F3DRenderData::new(self.screen_size))
    }

    fn memory(&self) -> &'m M {
        self.memory.expect("interpreter without memory")
    }

    fn push_command(&mut self, cmd: RenderCommand<M::Ptr>) {
        if let Some(result) = self.result.as_mut() {
            result.commands.push(cmd);
        }
    }

    fn flush(&mut self) {
        if self.num_vertices > 0 {
            let cmd = DrawCommand {
                viewport: self.viewport_screen(),
                scissor: self.scissor_screen(),
                pipeline: self.pipeline_state(),
                vertex_buffer: mem::take(&mut self.vertex_buffer),
                num_vertices: mem::take(&mut self.num_vertices),
            };
            self.push_command(RenderCommand::Draw(cmd));
        }
    }

    fn full_screen(&self) -> ScreenRectangle {
        ScreenRectangle {
            x: 0,
            y: 0,
            w: self.screen_size[0] as i32,
            h: self.screen_size[1] as i32,
        }
    }

    fn viewport_screen(&self) -> ScreenRectangle {
        match self.viewport {
            Some(viewport) => {
                let w = 2.0 * viewport.scale[0] as f32 / 4.0;
                let h = 2.0 * viewport.scale[1] as f32 / 4.0;
                let x = (viewport.trans[0] as f32 / 4.0) - w / 2.0;
                let y = (viewport.trans[1] as f32 / 4.0) - h / 2.0;

                ScreenRectangle {
                    x: x as i32,
                    y: y as i32,
                    w: w as i32,
                    h: h as i32,
                }
            }
            None => self.full_screen(),
        }
    }

    fn scissor_screen(&self) -> ScreenRectangle {
        match self.scissor {
            Some((_, rect)) => {
                let ulx = rect.ulx as f32 / 4.0;
                let uly = rect.uly as f32 / 4.0;
                let lrx = rect.lrx as f32 / 4.0;
                let lry = rect.lry as f32 / 4.0;

                ScreenRectangle {
                    x: ulx as i32,
                    y: uly as i32,
                    w: (lrx - ulx) as i32,
                    h: (lry - uly) as i32,
                }
            }
            None => self.full_screen(),
        }
    }

    fn pipeline_state(&self) -> PipelineInfo {
        let cm = &self.combine_mode;
        let gm = &self.geometry_mode;

        let mut num_inputs = 0;
        let mut output_color = ColorExpr::default();

        for (i, mode) in [cm.color1, cm.alpha1].into_iter().enumerate() {
            let channel = if i == 0 {
                &mut output_color.rgb
            } else {
                &mut output_color.a
            };
            let mut channel_num_inputs = 0;
            for (j, cc) in mode.args.into_iter().enumerate() {
                let arg = match cc {
                    ColorCombineComponent::Prim
                    | ColorCombineComponent::Shade
                    | ColorCombineComponent::Env => {
                        channel_num_inputs += 1;
                        ColorArg::Input(channel_num_inputs - 1)
                    }
                    _ => ColorArg::Zero,
                };
                channel[j] = arg;
            }
            num_inputs = num_inputs.max(channel_num_inputs);
        }

        PipelineInfo {
            cull_mode: if gm.contains(GeometryModes::CULL_BACK) {
                CullMode::Back
            } else if gm.contains(GeometryModes::CULL_FRONT) {
                CullMode::Front
            } else {
                CullMode::None
            },
            depth_compare: gm.contains(GeometryModes::ZBUFFER),
            depth_write: gm.contains(GeometryModes::ZBUFFER),
            num_inputs,
            output_color,
        }
    }

    fn get_color_input_components(&self) -> [[ColorCombineComponent; 4]; 2] {
        let cm = &self.combine_mode;
        let mut components: [[ColorCombineComponent; 4]; 2] = Default::default();
        for (i, mode) in [cm.color1, cm.alpha1].into_iter().enumerate() {
            let mut num_inputs = 0;
            for cc in mode.args {
                if matches!(
                    cc,
                    ColorCombineComponent::Prim
                        | ColorCombineComponent::Shade
                        | ColorCombineComponent::Env
                ) {
                    components[i][num_inputs] = cc;
                    num_inputs += 1;
                };
            }
        }
        components
    }

    /// Directional lights in model space, with their colors.
    fn model_space_lights(&self) -> Vec<([f32; 4], [u8; 3])> {
        let inv_rotation = self.model_view.cur.transpose();
        self.lights[0..self.num_dir_lights as usize]
            .iter()
            .map(|light| {
                let light_dir = [
                    light.dir[0] as f32 / 127.0,
                    light.dir[1] as f32 / 127.0,
                    light.dir[2] as f32 / 127.0,
                    0.0,
                ];
                let mut light_n = &inv_rotation * light_dir;
                light_n[3] = 0.0;
                (normalize(light_n), light.color)
            })
            .collect()
    }

    fn calculate_shade(&self, vtx: &Vertex, lights: &[([f32; 4], [u8; 3])]) -> Rgba32 {
        let mut shade_rgb: [u8; 3];
        if self.geometry_mode.contains(GeometryModes::LIGHTING) {
            shade_rgb = self.lights[self.num_dir_lights as usize].color;
            let n = [
                vtx.cn[0] as i8 as f32 / 127.0,
                vtx.cn[1] as i8 as f32 / 127.0,
                vtx.cn[2] as i8 as f32 / 127.0,
                0.0,
            ];
            for (light_n, color) in lights {
                let intensity = dot(*light_n, n).max(0.0);
                for i in 0..3 {
                    shade_rgb[i] =
                        (shade_rgb[i] as f32 + intensity * color[i] as f32).min(255.0) as u8;
                }
            }
        } else {
            shade_rgb = [vtx.cn[0], vtx.cn[1], vtx.cn[2]];
        }

        Rgba32::from_rgb_a(shade_rgb, vtx.cn[3])
    }

    fn load_vertices(&mut self, v: M::Ptr, n: u32, v0: u32) -> Result<(), M::Error> {
        if (v0 + n) as usize > NUM_VERTEX_SLOTS {
            return Err(F3DError::InvalidVertexIndex(v0 + n - 1).into());
        }

        let vertices = read_vertices(self.memory(), v, 0, n as usize)?;
        let mvp = &self.proj.cur * &self.model_view.cur;
        let lights = self.model_space_lights();

        for (i, vtx) in vertices.iter().enumerate() {
            let model_pos = [vtx.pos[0] as f32, vtx.pos[1] as f32, vtx.pos[2] as f32, 1.0];
            let loaded = LoadedVertex {
                pos: &mvp * model_pos,
                shade: self.calculate_shade(vtx, &lights),
            };
            self.vertices[v0 as usize + i] = Some(loaded);
        }
        Ok(())
    }

    fn vertex(&self, index: u32) -> Result<LoadedVertex, F3DError> {
        self.vertices
            .get(index as usize)
            .copied()
            .flatten()
            .ok_or(F3DError::InvalidVertexIndex(index))
    }

    fn push_vertex_color_inputs(
        &mut self,
        pipeline: &PipelineInfo,
        input_comps: &[[ColorCombineComponent; 4]; 2],
        shade: Rgba32,
    ) {
        for input_index in 0..pipeline.num_inputs as usize {
            let [r, g, b] = match input_comps[0][input_index] {
                ColorCombineComponent::Prim => self.prim_color.rgb(),
                ColorCombineComponent::Shade => shade.rgb(),
                ColorCombineComponent::Env => self.env_color.rgb(),
                _ => [0, 0, 0],
            };
            let a = match input_comps[1][input_index] {
                ColorCombineComponent::Prim => self.prim_color.a,
                ColorCombineComponent::Shade => shade.a,
                ColorCombineComponent::Env => self.env_color.a,
                _ => 0,
            };
            self.vertex_buffer.extend(&[
                r as f32 / 255.0,
                g as f32 / 255.0,
                b as f32 / 255.0,
                a as f32 / 255.0,
            ]);
        }
    }

    fn draw_triangle(&mut self, v0: u32, v1: u32, v2: u32) -> Result<(), F3DError> {
        if self.geometry_mode.contains(GeometryModes::CULL_BACK)
            && self.geometry_mode.contains(GeometryModes::CULL_FRONT)
        {
            return Ok(());
        }

        let vertices = [self.vertex(v0)?, self.vertex(v1)?, self.vertex(v2)?];

        let pipeline = self.pipeline_state();
        let input_comps = self.get_color_input_components();

        for vtx in vertices {
            self.vertex_buffer.extend(&vtx.pos);
            self.push_vertex_color_inputs(&pipeline, &input_comps, vtx.shade);
            self.num_vertices += 1;
        }
        Ok(())
    }

    fn fill_rectangle(&mut self, mut rect: Rectangle<u32>) -> Result<(), F3DError> {
        if self.color_image.is_none() {
            return Err(F3DError::MissingColorImage);
        }

        self.flush();

        if !matches!(self.cycle_type, CycleType::Fill | CycleType::Copy) {
            rect.lrx = rect.lrx.saturating_sub(1);
            rect.lry = rect.lry.saturating_sub(1);
        }

        self.push_command(RenderCommand::FillRectangle {
            rect,
            fill: self.fill_color,
        });
        Ok(())
    }

    fn interpret(&mut self, dl: M::DlIter<'_>) -> Result<(), M::Error> {
        use F3DCommand::*;

        for cmd in dl {
            match cmd? {
                NoOp | Unknown(_) => {}
                SPMatrix {
                    matrix,
                    mode,
                    op,
                    push,
                } => {
                    self.flush();
                    let fixed = read_matrix(self.memory(), matrix, 0)?;
                    let m = Matrixf::from_fixed(&fixed);
                    match mode {
                        MatrixMode::Proj => self.proj.execute(m, op, push),
                        MatrixMode::ModelView => self.model_view.execute(m, op, push),
                    }
                }
                SPViewport(ptr) => {
                    let viewport = read_viewport(self.memory(), ptr, 0)?;
                    if self.viewport != Some(viewport) {
                        self.flush();
                        self.viewport = Some(viewport);
                    }
                }
                SPLight { light, n } => {
                    let index = (n as usize).saturating_sub(1);
                    if index < NUM_LIGHT_SLOTS {
                        self.lights[index] = read_light(self.memory(), light)?;
                    }
                }
                SPVertex { v, n, v0 } => {
                    self.load_vertices(v, n, v0)?;
                }
                SPDisplayList(ptr) => {
                    let child_dl = self.memory().read_dl(ptr)?;
                    self.interpret(child_dl)?;
                }
                SPBranchList(ptr) => {
                    let child_dl = self.memory().read_dl(ptr)?;
                    self.interpret(child_dl)?;
                    break;
                }
                SPOneTriangle { v0, v1, v2, .. } => {
                    self.draw_triangle(v0, v1, v2)?;
                }
                SPPopMatrix(mode) => {
                    self.flush();
                    match mode {
                        MatrixMode::Proj => self.proj.pop()?,
                        MatrixMode::ModelView => self.model_view.pop()?,
                    }
                }
                SPNumLights(n) => {
                    self.num_dir_lights = n.min(NUM_LIGHT_SLOTS as u32 - 1);
                }
                SPEndDisplayList => break,
                SPSetGeometryMode(mode) => {
                    self.flush();
                    self.geometry_mode |= mode;
                }
                SPClearGeometryMode(mode) => {
                    self.flush();
                    self.geometry_mode &= !mode;
                }
                DPSetCycleType(v) => {
                    if self.cycle_type != v {
                        self.flush();
                        self.cycle_type = v;
                    }
                }
                DPSetColorImage(image) => {
                    self.flush();
                    self.color_image = Some(image);
                    self.push_command(RenderCommand::SetColorImage(image));
                }
                DPSetDepthImage(image) => {
                    self.flush();
                    self.depth_image = Some(image);
                    self.push_command(RenderCommand::SetDepthImage(image));
                }
                DPSetCombineMode(mode) => {
                    if self.combine_mode != mode {
                        self.flush();
                        self.combine_mode = mode;
                    }
                }
                DPSetEnvColor(color) => {
                    self.env_color = color;
                }
                DPSetPrimColor(color) => {
                    self.prim_color = color;
                }
                DPSetFillColor(fill_color) => {
                    self.fill_color = fill_color;
                }
                DPFillRectangle(rect) => {
                    self.fill_rectangle(rect)?;
                }
                DPSetScissor(mode, rect) => {
                    if self.scissor != Some((mode, rect)) {
                        self.flush();
                        self.scissor = Some((mode, rect));
                    }
                }
                DPFullSync | DPPipeSync => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::vec;

    use super::*;

    /// Display list in a buffer, with data in a big endian byte array addressed by offset.
    struct TestMemory {
        dl: Vec<F3DCommand<usize>>,
        data: Vec<u8>,
    }

    impl TestMemory {
        fn new() -> Self {
            Self {
                dl: Vec::new(),
                data: Vec::new(),
            }
        }

        fn alloc(&mut self, bytes: &[u8]) -> usize {
            let offset = self.data.len();
            self.data.extend_from_slice(bytes);
            offset
        }

        fn alloc_matrix(&mut self, m: &Matrixf) -> usize {
            let bytes: Vec<u8> = m.to_fixed().iter().flat_map(|w| w.to_be_bytes()).collect();
            self.alloc(&bytes)
        }

        fn slice(&self, offset: usize, len: usize) -> Result<&[u8], F3DError> {
            self.data
                .get(offset..offset + len)
                .ok_or(F3DError::InvalidCommand([offset as u32, len as u32]))
        }
    }

    impl F3DMemory for TestMemory {
        type Ptr = usize;
        type Error = F3DError;
        type DlIter<'a> = vec::IntoIter<Result<F3DCommand<usize>, F3DError>> where Self: 'a;

        fn root_dl(&self) -> Result<Self::DlIter<'_>, Self::Error> {
            let cmds: Vec<_> = self.dl.iter().map(|&cmd| Ok(cmd)).collect();
            Ok(cmds.into_iter())
        }

        fn read_dl(&self, _ptr: Self::Ptr) -> Result<Self::DlIter<'_>, Self::Error> {
            Err(F3DError::InvalidCommand([0x0600_0000, 0]))
        }

        fn read_u8(&self, dst: &mut [u8], ptr: usize, offset: usize) -> Result<(), F3DError> {
            dst.copy_from_slice(self.slice(ptr + offset, dst.len())?);
            Ok(())
        }

        fn read_u16(&self, dst: &mut [u16], ptr: usize, offset: usize) -> Result<(), F3DError> {
            let src = self.slice(ptr + offset, dst.len() * 2)?;
            for (d, s) in dst.iter_mut().zip(src.chunks_exact(2)) {
                *d = u16::from_be_bytes([s[0], s[1]]);
            }
            Ok(())
        }

        fn read_u32(&self, dst: &mut [u32], ptr: usize, offset: usize) -> Result<(), F3DError> {
            let src = self.slice(ptr + offset, dst.len() * 4)?;
            for (d, s) in dst.iter_mut().zip(src.chunks_exact(4)) {
                *d = u32::from_be_bytes([s[0], s[1], s[2], s[3]]);
            }
            Ok(())
        }
    }

    fn vertex_bytes(vertices: &[([i16; 3], [u8; 4])]) -> Vec<u8> {
        vertices
            .iter()
            .flat_map(|&(pos, cn)| {
                Vertex {
                    pos,
                    cn,
                    ..Default::default()
                }
                .to_bytes()
            })
            .collect()
    }

    fn shade_combine() -> F3DCommand<usize> {
        F3DCommand::DPSetCombineMode(CombineMode::one_cycle(
            ColorCombineComponent::Shade.into(),
            ColorCombineComponent::Shade.into(),
        ))
    }

    fn color_image() -> F3DCommand<usize> {
        F3DCommand::DPSetColorImage(Image {
            fmt: ImageFormat::Rgba,
            size: ComponentSize::Bits16,
            width: 320,
            img: 0,
        })
    }

    #[test]
    fn test_fill_rectangle_in_fill_mode() {
        let mut memory = TestMemory::new();
        memory.dl = vec![
            color_image(),
            F3DCommand::DPSetCycleType(CycleType::Fill),
            F3DCommand::DPSetFillColor([FillColor(0xFFFF), FillColor(0xFFFF)]),
            F3DCommand::DPFillRectangle(Rectangle {
                ulx: 0,
                uly: 0,
                lrx: 319,
                lry: 239,
            }),
        ];
        let data = interpret_f3d_display_list(&memory, [320, 240]).unwrap();
        assert_eq!(
            data.commands.last(),
            Some(&RenderCommand::FillRectangle {
                rect: Rectangle {
                    ulx: 0,
                    uly: 0,
                    lrx: 319,
                    lry: 239,
                },
                fill: [FillColor(0xFFFF), FillColor(0xFFFF)],
            })
        );
    }

    #[test]
    fn test_fill_without_color_image() {
        let mut memory = TestMemory::new();
        memory.dl = vec![F3DCommand::DPFillRectangle(Rectangle::default())];
        assert_eq!(
            interpret_f3d_display_list(&memory, [320, 240]),
            Err(F3DError::MissingColorImage)
        );
    }

    #[test]
    fn test_unlit_triangle_uses_vertex_colors() {
        let mut memory = TestMemory::new();
        let identity = memory.alloc_matrix(&Matrixf::identity());
        let v = memory.alloc(&vertex_bytes(&[
            ([0, 0, 0], [255, 0, 0, 255]),
            ([1, 0, 0], [0, 255, 0, 255]),
            ([0, 1, 0], [0, 0, 255, 255]),
        ]));
        memory.dl = vec![
            color_image(),
            F3DCommand::SPMatrix {
                matrix: identity,
                mode: MatrixMode::Proj,
                op: MatrixOp::Load,
                push: false,
            },
            shade_combine(),
            F3DCommand::SPVertex { v, n: 3, v0: 4 },
            F3DCommand::SPOneTriangle {
                v0: 4,
                v1: 5,
                v2: 6,
                flag: 0,
            },
        ];

        let data = interpret_f3d_display_list(&memory, [320, 240]).unwrap();
        let draws: Vec<_> = data.draw_commands().collect();
        assert_eq!(draws.len(), 1);

        let draw = draws[0];
        assert_eq!(draw.num_vertices, 3);
        assert_eq!(draw.pipeline.num_inputs, 1);
        assert_eq!(draw.vertex_buffer.len(), 3 * draw.pipeline.vertex_stride());
        // Second vertex: pos (1, 0, 0, 1), color green.
        assert_eq!(&draw.vertex_buffer[8..16], &[1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_lighting_with_ambient_only() {
        let mut memory = TestMemory::new();
        let ambient = memory.alloc(&Light::new([40, 50, 60], [0.0, 0.0, 0.0]).to_bytes());
        let v = memory.alloc(&vertex_bytes(&[
            ([0, 0, 0], [0, 127, 0, 255]),
            ([1, 0, 0], [0, 127, 0, 255]),
            ([0, 1, 0], [0, 127, 0, 255]),
        ]));
        memory.dl = vec![
            color_image(),
            F3DCommand::SPSetGeometryMode(GeometryModes::LIGHTING),
            F3DCommand::SPNumLights(0),
            F3DCommand::SPLight {
                light: ambient,
                n: 1,
            },
            shade_combine(),
            F3DCommand::SPVertex { v, n: 3, v0: 0 },
            F3DCommand::SPOneTriangle {
                v0: 0,
                v1: 1,
                v2: 2,
                flag: 0,
            },
        ];

        let data = interpret_f3d_display_list(&memory, [320, 240]).unwrap();
        let draw = data.draw_commands().next().unwrap();
        let expected = [40.0 / 255.0, 50.0 / 255.0, 60.0 / 255.0];
        assert_eq!(&draw.vertex_buffer[4..7], &expected);
    }

    #[test]
    fn test_directional_light_adds_to_ambient() {
        let mut memory = TestMemory::new();
        let sun = memory.alloc(&Light::new([100, 100, 100], [0.0, 1.0, 0.0]).to_bytes());
        let ambient = memory.alloc(&Light::new([20, 20, 20], [0.0, 0.0, 0.0]).to_bytes());
        let v = memory.alloc(&vertex_bytes(&[
            ([0, 0, 0], [0, 127, 0, 255]),
            ([1, 0, 0], [0, 0x81, 0, 255]),
            ([0, 1, 0], [0, 127, 0, 255]),
        ]));
        memory.dl = vec![
            color_image(),
            F3DCommand::SPSetGeometryMode(GeometryModes::LIGHTING),
            F3DCommand::SPNumLights(1),
            F3DCommand::SPLight { light: sun, n: 1 },
            F3DCommand::SPLight {
                light: ambient,
                n: 2,
            },
            shade_combine(),
            F3DCommand::SPVertex { v, n: 3, v0: 0 },
            F3DCommand::SPOneTriangle {
                v0: 0,
                v1: 1,
                v2: 2,
                flag: 0,
            },
        ];

        let data = interpret_f3d_display_list(&memory, [320, 240]).unwrap();
        let draw = data.draw_commands().next().unwrap();
        let stride = draw.pipeline.vertex_stride();
        // Facing the light: ambient + full directional. Facing away: ambient only.
        assert_eq!(draw.vertex_buffer[4], 120.0 / 255.0);
        assert_eq!(draw.vertex_buffer[stride + 4], 20.0 / 255.0);
    }

    #[test]
    fn test_triangle_with_unloaded_vertex() {
        let mut memory = TestMemory::new();
        memory.dl = vec![
            color_image(),
            F3DCommand::SPOneTriangle {
                v0: 0,
                v1: 1,
                v2: 2,
                flag: 0,
            },
        ];
        assert_eq!(
            interpret_f3d_display_list(&memory, [320, 240]),
            Err(F3DError::InvalidVertexIndex(0))
        );
    }

    #[test]
    fn test_pop_without_push() {
        let mut memory = TestMemory::new();
        memory.dl = vec![F3DCommand::SPPopMatrix(MatrixMode::ModelView)];
        assert_eq!(
            interpret_f3d_display_list(&memory, [320, 240]),
            Err(F3DError::MatrixStackUnderflow)
        );
    }
}
