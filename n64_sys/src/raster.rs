//! Software rasterizer for [F3DRenderData].
//!
//! Pixels are written directly into the color and depth images in RDRAM. Triangles are
//! clipped against the near plane, then filled with an edge function test over their
//! bounding box. Shading inputs are interpolated linearly in screen space, as the RDP does.

use fast3d::{
    cmd::{ComponentSize, FillColor, Image, Rectangle},
    interpret::{CullMode, DrawCommand, F3DRenderData, RenderCommand, ScreenRectangle},
    util::rgba_32_to_16,
};
use tracing::trace;

use crate::{Pointer, Rdram, SysError};

/// The depth value written by a depth buffer clear (14 bit z at its maximum, dz = 0).
pub const DEPTH_CLEAR: u16 = 0xFFFC;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RasterStats {
    pub fills: u32,
    pub triangles_drawn: u32,
    pub triangles_culled: u32,
}

/// Executes render commands, writing into RDRAM.
pub fn execute(
    rdram: &mut Rdram,
    render_data: &F3DRenderData<Pointer>,
) -> Result<RasterStats, SysError> {
    let mut rasterizer = Rasterizer {
        rdram,
        height: render_data.screen_size[1],
        color_image: None,
        depth_image: None,
        stats: RasterStats::default(),
    };

    for cmd in &render_data.commands {
        match cmd {
            RenderCommand::SetColorImage(image) => {
                rasterizer.color_image = Some(ColorImage::new(image)?);
            }
            RenderCommand::SetDepthImage(ptr) => {
                rasterizer.depth_image = Some(ptr.rdram()?);
            }
            RenderCommand::FillRectangle { rect, fill } => {
                rasterizer.fill_rectangle(*rect, *fill)?;
            }
            RenderCommand::Draw(draw) => {
                rasterizer.draw(draw)?;
            }
        }
    }

    trace!("raster: {:?}", rasterizer.stats);
    Ok(rasterizer.stats)
}

#[derive(Debug, Clone, Copy)]
struct ColorImage {
    addr: u32,
    width: u32,
    bytes_per_pixel: u32,
}

impl ColorImage {
    fn new(image: &Image<Pointer>) -> Result<Self, SysError> {
        let bytes_per_pixel = match image.size {
            ComponentSize::Bits32 => 4,
            _ => 2,
        };
        Ok(Self {
            addr: image.img.rdram()?,
            width: image.width,
            bytes_per_pixel,
        })
    }
}

#[derive(Debug)]
struct Rasterizer<'r> {
    rdram: &'r mut Rdram,
    height: u32,
    color_image: Option<ColorImage>,
    depth_image: Option<u32>,
    stats: RasterStats,
}

/// A vertex after perspective division, in pixels.
#[derive(Debug, Clone)]
struct ScreenVertex {
    x: f32,
    y: f32,
    z: f32,
    inputs: Vec<[f32; 4]>,
}

fn edge(v0: (f32, f32), v1: (f32, f32), p: (f32, f32)) -> f32 {
    (v1.0 - v0.0) * (p.1 - v0.1) - (v1.1 - v0.1) * (p.0 - v0.0)
}

/// Sutherland-Hodgman clip of a polygon against z >= -w.
fn clip_near(polygon: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let dist = |v: &[f32]| v[2] + v[3];
    let mut out = Vec::new();
    for i in 0..polygon.len() {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % polygon.len()];
        let (da, db) = (dist(a), dist(b));
        if da >= 0.0 {
            out.push(a.clone());
        }
        if (da >= 0.0) != (db >= 0.0) {
            let t = da / (da - db);
            out.push(a.iter().zip(b).map(|(x, y)| x + (y - x) * t).collect());
        }
    }
    out
}

impl<'r> Rasterizer<'r> {
    fn color_image(&self) -> Result<ColorImage, SysError> {
        self.color_image
            .ok_or_else(|| fast3d::F3DError::MissingColorImage.into())
    }

    fn fill_rectangle(&mut self, rect: Rectangle<u32>, fill: [FillColor; 2]) -> Result<(), SysError> {
        let image = self.color_image()?;
        if image.width == 0 || self.height == 0 {
            return Ok(());
        }
        let lrx = rect.lrx.min(image.width - 1);
        let lry = rect.lry.min(self.height - 1);
        if rect.ulx > lrx || rect.uly > lry {
            return Ok(());
        }

        let wide = ((fill[0].0 as u32) << 16 | fill[1].0 as u32).to_be_bytes();
        for y in rect.uly..=lry {
            let row_addr = image.addr + (y * image.width + rect.ulx) * image.bytes_per_pixel;
            let len = ((lrx - rect.ulx + 1) * image.bytes_per_pixel) as usize;
            let row = self.rdram.slice_mut(row_addr, len)?;
            match image.bytes_per_pixel {
                4 => {
                    for px in row.chunks_exact_mut(4) {
                        px.copy_from_slice(&wide);
                    }
                }
                _ => {
                    for (i, px) in row.chunks_exact_mut(2).enumerate() {
                        let x = rect.ulx + i as u32;
                        px.copy_from_slice(&fill[(x % 2) as usize].0.to_be_bytes());
                    }
                }
            }
        }
        self.stats.fills += 1;
        Ok(())
    }

    fn draw(&mut self, draw: &DrawCommand<Vec<f32>>) -> Result<(), SysError> {
        let image = self.color_image()?;
        let pipeline = &draw.pipeline;
        let stride = pipeline.vertex_stride();

        let use_depth = (pipeline.depth_compare || pipeline.depth_write) && self.depth_image.is_some();
        let depth_len = (image.width * self.height) as usize;
        let mut depth = vec![DEPTH_CLEAR; if use_depth { depth_len } else { 0 }];
        if let (true, Some(addr)) = (use_depth, self.depth_image) {
            self.rdram.read_u16s(addr, &mut depth)?;
        }

        let bounds = self.clip_bounds(image, draw.scissor);

        for tri in draw.vertex_buffer.chunks_exact(stride * 3) {
            let polygon: Vec<Vec<f32>> = tri.chunks_exact(stride).map(|v| v.to_vec()).collect();
            let clipped = clip_near(&polygon);
            if clipped.len() < 3 {
                self.stats.triangles_culled += 1;
                continue;
            }

            let screen: Vec<ScreenVertex> = clipped
                .iter()
                .map(|v| to_screen(v, draw.viewport, pipeline.num_inputs as usize))
                .collect();
            for i in 1..screen.len() - 1 {
                let verts = [&screen[0], &screen[i], &screen[i + 1]];
                if self.fill_triangle(image, bounds, draw, verts, &mut depth)? {
                    self.stats.triangles_drawn += 1;
                } else {
                    self.stats.triangles_culled += 1;
                }
            }
        }

        if let (true, Some(addr)) = (use_depth && pipeline.depth_write, self.depth_image) {
            self.rdram.write_u16s(addr, &depth)?;
        }
        Ok(())
    }

    /// Pixel bounds (exclusive) from the scissor rectangle and image size.
    fn clip_bounds(&self, image: ColorImage, scissor: ScreenRectangle) -> [i32; 4] {
        [
            scissor.x.max(0),
            scissor.y.max(0),
            (scissor.x + scissor.w).min(image.width as i32),
            (scissor.y + scissor.h).min(self.height as i32),
        ]
    }

    /// Returns false if the triangle was culled.
    fn fill_triangle(
        &mut self,
        image: ColorImage,
        bounds: [i32; 4],
        draw: &DrawCommand<Vec<f32>>,
        [v0, v1, v2]: [&ScreenVertex; 3],
        depth: &mut [u16],
    ) -> Result<bool, SysError> {
        let pipeline = &draw.pipeline;
        let p0 = (v0.x, v0.y);
        let p1 = (v1.x, v1.y);
        let p2 = (v2.x, v2.y);

        // Screen y points down, so counterclockwise triangles have negative area.
        let area = edge(p0, p1, p2);
        let culled = match pipeline.cull_mode {
            CullMode::None => false,
            CullMode::Back => area > 0.0,
            CullMode::Front => area < 0.0,
        };
        if culled || area == 0.0 {
            return Ok(false);
        }

        let min_x = (v0.x.min(v1.x).min(v2.x).floor() as i32).max(bounds[0]);
        let min_y = (v0.y.min(v1.y).min(v2.y).floor() as i32).max(bounds[1]);
        let max_x = (v0.x.max(v1.x).max(v2.x).ceil() as i32).min(bounds[2]);
        let max_y = (v0.y.max(v1.y).max(v2.y).ceil() as i32).min(bounds[3]);
        if min_x >= max_x || min_y >= max_y {
            return Ok(true);
        }

        let num_inputs = pipeline.num_inputs as usize;
        let mut inputs = vec![[0.0; 4]; num_inputs];

        for y in min_y..max_y {
            let row_addr = image.addr + (y as u32 * image.width) * image.bytes_per_pixel;
            let row = self
                .rdram
                .slice_mut(row_addr, (image.width * image.bytes_per_pixel) as usize)?;

            for x in min_x..max_x {
                let p = (x as f32 + 0.5, y as f32 + 0.5);
                let b0 = edge(p1, p2, p) / area;
                let b1 = edge(p2, p0, p) / area;
                let b2 = edge(p0, p1, p) / area;
                if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 {
                    continue;
                }

                let depth_index = (y as u32 * image.width + x as u32) as usize;
                if !depth.is_empty() {
                    let z = b0 * v0.z + b1 * v1.z + b2 * v2.z;
                    let z16 = ((z.clamp(0.0, 1.0) * 0x3FFF as f32) as u16) << 2;
                    if pipeline.depth_compare && z16 >= depth[depth_index] {
                        continue;
                    }
                    if pipeline.depth_write {
                        depth[depth_index] = z16;
                    }
                }

                for i in 0..num_inputs {
                    for c in 0..4 {
                        inputs[i][c] =
                            b0 * v0.inputs[i][c] + b1 * v1.inputs[i][c] + b2 * v2.inputs[i][c];
                    }
                }
                let color = pipeline.output_color.eval(&inputs);
                let rgba = color.map(|c| (c * 255.0).round() as u8);

                let offset = (x as u32 * image.bytes_per_pixel) as usize;
                match image.bytes_per_pixel {
                    4 => row[offset..offset + 4].copy_from_slice(&rgba),
                    _ => row[offset..offset + 2].copy_from_slice(&rgba_32_to_16(rgba).to_be_bytes()),
                }
            }
        }
        Ok(true)
    }
}

fn to_screen(v: &[f32], viewport: ScreenRectangle, num_inputs: usize) -> ScreenVertex {
    let w = v[3];
    let (nx, ny, nz) = (v[0] / w, v[1] / w, v[2] / w);
    ScreenVertex {
        x: viewport.x as f32 + (nx * 0.5 + 0.5) * viewport.w as f32,
        y: viewport.y as f32 + (0.5 - ny * 0.5) * viewport.h as f32,
        z: nz * 0.5 + 0.5,
        inputs: (0..num_inputs)
            .map(|i| [v[4 + 4 * i], v[5 + 4 * i], v[6 + 4 * i], v[7 + 4 * i]])
            .collect(),
    }
}

#[cfg(test)]
mod test {
    use fast3d::{
        cmd::ImageFormat,
        interpret::{ColorArg, ColorExpr, PipelineInfo},
    };

    use super::*;

    const W: u32 = 8;
    const H: u32 = 8;

    fn setup() -> (Rdram, u32, u32) {
        let mut rdram = Rdram::new(0x4000);
        let color = rdram.alloc_uncached((W * H * 2) as usize).unwrap();
        let depth = rdram.alloc_uncached((W * H * 2) as usize).unwrap();
        (rdram, color, depth)
    }

    fn image(addr: u32) -> RenderCommand<Pointer> {
        RenderCommand::SetColorImage(Image {
            fmt: ImageFormat::Rgba,
            size: ComponentSize::Bits16,
            width: W,
            img: Pointer::Rdram(addr),
        })
    }

    fn fill(color: u16) -> RenderCommand<Pointer> {
        RenderCommand::FillRectangle {
            rect: Rectangle {
                ulx: 0,
                uly: 0,
                lrx: W - 1,
                lry: H - 1,
            },
            fill: [FillColor(color), FillColor(color)],
        }
    }

    fn full_screen() -> ScreenRectangle {
        ScreenRectangle {
            x: 0,
            y: 0,
            w: W as i32,
            h: H as i32,
        }
    }

    /// A red triangle covering the lower left half of the screen, at the given depth.
    fn triangle(cull_mode: CullMode, z: f32, counterclockwise: bool) -> RenderCommand<Pointer> {
        let red = [1.0, 0.0, 0.0, 1.0];
        let mut corners = vec![[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0]];
        if !counterclockwise {
            corners.swap(1, 2);
        }
        let mut vertex_buffer = Vec::new();
        for [x, y] in corners {
            vertex_buffer.extend([x, y, z, 1.0]);
            vertex_buffer.extend(red);
        }
        RenderCommand::Draw(DrawCommand {
            viewport: full_screen(),
            scissor: full_screen(),
            pipeline: PipelineInfo {
                cull_mode,
                depth_compare: true,
                depth_write: true,
                num_inputs: 1,
                output_color: ColorExpr {
                    rgb: [ColorArg::Zero, ColorArg::Zero, ColorArg::Zero, ColorArg::Input(0)],
                    a: [ColorArg::Zero, ColorArg::Zero, ColorArg::Zero, ColorArg::Input(0)],
                },
            },
            vertex_buffer,
            num_vertices: 3,
        })
    }

    fn pixel(rdram: &Rdram, addr: u32, x: u32, y: u32) -> u16 {
        let mut px = [0];
        rdram.read_u16s(addr + (y * W + x) * 2, &mut px).unwrap();
        px[0]
    }

    fn run(rdram: &mut Rdram, commands: Vec<RenderCommand<Pointer>>) -> RasterStats {
        let render_data = F3DRenderData {
            screen_size: [W, H],
            commands,
        };
        execute(rdram, &render_data).unwrap()
    }

    #[test]
    fn test_clear_and_triangle() {
        let (mut rdram, color, depth) = setup();
        let stats = run(
            &mut rdram,
            vec![
                image(depth),
                fill(DEPTH_CLEAR),
                image(color),
                RenderCommand::SetDepthImage(Pointer::Rdram(depth)),
                fill(0xFFFF),
                triangle(CullMode::Back, 0.0, true),
            ],
        );
        assert_eq!(stats.triangles_drawn, 1);
        assert_eq!(pixel(&rdram, depth, 7, 0), DEPTH_CLEAR);

        // Lower left is inside, upper right keeps the clear color.
        assert_eq!(pixel(&rdram, color, 0, 7), 0xF801);
        assert_eq!(pixel(&rdram, color, 7, 0), 0xFFFF);
        assert!(pixel(&rdram, depth, 0, 7) < DEPTH_CLEAR);
    }

    #[test]
    fn test_back_face_culled() {
        let (mut rdram, color, depth) = setup();
        let stats = run(
            &mut rdram,
            vec![
                image(color),
                RenderCommand::SetDepthImage(Pointer::Rdram(depth)),
                fill(0xFFFF),
                triangle(CullMode::Back, 0.0, false),
            ],
        );
        assert_eq!(stats.triangles_drawn, 0);
        assert_eq!(stats.triangles_culled, 1);
        assert_eq!(pixel(&rdram, color, 0, 7), 0xFFFF);
    }

    #[test]
    fn test_depth_test_rejects_farther() {
        let (mut rdram, color, depth) = setup();
        let mut far = triangle(CullMode::None, 0.5, true);
        if let RenderCommand::Draw(draw) = &mut far {
            for v in draw.vertex_buffer.chunks_exact_mut(8) {
                v[4..8].copy_from_slice(&[0.0, 0.0, 1.0, 1.0]);
            }
        }
        run(
            &mut rdram,
            vec![
                image(depth),
                fill(DEPTH_CLEAR),
                image(color),
                RenderCommand::SetDepthImage(Pointer::Rdram(depth)),
                triangle(CullMode::None, 0.0, true),
                far,
            ],
        );
        // The blue triangle is behind the red one.
        assert_eq!(pixel(&rdram, color, 0, 7), 0xF801);
    }

    #[test]
    fn test_near_plane_clipping() {
        let (mut rdram, color, depth) = setup();
        let mut tri = triangle(CullMode::None, 0.0, true);
        if let RenderCommand::Draw(draw) = &mut tri {
            // Push the top vertex behind the camera.
            draw.vertex_buffer[8 * 2 + 2] = -3.0;
        }
        let stats = run(
            &mut rdram,
            vec![
                image(color),
                RenderCommand::SetDepthImage(Pointer::Rdram(depth)),
                tri,
            ],
        );
        // Clipping a corner leaves a quad, drawn as two triangles.
        assert_eq!(stats.triangles_drawn, 2);
    }

    #[test]
    fn test_fill_without_image() {
        let (mut rdram, _, _) = setup();
        let render_data = F3DRenderData {
            screen_size: [W, H],
            commands: vec![fill(0)],
        };
        assert!(execute(&mut rdram, &render_data).is_err());
    }
}
