use crate::cmd::{FillColor, Image, Rectangle};

/// An object containing processed render data from a display list.
///
/// Vertices are transformed to clip space, and shading inputs are already evaluated
/// per vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct F3DRenderData<Ptr> {
    /// The screen size in pixels.
    pub screen_size: [u32; 2],
    /// The render commands to execute, in order.
    pub commands: Vec<RenderCommand<Ptr>>,
}

impl<Ptr> F3DRenderData<Ptr> {
    /// Create an empty F3DRenderData.
    pub fn new(screen_size: [u32; 2]) -> Self {
        Self {
            screen_size,
            commands: Vec::new(),
        }
    }

    /// Iterates over the draw calls, skipping other commands.
    pub fn draw_commands(&self) -> impl Iterator<Item = &DrawCommand<Vec<f32>>> {
        self.commands.iter().filter_map(|cmd| match cmd {
            RenderCommand::Draw(draw) => Some(draw),
            _ => None,
        })
    }
}

/// A single operation on the attached color or depth image.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand<Ptr> {
    /// Subsequent commands write to this color image.
    SetColorImage(Image<Ptr>),
    /// Subsequent depth tests use this depth image.
    SetDepthImage(Ptr),
    /// Fill a rectangle (in pixels, inclusive of the lower right corner) of the color image
    /// with the fill pattern.
    ///
    /// For 16 bit images, even and odd pixels use the first and second fill color. When the
    /// color image is the depth image, this clears the depth buffer.
    FillRectangle {
        rect: Rectangle<u32>,
        fill: [FillColor; 2],
    },
    /// Draw a triangle list.
    Draw(DrawCommand<Vec<f32>>),
}

/// The pipeline state used for a draw call.
///
/// The vertex attributes are:
/// - vec4 pos (clip space)
/// - for i in 0..num_inputs: vec4 input_i
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PipelineInfo {
    /// Face cull mode.
    pub cull_mode: CullMode,
    /// Enable standard depth buffer compare.
    pub depth_compare: bool,
    /// Enable updates to the depth buffer.
    pub depth_write: bool,
    /// The number of vec4 inputs after pos.
    pub num_inputs: u32,
    /// Expression for calculating fragment output color.
    pub output_color: ColorExpr,
}

impl PipelineInfo {
    /// The number of floats per vertex in a vertex buffer using this pipeline.
    pub fn vertex_stride(&self) -> usize {
        4 + 4 * self.num_inputs as usize
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

impl Default for CullMode {
    fn default() -> Self {
        Self::None
    }
}

/// An expression for the fragment color output.
///
/// Each field is an array with four per-fragment values. Each element
/// corresponds to a vector of length 4, and they are combined as follows:
///
/// [a, b, c, d] -> (a - b) * c + d
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorExpr {
    /// Expression for calculating rgb. (Truncate to vec3 after evaluating the vec4 expression.)
    pub rgb: [ColorArg; 4],
    /// Expression for calculating alpha. (Take .a after evaluating the vec4 expression.)
    pub a: [ColorArg; 4],
}

impl ColorExpr {
    /// Evaluates the expression for one fragment given its interpolated inputs.
    pub fn eval(&self, inputs: &[[f32; 4]]) -> [f32; 4] {
        let arg = |arg: ColorArg| match arg {
            ColorArg::Zero => [0.0; 4],
            ColorArg::Input(i) => inputs.get(i as usize).copied().unwrap_or([0.0; 4]),
        };
        let combine = |args: [ColorArg; 4], i: usize| {
            let [a, b, c, d] = args.map(|a| arg(a)[i]);
            ((a - b) * c + d).clamp(0.0, 1.0)
        };
        [
            combine(self.rgb, 0),
            combine(self.rgb, 1),
            combine(self.rgb, 2),
            combine(self.a, 3),
        ]
    }
}

/// An argument to [ColorExpr].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorArg {
    /// (0, 0, 0, 0)
    Zero,
    /// The i-th vertex input (after pos).
    Input(u32),
}

impl Default for ColorArg {
    fn default() -> Self {
        Self::Zero
    }
}

/// One triangle list draw call.
///
/// See [PipelineInfo] for details.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand<B> {
    pub viewport: ScreenRectangle,
    pub scissor: ScreenRectangle,
    pub pipeline: PipelineInfo,
    pub vertex_buffer: B,
    pub num_vertices: u32,
}

/// A rectangle in screen space.
///
/// The upper left corner is (0, 0) and the lower right corner is (screen width, screen height).
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScreenRectangle {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}
