use super::frame::{FrameScheduler, FrameTask};
use super::gl::{load_shader_program, Gpu, ShaderError};
use super::math::Vec2;
use anyhow::Result;
use log::{debug, error, warn};
use std::time::{Duration, Instant};

/// Screen-filling quad, drawn as a triangle strip.
pub const QUAD: [[f32; 2]; 4] = [[-1.0, 1.0], [1.0, 1.0], [-1.0, -1.0], [1.0, -1.0]];

pub const ATTR_POSITION: &str = "a_position";
pub const UNIFORM_TIME: &str = "u_time";
pub const UNIFORM_RESOLUTION: &str = "u_resolution";
pub const UNIFORM_SCROLL_TOP: &str = "u_scrolltop";
pub const UNIFORM_MOUSE_POS: &str = "u_mousepos";

/// The surface the driver renders into.
pub trait Canvas {
    /// Backing store size in pixels.
    fn size(&self) -> [u32; 2];
    fn resize(&mut self, size: [u32; 2]) -> Result<()>;
    /// Hand the finished frame to the compositor.
    fn present(&mut self) -> Result<()>;
}

/// Per-frame state read from outside the driver.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs {
    pub now: Instant,
    pub scroll_top: f32,
    pub pointer: Vec2,
}

#[derive(Debug, Clone, Copy)]
pub struct DriverOptions {
    /// Added to the elapsed time so motion is already underway on the first frame.
    pub time_offset: Duration,
    pub clear_color: [f32; 4],
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            time_offset: Duration::from_millis(6000),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

struct UniformSlots<L> {
    time: Option<L>,
    resolution: Option<L>,
    scroll_top: Option<L>,
    mouse_pos: Option<L>,
}

struct Pipeline<G: Gpu> {
    program: G::Program,
    vbo: G::Buffer,
    a_position: u32,
    uniforms: UniformSlots<G::UniformLocation>,
}

/// Owns the GL context and canvas and keeps a single self-scheduling render loop alive.
pub struct FrameDriver<G: Gpu, C: Canvas> {
    gpu: G,
    canvas: C,
    pipeline: Option<Pipeline<G>>,
    shader_error: Option<ShaderError>,
    options: DriverOptions,
    started: Instant,
    frame_scheduled: bool,
}

impl<G: Gpu, C: Canvas> FrameDriver<G, C> {
    /// Never fails: a broken shader leaves the driver clearing the canvas and nothing else.
    pub fn new(gpu: G, canvas: C, vert_src: &str, frag_src: &str, options: DriverOptions) -> Self {
        let (pipeline, shader_error) = match Self::build_pipeline(&gpu, vert_src, frag_src) {
            Ok(pipeline) => (Some(pipeline), None),
            Err(err) => {
                warn!("Shader program unusable, background will stay blank: {}", err);
                (None, Some(err))
            }
        };

        Self {
            gpu,
            canvas,
            pipeline,
            shader_error,
            options,
            started: Instant::now(),
            frame_scheduled: false,
        }
    }

    fn build_pipeline(gpu: &G, vert_src: &str, frag_src: &str) -> Result<Pipeline<G>, ShaderError> {
        let program = load_shader_program(gpu, vert_src, frag_src)?;

        let Some(a_position) = gpu.attrib_location(program, ATTR_POSITION) else {
            gpu.delete_program(program);
            error!("Shader program does not declare attribute {}", ATTR_POSITION);
            return Err(ShaderError::MissingAttribute { name: ATTR_POSITION });
        };

        let vbo = match gpu.create_vertex_buffer(bytemuck::cast_slice(&QUAD)) {
            Ok(vbo) => vbo,
            Err(reason) => {
                gpu.delete_program(program);
                error!("Failed to create vertex buffer: {}", reason);
                return Err(ShaderError::Create { what: "vertex buffer", reason });
            }
        };

        let uniforms = UniformSlots {
            time: gpu.uniform_location(program, UNIFORM_TIME),
            resolution: gpu.uniform_location(program, UNIFORM_RESOLUTION),
            scroll_top: gpu.uniform_location(program, UNIFORM_SCROLL_TOP),
            mouse_pos: gpu.uniform_location(program, UNIFORM_MOUSE_POS),
        };

        Ok(Pipeline {
            program,
            vbo,
            a_position,
            uniforms,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn shader_error(&self) -> Option<&ShaderError> {
        self.shader_error.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn frame_scheduled(&self) -> bool {
        self.frame_scheduled
    }

    #[cfg(test)]
    pub(crate) fn canvas(&self) -> &C {
        &self.canvas
    }

    #[cfg(test)]
    pub(crate) fn gpu(&self) -> &G {
        &self.gpu
    }

    /// Milliseconds reported to the shader as `u_time`.
    pub fn elapsed_ms(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.started) + self.options.time_offset;
        (elapsed.as_secs_f64() * 1000.0) as f32
    }

    /// Render one frame and make sure exactly one follow-up frame is pending.
    pub fn draw(&mut self, inputs: &FrameInputs, frames: &mut impl FrameScheduler) -> Result<()> {
        self.gpu.clear(self.options.clear_color);

        if let Some(pipeline) = &self.pipeline {
            let [width, height] = self.canvas.size();
            let time = self.elapsed_ms(inputs.now);
            let gpu = &self.gpu;

            gpu.bind_vertices(pipeline.program, pipeline.vbo, pipeline.a_position, 2);
            gpu.uniform_1f(pipeline.uniforms.time.as_ref(), time);
            gpu.uniform_2f(pipeline.uniforms.resolution.as_ref(), width as f32, height as f32);
            gpu.uniform_1f(pipeline.uniforms.scroll_top.as_ref(), inputs.scroll_top);
            gpu.uniform_2f(
                pipeline.uniforms.mouse_pos.as_ref(),
                inputs.pointer.x,
                inputs.pointer.y,
            );
            gpu.draw_triangle_strip(QUAD.len() as i32);

            // Requested before present so the callback rides on this commit.
            if !self.frame_scheduled {
                self.frame_scheduled = true;
                frames.request_frame(FrameTask::Render);
            }
        }

        self.canvas.present()
    }

    /// The pending render frame arrived.
    pub fn on_frame(&mut self, inputs: &FrameInputs, frames: &mut impl FrameScheduler) -> Result<()> {
        self.frame_scheduled = false;
        self.draw(inputs, frames)
    }

    /// Match the canvas and viewport to `size` and redraw right away.
    pub fn resize(&mut self, size: [u32; 2], inputs: &FrameInputs, frames: &mut impl FrameScheduler) -> Result<()> {
        debug!("Resizing canvas to {}x{}", size[0], size[1]);
        self.canvas.resize(size)?;
        self.gpu.viewport(0, 0, size[0] as i32, size[1] as i32);
        self.gpu.clear(self.options.clear_color);
        self.draw(inputs, frames)
    }
}

impl<G: Gpu, C: Canvas> Drop for FrameDriver<G, C> {
    fn drop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            self.gpu.delete_buffer(pipeline.vbo);
            self.gpu.delete_program(pipeline.program);
        }
    }
}
