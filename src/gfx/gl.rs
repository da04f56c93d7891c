use glow::HasContext;
use log::error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShaderError {
    #[error("{stage} shader compilation failed: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("program linking failed: {log}")]
    Link { log: String },
    #[error("shader program has no attribute {name}")]
    MissingAttribute { name: &'static str },
    #[error("failed to create {what}: {reason}")]
    Create { what: &'static str, reason: String },
}

/// The slice of OpenGL ES 2 the background renderer talks to.
///
/// Implementations assume their context is current on the calling thread.
pub trait Gpu {
    type Shader: Copy;
    type Program: Copy;
    type Buffer: Copy;
    type UniformLocation;

    /// Create a shader object, attach `source` and compile it.
    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<Self::Shader, String>;
    fn shader_compiled(&self, shader: Self::Shader) -> bool;
    fn shader_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    /// Create a program, attach both shaders and link.
    fn create_program(&self, vertex: Self::Shader, fragment: Self::Shader) -> Result<Self::Program, String>;
    fn program_linked(&self, program: Self::Program) -> bool;
    fn program_log(&self, program: Self::Program) -> String;
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn delete_program(&self, program: Self::Program);

    fn create_vertex_buffer(&self, data: &[u8]) -> Result<Self::Buffer, String>;
    fn delete_buffer(&self, buffer: Self::Buffer);

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation>;
    fn attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;

    /// Bind `program`, `buffer` and a tightly packed float attribute.
    fn bind_vertices(&self, program: Self::Program, buffer: Self::Buffer, attrib: u32, components: i32);
    fn uniform_1f(&self, location: Option<&Self::UniformLocation>, value: f32);
    fn uniform_2f(&self, location: Option<&Self::UniformLocation>, x: f32, y: f32);

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear(&self, color: [f32; 4]);
    fn draw_triangle_strip(&self, vertex_count: i32);
}

impl Gpu for glow::Context {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Buffer = glow::Buffer;
    type UniformLocation = glow::UniformLocation;

    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<glow::Shader, String> {
        let shader_type = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = HasContext::create_shader(self, shader_type)?;
            self.shader_source(shader, source);
            self.compile_shader(shader);
            Ok(shader)
        }
    }

    fn shader_compiled(&self, shader: glow::Shader) -> bool {
        unsafe { self.get_shader_compile_status(shader) }
    }

    fn shader_log(&self, shader: glow::Shader) -> String {
        unsafe { self.get_shader_info_log(shader) }
    }

    fn delete_shader(&self, shader: glow::Shader) {
        unsafe { HasContext::delete_shader(self, shader) }
    }

    fn create_program(&self, vertex: glow::Shader, fragment: glow::Shader) -> Result<glow::Program, String> {
        unsafe {
            let program = HasContext::create_program(self)?;
            self.attach_shader(program, vertex);
            self.attach_shader(program, fragment);
            self.link_program(program);
            Ok(program)
        }
    }

    fn program_linked(&self, program: glow::Program) -> bool {
        unsafe { self.get_program_link_status(program) }
    }

    fn program_log(&self, program: glow::Program) -> String {
        unsafe { self.get_program_info_log(program) }
    }

    fn detach_shader(&self, program: glow::Program, shader: glow::Shader) {
        unsafe { HasContext::detach_shader(self, program, shader) }
    }

    fn delete_program(&self, program: glow::Program) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn create_vertex_buffer(&self, data: &[u8]) -> Result<glow::Buffer, String> {
        unsafe {
            let buffer = self.create_buffer()?;
            self.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.buffer_data_u8_slice(glow::ARRAY_BUFFER, data, glow::STATIC_DRAW);
            self.bind_buffer(glow::ARRAY_BUFFER, None);
            Ok(buffer)
        }
    }

    fn delete_buffer(&self, buffer: glow::Buffer) {
        unsafe { HasContext::delete_buffer(self, buffer) }
    }

    fn uniform_location(&self, program: glow::Program, name: &str) -> Option<glow::UniformLocation> {
        unsafe { self.get_uniform_location(program, name) }
    }

    fn attrib_location(&self, program: glow::Program, name: &str) -> Option<u32> {
        unsafe { self.get_attrib_location(program, name) }
    }

    fn bind_vertices(&self, program: glow::Program, buffer: glow::Buffer, attrib: u32, components: i32) {
        unsafe {
            self.use_program(Some(program));
            self.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.enable_vertex_attrib_array(attrib);
            self.vertex_attrib_pointer_f32(attrib, components, glow::FLOAT, false, 0, 0);
        }
    }

    fn uniform_1f(&self, location: Option<&glow::UniformLocation>, value: f32) {
        unsafe { self.uniform_1_f32(location, value) }
    }

    fn uniform_2f(&self, location: Option<&glow::UniformLocation>, x: f32, y: f32) {
        unsafe { self.uniform_2_f32(location, x, y) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { HasContext::viewport(self, x, y, width, height) }
    }

    fn clear(&self, color: [f32; 4]) {
        unsafe {
            self.clear_color(color[0], color[1], color[2], color[3]);
            HasContext::clear(self, glow::COLOR_BUFFER_BIT);
        }
    }

    fn draw_triangle_strip(&self, vertex_count: i32) {
        unsafe { self.draw_arrays(glow::TRIANGLE_STRIP, 0, vertex_count) }
    }
}

pub fn compile_shader<G: Gpu>(gpu: &G, stage: ShaderStage, source: &str) -> Result<G::Shader, ShaderError> {
    let shader = gpu.create_shader(stage, source).map_err(|reason| ShaderError::Create {
        what: "shader",
        reason,
    })?;

    if !gpu.shader_compiled(shader) {
        let log = gpu.shader_log(shader);
        gpu.delete_shader(shader);
        error!("Failed to compile {} shader: {}", stage, log.trim_end());
        return Err(ShaderError::Compile { stage, log });
    }

    Ok(shader)
}

pub fn link_program<G: Gpu>(gpu: &G, vertex: G::Shader, fragment: G::Shader) -> Result<G::Program, ShaderError> {
    let program = gpu.create_program(vertex, fragment).map_err(|reason| ShaderError::Create {
        what: "program",
        reason,
    })?;

    if !gpu.program_linked(program) {
        let log = gpu.program_log(program);
        gpu.delete_program(program);
        error!("Failed to link shader program: {}", log.trim_end());
        return Err(ShaderError::Link { log });
    }

    gpu.detach_shader(program, vertex);
    gpu.detach_shader(program, fragment);

    Ok(program)
}

/// Compile both stages and link them.
///
/// Both stages are always compiled so every broken stage gets logged; the
/// first failure is returned.
pub fn load_shader_program<G: Gpu>(gpu: &G, vert_src: &str, frag_src: &str) -> Result<G::Program, ShaderError> {
    let vertex = compile_shader(gpu, ShaderStage::Vertex, vert_src);
    let fragment = compile_shader(gpu, ShaderStage::Fragment, frag_src);

    let (vertex, fragment) = match (vertex, fragment) {
        (Ok(vertex), Ok(fragment)) => (vertex, fragment),
        (Err(err), other) => {
            if let Ok(fragment) = other {
                gpu.delete_shader(fragment);
            }
            return Err(err);
        }
        (Ok(vertex), Err(err)) => {
            gpu.delete_shader(vertex);
            return Err(err);
        }
    };

    let program = link_program(gpu, vertex, fragment);
    gpu.delete_shader(vertex);
    gpu.delete_shader(fragment);
    program
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::testing::{GpuCall, RecordingGpu};

    const VERT: &str = "attribute vec2 a_position; void main() { gl_Position = vec4(a_position, 0.0, 1.0); }";
    const FRAG: &str = "void main() { gl_FragColor = vec4(1.0); }";
    const BROKEN: &str = "void main() { gl_FragColor = vec4(1.0) }";

    #[test]
    fn builds_program_and_releases_shaders() {
        let gpu = RecordingGpu::new();
        let program = load_shader_program(&gpu, VERT, FRAG).unwrap();

        let calls = gpu.calls();
        assert!(calls.contains(&GpuCall::DetachShader(program, 1)));
        assert!(calls.contains(&GpuCall::DetachShader(program, 2)));
        assert!(calls.contains(&GpuCall::DeleteShader(1)));
        assert!(calls.contains(&GpuCall::DeleteShader(2)));
        assert!(!calls.iter().any(|c| matches!(c, GpuCall::DeleteProgram(_))));
    }

    #[test]
    fn compile_failure_reports_stage_and_log() {
        let gpu = RecordingGpu::new().rejecting_source(BROKEN);
        let err = load_shader_program(&gpu, VERT, BROKEN).unwrap_err();

        match err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("syntax error"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let calls = gpu.calls();
        assert_eq!(calls.iter().filter(|c| matches!(c, GpuCall::DeleteShader(_))).count(), 2);
        assert!(!calls.iter().any(|c| matches!(c, GpuCall::CreateProgram(..))));
    }

    #[test]
    fn both_stages_compile_even_when_vertex_fails() {
        let gpu = RecordingGpu::new().rejecting_source(VERT);
        let err = load_shader_program(&gpu, VERT, FRAG).unwrap_err();

        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Vertex, .. }));
        let compiled = gpu
            .calls()
            .iter()
            .filter(|c| matches!(c, GpuCall::CreateShader(..)))
            .count();
        assert_eq!(compiled, 2);
    }

    #[test]
    fn link_failure_deletes_program() {
        let gpu = RecordingGpu::new().failing_link();
        let err = load_shader_program(&gpu, VERT, FRAG).unwrap_err();

        assert!(matches!(err, ShaderError::Link { .. }));
        assert!(gpu.calls().iter().any(|c| matches!(c, GpuCall::DeleteProgram(_))));
    }
}
