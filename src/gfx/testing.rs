//! Recording doubles for the GL and canvas seams.

use super::driver::Canvas;
use super::gl::{Gpu, ShaderStage};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::cell::{Cell, RefCell};
use std::sync::Once;

#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateShader(ShaderStage, u32),
    DeleteShader(u32),
    CreateProgram(u32, u32, u32),
    DetachShader(u32, u32),
    DeleteProgram(u32),
    CreateBuffer(u32, Vec<u8>),
    DeleteBuffer(u32),
    BindVertices { program: u32, buffer: u32, attrib: u32, components: i32 },
    Uniform1f(String, f32),
    Uniform2f(String, f32, f32),
    Viewport(i32, i32, i32, i32),
    Clear([f32; 4]),
    DrawTriangleStrip(i32),
}

/// Handles are plain integers; uniform locations are the uniform names.
/// An attribute exists when some compiled source declares it.
#[derive(Default)]
pub struct RecordingGpu {
    calls: RefCell<Vec<GpuCall>>,
    next_id: Cell<u32>,
    rejected_sources: Vec<String>,
    rejected: RefCell<Vec<u32>>,
    sources: RefCell<Vec<String>>,
    fail_link: bool,
}

impl RecordingGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any shader whose source equals `source` fails to compile.
    pub fn rejecting_source(mut self, source: &str) -> Self {
        self.rejected_sources.push(source.to_string());
        self
    }

    pub fn failing_link(mut self) -> Self {
        self.fail_link = true;
        self
    }

    pub fn calls(&self) -> Vec<GpuCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn draw_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, GpuCall::DrawTriangleStrip(_)))
            .count()
    }

    fn id(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn record(&self, call: GpuCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl Gpu for RecordingGpu {
    type Shader = u32;
    type Program = u32;
    type Buffer = u32;
    type UniformLocation = String;

    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<u32, String> {
        let id = self.id();
        if self.rejected_sources.iter().any(|s| s == source) {
            self.rejected.borrow_mut().push(id);
        }
        self.sources.borrow_mut().push(source.to_string());
        self.record(GpuCall::CreateShader(stage, id));
        Ok(id)
    }

    fn shader_compiled(&self, shader: u32) -> bool {
        !self.rejected.borrow().contains(&shader)
    }

    fn shader_log(&self, shader: u32) -> String {
        format!("0:1({shader}): error: syntax error, unexpected '}}'\n")
    }

    fn delete_shader(&self, shader: u32) {
        self.record(GpuCall::DeleteShader(shader));
    }

    fn create_program(&self, vertex: u32, fragment: u32) -> Result<u32, String> {
        let id = self.id();
        self.record(GpuCall::CreateProgram(id, vertex, fragment));
        Ok(id)
    }

    fn program_linked(&self, _program: u32) -> bool {
        !self.fail_link
    }

    fn program_log(&self, _program: u32) -> String {
        "error: no main() in fragment shader".to_string()
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        self.record(GpuCall::DetachShader(program, shader));
    }

    fn delete_program(&self, program: u32) {
        self.record(GpuCall::DeleteProgram(program));
    }

    fn create_vertex_buffer(&self, data: &[u8]) -> Result<u32, String> {
        let id = self.id();
        self.record(GpuCall::CreateBuffer(id, data.to_vec()));
        Ok(id)
    }

    fn delete_buffer(&self, buffer: u32) {
        self.record(GpuCall::DeleteBuffer(buffer));
    }

    fn uniform_location(&self, _program: u32, name: &str) -> Option<String> {
        Some(name.to_string())
    }

    fn attrib_location(&self, _program: u32, name: &str) -> Option<u32> {
        let declaration = format!("attribute vec2 {name};");
        self.sources
            .borrow()
            .iter()
            .any(|s| s.contains(&declaration))
            .then_some(0)
    }

    fn bind_vertices(&self, program: u32, buffer: u32, attrib: u32, components: i32) {
        self.record(GpuCall::BindVertices { program, buffer, attrib, components });
    }

    fn uniform_1f(&self, location: Option<&String>, value: f32) {
        if let Some(name) = location {
            self.record(GpuCall::Uniform1f(name.clone(), value));
        }
    }

    fn uniform_2f(&self, location: Option<&String>, x: f32, y: f32) {
        if let Some(name) = location {
            self.record(GpuCall::Uniform2f(name.clone(), x, y));
        }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(GpuCall::Viewport(x, y, width, height));
    }

    fn clear(&self, color: [f32; 4]) {
        self.record(GpuCall::Clear(color));
    }

    fn draw_triangle_strip(&self, vertex_count: i32) {
        self.record(GpuCall::DrawTriangleStrip(vertex_count));
    }
}

#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub size: [u32; 2],
    pub resizes: Vec<[u32; 2]>,
    pub presents: usize,
}

impl RecordingCanvas {
    pub fn new(size: [u32; 2]) -> Self {
        Self { size, ..Self::default() }
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> [u32; 2] {
        self.size
    }

    fn resize(&mut self, size: [u32; 2]) -> anyhow::Result<()> {
        self.size = size;
        self.resizes.push(size);
        Ok(())
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.presents += 1;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CapturedRecord {
    pub level: Level,
    pub message: String,
}

thread_local! {
    static CAPTURED: RefCell<Option<Vec<CapturedRecord>>> = const { RefCell::new(None) };
}

/// Keeps records only for threads inside `capture_logs`, so parallel tests
/// never see each other's output.
struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED.with(|captured| {
            if let Some(records) = captured.borrow_mut().as_mut() {
                records.push(CapturedRecord {
                    level: record.level(),
                    message: record.args().to_string(),
                });
            }
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INSTALL: Once = Once::new();

/// Run `f` and return every log record it emitted on this thread.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> Vec<CapturedRecord> {
    INSTALL.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });

    CAPTURED.with(|captured| *captured.borrow_mut() = Some(Vec::new()));
    let _ = f();
    CAPTURED.with(|captured| captured.borrow_mut().take().unwrap_or_default())
}
