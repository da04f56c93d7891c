pub mod egl;

use crate::app::UiEvent;
use crate::config::{Config, Layer};
use crate::gfx::frame::{FrameScheduler, FrameTask};
use crate::gfx::math::Vec2;
use log::{debug, info, warn};
use wayland_client::{
    protocol::{
        wl_buffer, wl_callback, wl_compositor, wl_output, wl_pointer, wl_registry, wl_seat, wl_shm,
        wl_surface,
    },
    Connection, Dispatch, QueueHandle, WEnum,
};
use wayland_cursor::CursorTheme;
use wayland_protocols_wlr::layer_shell::v1::client::{
    zwlr_layer_shell_v1, zwlr_layer_surface_v1,
};

pub struct WaylandState {
    pub running: bool,
    pub configured: bool,
    pub compositor: Option<wl_compositor::WlCompositor>,
    pub layer_shell: Option<zwlr_layer_shell_v1::ZwlrLayerShellV1>,
    pub shm: Option<wl_shm::WlShm>,
    pub surface: Option<wl_surface::WlSurface>,
    pub layer_surface: Option<zwlr_layer_surface_v1::ZwlrLayerSurfaceV1>,
    pub seat: Option<wl_seat::WlSeat>,
    pub output: Option<wl_output::WlOutput>,
    pub output_size: Option<[u32; 2]>,
    pub surface_size: Option<[u32; 2]>,
    pub pointer: Option<wl_pointer::WlPointer>,
    pub cursor_theme: Option<CursorTheme>,
    pub cursor_surface: Option<wl_surface::WlSurface>,
    pub pending_events: Vec<UiEvent>,
    pub pending_frames: Vec<FrameTask>,
}

impl WaylandState {
    pub fn new(_qh: &QueueHandle<Self>) -> Self {
        Self {
            running: true,
            configured: false,
            compositor: None,
            layer_shell: None,
            shm: None,
            surface: None,
            layer_surface: None,
            seat: None,
            output: None,
            output_size: None,
            surface_size: None,
            pointer: None,
            cursor_theme: None,
            cursor_surface: None,
            pending_events: Vec::new(),
            pending_frames: Vec::new(),
        }
    }

    /// Create the full-output layer surface the background is drawn on.
    pub fn create_background(&mut self, qh: &QueueHandle<Self>, config: &Config) -> anyhow::Result<()> {
        let compositor = self
            .compositor
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Compositor does not advertise wl_compositor"))?;
        let layer_shell = self
            .layer_shell
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Compositor does not support zwlr_layer_shell_v1"))?;

        let surface = compositor.create_surface(qh, ());
        let layer_surface = layer_shell.get_layer_surface(
            &surface,
            self.output.as_ref(),
            shell_layer(config.layer),
            config.namespace.clone(),
            qh,
            (),
        );

        layer_surface.set_anchor(
            zwlr_layer_surface_v1::Anchor::Top
                | zwlr_layer_surface_v1::Anchor::Bottom
                | zwlr_layer_surface_v1::Anchor::Left
                | zwlr_layer_surface_v1::Anchor::Right,
        );
        layer_surface.set_exclusive_zone(-1);
        layer_surface.set_keyboard_interactivity(
            zwlr_layer_surface_v1::KeyboardInteractivity::None,
        );
        layer_surface.set_size(0, 0);

        surface.commit();

        self.surface = Some(surface);
        self.layer_surface = Some(layer_surface);
        Ok(())
    }

    fn set_cursor(&mut self, pointer: &wl_pointer::WlPointer, serial: u32, qh: &QueueHandle<Self>) {
        let (Some(theme), Some(compositor)) = (self.cursor_theme.as_mut(), self.compositor.as_ref())
        else {
            return;
        };
        let Some(cursor) = theme.get_cursor("left_ptr") else {
            warn!("Cursor theme has no left_ptr cursor");
            return;
        };

        let image = &cursor[0];
        let (hotspot_x, hotspot_y) = image.hotspot();
        let (width, height) = image.dimensions();
        let buffer: &wl_buffer::WlBuffer = image;

        let surface = self
            .cursor_surface
            .get_or_insert_with(|| compositor.create_surface(qh, ()));
        surface.attach(Some(buffer), 0, 0);
        surface.damage_buffer(0, 0, width as i32, height as i32);
        surface.commit();

        pointer.set_cursor(serial, Some(&*surface), hotspot_x as i32, hotspot_y as i32);
    }
}

pub fn shell_layer(layer: Layer) -> zwlr_layer_shell_v1::Layer {
    match layer {
        Layer::Background => zwlr_layer_shell_v1::Layer::Background,
        Layer::Bottom => zwlr_layer_shell_v1::Layer::Bottom,
        Layer::Top => zwlr_layer_shell_v1::Layer::Top,
        Layer::Overlay => zwlr_layer_shell_v1::Layer::Overlay,
    }
}

/// Outputs list every mode they support; only the one flagged current counts.
pub fn current_mode_size(flags: WEnum<wl_output::Mode>, width: i32, height: i32) -> Option<[u32; 2]> {
    match flags {
        WEnum::Value(mode) if mode.contains(wl_output::Mode::Current) && width > 0 && height > 0 => {
            Some([width as u32, height as u32])
        }
        _ => None,
    }
}

/// Frame requests become `wl_surface.frame` callbacks tagged with their task.
///
/// A callback is attached to the next commit of the surface, which the
/// render loop provides through `eglSwapBuffers`.
pub struct FrameCallbacks {
    surface: wl_surface::WlSurface,
    qh: QueueHandle<WaylandState>,
}

impl FrameCallbacks {
    pub fn new(surface: wl_surface::WlSurface, qh: QueueHandle<WaylandState>) -> Self {
        Self { surface, qh }
    }
}

impl FrameScheduler for FrameCallbacks {
    fn request_frame(&mut self, task: FrameTask) {
        self.surface.frame(&self.qh, task);
    }
}

impl Dispatch<wl_registry::WlRegistry, ()> for WaylandState {
    fn event(
        state: &mut Self,
        registry: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let wl_registry::Event::Global {
            name,
            interface,
            version,
        } = event
        {
            match &interface[..] {
                "wl_compositor" => {
                    let compositor = registry.bind::<wl_compositor::WlCompositor, _, _>(
                        name,
                        version.min(4),
                        qh,
                        (),
                    );
                    state.compositor = Some(compositor);
                }
                "zwlr_layer_shell_v1" => {
                    let layer_shell = registry.bind::<zwlr_layer_shell_v1::ZwlrLayerShellV1, _, _>(
                        name,
                        version.min(1),
                        qh,
                        (),
                    );
                    state.layer_shell = Some(layer_shell);
                }
                "wl_shm" => {
                    let shm = registry.bind::<wl_shm::WlShm, _, _>(name, version.min(1), qh, ());
                    state.shm = Some(shm);
                }
                "wl_seat" => {
                    let seat = registry.bind::<wl_seat::WlSeat, _, _>(
                        name,
                        version.min(5),
                        qh,
                        (),
                    );
                    state.seat = Some(seat);
                }
                // First output only.
                "wl_output" if state.output.is_none() => {
                    let output = registry.bind::<wl_output::WlOutput, _, _>(
                        name,
                        version.min(2),
                        qh,
                        (),
                    );
                    state.output = Some(output);
                }
                _ => {}
            }
        }
    }
}

impl Dispatch<wl_compositor::WlCompositor, ()> for WaylandState {
    fn event(_: &mut Self, _: &wl_compositor::WlCompositor, _: wl_compositor::Event, _: &(), _: &Connection, _: &QueueHandle<Self>) {}
}

impl Dispatch<wl_surface::WlSurface, ()> for WaylandState {
    fn event(_: &mut Self, _: &wl_surface::WlSurface, _: wl_surface::Event, _: &(), _: &Connection, _: &QueueHandle<Self>) {}
}

impl Dispatch<wl_shm::WlShm, ()> for WaylandState {
    fn event(_: &mut Self, _: &wl_shm::WlShm, _: wl_shm::Event, _: &(), _: &Connection, _: &QueueHandle<Self>) {}
}

impl Dispatch<wl_callback::WlCallback, FrameTask> for WaylandState {
    fn event(
        state: &mut Self,
        _: &wl_callback::WlCallback,
        event: wl_callback::Event,
        task: &FrameTask,
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_callback::Event::Done { .. } = event {
            state.pending_frames.push(*task);
        }
    }
}

impl Dispatch<wl_pointer::WlPointer, ()> for WaylandState {
    fn event(
        state: &mut Self,
        pointer: &wl_pointer::WlPointer,
        event: wl_pointer::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_pointer::Event::Enter { serial, surface_x, surface_y, .. } => {
                state.set_cursor(pointer, serial, qh);
                state.pending_events.push(UiEvent::PointerMove {
                    pos: Vec2::new(surface_x as f32, surface_y as f32),
                });
            }
            wl_pointer::Event::Motion { surface_x, surface_y, .. } => {
                state.pending_events.push(UiEvent::PointerMove {
                    pos: Vec2::new(surface_x as f32, surface_y as f32),
                });
            }
            wl_pointer::Event::Axis { axis, value, .. } => {
                if let wayland_client::WEnum::Value(wl_pointer::Axis::VerticalScroll) = axis {
                    state.pending_events.push(UiEvent::Scroll { delta: value as f32 });
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<wl_seat::WlSeat, ()> for WaylandState {
    fn event(
        state: &mut Self,
        seat: &wl_seat::WlSeat,
        event: wl_seat::Event,
        _: &(),
        _: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let wl_seat::Event::Capabilities {
            capabilities: wayland_client::WEnum::Value(caps),
        } = event
        {
            if caps.contains(wl_seat::Capability::Pointer) && state.pointer.is_none() {
                debug!("Seat has a pointer");
                state.pointer = Some(seat.get_pointer(qh, ()));
            }
        }
    }
}

impl Dispatch<wl_output::WlOutput, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _: &wl_output::WlOutput,
        event: wl_output::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        if let wl_output::Event::Mode { flags, width, height, .. } = event {
            if let Some(size) = current_mode_size(flags, width, height) {
                state.output_size = Some(size);
            }
        }
    }
}

impl Dispatch<zwlr_layer_shell_v1::ZwlrLayerShellV1, ()> for WaylandState {
    fn event(_: &mut Self, _: &zwlr_layer_shell_v1::ZwlrLayerShellV1, _: zwlr_layer_shell_v1::Event, _: &(), _: &Connection, _: &QueueHandle<Self>) {}
}

impl Dispatch<zwlr_layer_surface_v1::ZwlrLayerSurfaceV1, ()> for WaylandState {
    fn event(
        state: &mut Self,
        surface: &zwlr_layer_surface_v1::ZwlrLayerSurfaceV1,
        event: zwlr_layer_surface_v1::Event,
        _: &(),
        _: &Connection,
        _: &QueueHandle<Self>,
    ) {
        match event {
            zwlr_layer_surface_v1::Event::Configure {
                serial,
                width,
                height,
            } => {
                debug!("Layer surface configured: {}x{} (serial {})", width, height, serial);
                surface.ack_configure(serial);
                state.configured = true;
                if width > 0 && height > 0 {
                    let size = [width, height];
                    state.surface_size = Some(size);
                    state.pending_events.push(UiEvent::Resize { size });
                }
            }
            zwlr_layer_surface_v1::Event::Closed => {
                info!("Layer surface closed by compositor");
                state.running = false;
            }
            _ => {}
        }
    }
}
