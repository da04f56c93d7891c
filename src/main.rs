mod app;
mod config;
mod gfx;
mod wayland;

use anyhow::{Context, Result};
use app::{App, UiEvent};
use config::Config;
use gfx::driver::{DriverOptions, FrameDriver};
use gfx::frame::FrameTask;
use log::{info, warn};
use std::time::Instant;
use wayland::egl::EglContext;
use wayland::{FrameCallbacks, WaylandState};
use wayland_client::{Connection, Proxy};
use wayland_cursor::CursorTheme;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting backdrop...");

    let config = Config::load().context("failed to load configuration")?;
    let sources = config.shader_sources()?;
    let mut app = App::new(config);

    info!("Connecting to Wayland...");
    let conn = Connection::connect_to_env()?;
    let display = conn.display();

    let mut event_queue = conn.new_event_queue();
    let qh = event_queue.handle();

    let _registry = display.get_registry(&qh, ());

    let mut state = WaylandState::new(&qh);

    // Globals first, then the events of the objects bound from them.
    event_queue.roundtrip(&mut state)?;
    event_queue.roundtrip(&mut state)?;

    if let Some(shm) = state.shm.clone() {
        match CursorTheme::load(&conn, shm, app.config.cursor_size) {
            Ok(theme) => state.cursor_theme = Some(theme),
            Err(err) => warn!("Failed to load cursor theme: {}", err),
        }
    }

    info!("Creating {:?} layer surface...", app.config.layer);
    state.create_background(&qh, &app.config)?;

    while !state.configured {
        event_queue.blocking_dispatch(&mut state)?;
    }

    let size = state
        .surface_size
        .or(state.output_size)
        .unwrap_or([1920, 1080]);
    let surface = state
        .surface
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Background surface missing after configure"))?;

    info!("Initializing EGL at {}x{}...", size[0], size[1]);
    let display_ptr = display.id().as_ptr() as *mut _;
    let mut egl = EglContext::new(display_ptr)?;
    egl.create_surface(&surface, size)?;
    if let Err(err) = egl.set_swap_interval(0) {
        warn!("Could not disable swap interval: {}", err);
    }

    let gl = unsafe {
        glow::Context::from_loader_function(|s| egl.get_proc_address(s))
    };

    let options = DriverOptions {
        time_offset: app.config.time_offset(),
        clear_color: app.config.clear_color,
    };
    let mut driver = FrameDriver::new(gl, egl, &sources.vertex, &sources.fragment, options);
    if driver.is_valid() {
        info!("Shader program ready");
    }
    let mut frames = FrameCallbacks::new(surface, qh.clone());

    // The first resize also draws the first frame, which starts the render loop.
    if !state
        .pending_events
        .iter()
        .any(|ev| matches!(ev, UiEvent::Resize { .. }))
    {
        state.pending_events.push(UiEvent::Resize { size });
    }

    info!("Starting main loop...");
    while state.running {
        let now = Instant::now();

        for ev in state.pending_events.drain(..) {
            let resize = match ev {
                UiEvent::Resize { size } => Some(size),
                _ => None,
            };
            app.handle_event(ev, &mut frames);
            if let Some(size) = resize {
                driver.resize(size, &app.frame_inputs(now), &mut frames)?;
            }
        }

        for task in state.pending_frames.drain(..) {
            match task {
                FrameTask::Pointer => app.tick_pointer(now, &mut frames),
                FrameTask::Render => driver.on_frame(&app.frame_inputs(now), &mut frames)?,
            }
        }

        event_queue.blocking_dispatch(&mut state)?;
    }

    info!("Shutting down");
    Ok(())
}
