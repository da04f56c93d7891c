use crate::gfx::driver::Canvas;
use anyhow::{anyhow, Result};
use khronos_egl as egl;
use std::ffi::c_void;
use std::ptr;
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::Proxy;

/// An ES2 context plus the window surface it presents to.
pub struct EglContext {
    egl: egl::Instance<egl::Static>,
    display: egl::Display,
    context: egl::Context,
    config: egl::Config,
    wl_egl_window: Option<wayland_egl::WlEglSurface>,
    surface: Option<egl::Surface>,
    size: [u32; 2],
}

impl EglContext {
    pub fn new(wl_display: *mut c_void) -> Result<Self> {
        let egl_instance = egl::Instance::new(egl::Static);

        let display = unsafe {
            egl_instance.get_display(wl_display as egl::NativeDisplayType)
                .ok_or_else(|| anyhow!("Failed to get EGL display"))?
        };

        let (major, minor) = egl_instance.initialize(display)?;
        log::info!("EGL version: {}.{}", major, minor);

        let config_attribs = [
            egl::SURFACE_TYPE, egl::WINDOW_BIT,
            egl::RED_SIZE, 8,
            egl::GREEN_SIZE, 8,
            egl::BLUE_SIZE, 8,
            egl::ALPHA_SIZE, 8,
            egl::RENDERABLE_TYPE, egl::OPENGL_ES2_BIT,
            egl::NONE,
        ];

        let config = egl_instance.choose_first_config(display, &config_attribs)?
            .ok_or_else(|| anyhow!("No EGL config found"))?;

        egl_instance.bind_api(egl::OPENGL_ES_API)?;

        let context_attribs = [
            egl::CONTEXT_CLIENT_VERSION, 2,
            egl::NONE,
        ];

        let context = egl_instance.create_context(display, config, None, &context_attribs)?;

        Ok(Self {
            egl: egl_instance,
            display,
            context,
            config,
            wl_egl_window: None,
            surface: None,
            size: [0, 0],
        })
    }

    /// Bind a window surface for `wl_surface` and make the context current on it.
    pub fn create_surface(&mut self, wl_surface: &WlSurface, size: [u32; 2]) -> Result<()> {
        if let Some(surface) = self.surface.take() {
            unsafe {
                self.egl.destroy_surface(self.display, surface)?;
            }
        }
        self.wl_egl_window = None;

        let wl_egl_window = unsafe {
            wayland_egl::WlEglSurface::new_from_raw(
                wl_surface.id().as_ptr() as *mut _,
                size[0] as i32,
                size[1] as i32,
            )?
        };

        let surface = unsafe {
            self.egl.create_window_surface(
                self.display,
                self.config,
                wl_egl_window.ptr() as egl::NativeWindowType,
                None,
            )?
        };

        self.wl_egl_window = Some(wl_egl_window);
        self.surface = Some(surface);
        self.size = size;

        self.make_current()
    }

    pub fn make_current(&self) -> Result<()> {
        if let Some(surface) = self.surface {
            unsafe {
                self.egl.make_current(
                    self.display,
                    Some(surface),
                    Some(surface),
                    Some(self.context),
                )?;
            }
        }
        Ok(())
    }

    /// 0 stops `eglSwapBuffers` from waiting on its own frame callback;
    /// pacing comes from the render loop's callbacks instead.
    pub fn set_swap_interval(&self, interval: i32) -> Result<()> {
        unsafe {
            self.egl.swap_interval(self.display, interval)?;
        }
        Ok(())
    }

    pub fn get_proc_address(&self, name: &str) -> *const c_void {
        self.egl.get_proc_address(name)
            .map(|f| f as *const c_void)
            .unwrap_or(ptr::null())
    }
}

impl Canvas for EglContext {
    fn size(&self) -> [u32; 2] {
        self.size
    }

    fn resize(&mut self, size: [u32; 2]) -> Result<()> {
        let window = self
            .wl_egl_window
            .as_mut()
            .ok_or_else(|| anyhow!("EGL window surface not created"))?;
        window.resize(size[0] as i32, size[1] as i32, 0, 0);
        self.size = size;
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        if let Some(surface) = self.surface {
            unsafe {
                self.egl.swap_buffers(self.display, surface)?;
            }
        }
        Ok(())
    }
}

impl Drop for EglContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.egl.make_current(self.display, None, None, None);

            if let Some(surface) = self.surface {
                let _ = self.egl.destroy_surface(self.display, surface);
            }

            let _ = self.egl.destroy_context(self.display, self.context);
            let _ = self.egl.terminate(self.display);
        }
    }
}
