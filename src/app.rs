use crate::config::Config;
use crate::gfx::{anim::EasedVec2, driver::FrameInputs, frame::FrameScheduler, math::Vec2};
use log::debug;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Surface-local pointer position.
    PointerMove { pos: Vec2 },
    /// Vertical scroll in surface pixels, positive is down.
    Scroll { delta: f32 },
    Resize { size: [u32; 2] },
}

/// Everything the renderer reads that is not GL state.
pub struct App {
    pub config: Config,
    pointer: EasedVec2,
    scroll_top: f32,
    /// Centre of the first viewport; pointer positions are reported relative to it.
    origin: Option<Vec2>,
    viewport: [u32; 2],
}

impl App {
    pub fn new(config: Config) -> Self {
        let pointer = EasedVec2::new(Vec2::ZERO, config.pointer_ease());
        Self {
            config,
            pointer,
            scroll_top: 0.0,
            origin: None,
            viewport: [0, 0],
        }
    }

    #[cfg(test)]
    pub(crate) fn viewport(&self) -> [u32; 2] {
        self.viewport
    }

    #[cfg(test)]
    pub(crate) fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    #[cfg(test)]
    pub(crate) fn pointer(&self) -> &EasedVec2 {
        &self.pointer
    }

    pub fn set_viewport(&mut self, size: [u32; 2]) {
        self.viewport = size;
        if self.origin.is_none() {
            let origin = Vec2::new(size[0] as f32 / 2.0, size[1] as f32 / 2.0);
            debug!("Pointer origin at ({}, {})", origin.x, origin.y);
            self.origin = Some(origin);
        }
    }

    pub fn handle_event(&mut self, event: UiEvent, frames: &mut impl FrameScheduler) {
        match event {
            UiEvent::PointerMove { pos } => {
                // Page coordinates include the scrolled distance.
                let page = pos + Vec2::new(0.0, self.scroll_top);
                let offset = page - self.origin.unwrap_or(Vec2::ZERO);
                self.pointer.set(offset, frames);
            }
            UiEvent::Scroll { delta } => {
                let mut scroll_top = (self.scroll_top + delta * self.config.scroll_speed).max(0.0);
                if let Some(limit) = self.config.scroll_limit {
                    scroll_top = scroll_top.min(limit.max(0.0));
                }
                debug!("Scroll offset {} -> {}", self.scroll_top, scroll_top);
                self.scroll_top = scroll_top;
            }
            UiEvent::Resize { size } => self.set_viewport(size),
        }
    }

    pub fn tick_pointer(&mut self, now: Instant, frames: &mut impl FrameScheduler) {
        self.pointer.tick(now, frames);
    }

    pub fn frame_inputs(&self, now: Instant) -> FrameInputs {
        FrameInputs {
            now,
            scroll_top: self.scroll_top,
            pointer: self.pointer.current(),
        }
    }
}
