use super::frame::{FrameScheduler, FrameTask};
use super::math::Vec2;
use std::time::{Duration, Instant};

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn lerp_vec2(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    Vec2::new(lerp(a.x, b.x, t), lerp(a.y, b.y, t))
}

/// A 2D value that glides linearly toward the last target it was given.
///
/// `current` always equals `lerp_vec2(start, target, progress)`. Retargeting
/// mid-transition restarts the blend from wherever `current` is, so the
/// output never jumps.
#[derive(Debug, Clone)]
pub struct EasedVec2 {
    current: Vec2,
    start: Vec2,
    target: Vec2,
    progress: f32,
    duration: Duration,
    animating: bool,
    last_tick: Option<Instant>,
}

impl EasedVec2 {
    pub fn new(initial: Vec2, duration: Duration) -> Self {
        Self {
            current: initial,
            start: initial,
            target: initial,
            progress: 0.0,
            duration,
            animating: false,
            last_tick: None,
        }
    }

    pub fn current(&self) -> Vec2 {
        self.current
    }

    #[cfg(test)]
    pub(crate) fn target(&self) -> Vec2 {
        self.target
    }

    #[cfg(test)]
    pub(crate) fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    /// Retarget the transition. Starts the tick loop if none is pending.
    pub fn set(&mut self, target: Vec2, frames: &mut impl FrameScheduler) {
        self.start = self.current;
        self.target = target;
        self.progress = 0.0;

        if !self.animating {
            self.animating = true;
            frames.request_frame(FrameTask::Pointer);
        }
    }

    /// Advance by the time elapsed since the previous tick.
    pub fn tick(&mut self, now: Instant, frames: &mut impl FrameScheduler) {
        if !self.animating {
            return;
        }

        // First tick of a loop has no reference point; treat it as zero elapsed.
        let delta = self
            .last_tick
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last_tick = Some(now);

        let step = if self.duration.is_zero() {
            1.0
        } else {
            delta.as_secs_f32() / self.duration.as_secs_f32()
        };
        self.progress = (self.progress + step).min(1.0);

        if self.progress < 1.0 {
            self.current = lerp_vec2(self.start, self.target, self.progress);
            frames.request_frame(FrameTask::Pointer);
        } else {
            self.current = self.target;
            self.start = self.target;
            self.progress = 0.0;
            self.animating = false;
            self.last_tick = None;
        }
    }
}
