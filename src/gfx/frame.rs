/// Work that wants to run on the next display refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTask {
    /// Redraw the background.
    Render,
    /// Advance the eased pointer position.
    Pointer,
}

/// Queues a task for the next display refresh.
///
/// Each request produces exactly one callback. Callers keep their own
/// "already pending" flag so a chain never gets two callbacks in flight.
pub trait FrameScheduler {
    fn request_frame(&mut self, task: FrameTask);
}

#[cfg(test)]
impl FrameScheduler for Vec<FrameTask> {
    fn request_frame(&mut self, task: FrameTask) {
        self.push(task);
    }
}
