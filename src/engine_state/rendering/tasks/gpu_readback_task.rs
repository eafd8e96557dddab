//! Task that reads data back from the GPU with a fixed frame latency.
//!
//! GPU readbacks cannot complete in the frame they are issued: the copy has to
//! make its way through the queue first. `GpuReadback` models that by counting
//! down a number of frames before it snapshots the source buffer.

use crate::{
    core::MtResource,
    engine_state::task_management::task::{RendererTask, TaskHandle, TaskWorker},
};

/// Where a readback delivers its data.
///
/// Cloning the handle shares the same slot.
#[derive(Clone, Default)]
pub struct ReadbackResult {
    data: MtResource<Option<Vec<u8>>>,
}

impl ReadbackResult {
    /// Returns true once the readback has delivered its data.
    pub fn is_ready(&self) -> bool {
        self.data.get().is_some()
    }

    /// Copy of the delivered data, if any.
    pub fn data(&self) -> Option<Vec<u8>> {
        self.data.get().clone()
    }

    /// Takes the delivered data out of the slot.
    pub fn take(&self) -> Option<Vec<u8>> {
        self.data.get_mut().take()
    }
}

/// A worker that snapshots `source` after `latency_frames` passes.
pub struct GpuReadback {
    /// Buffer being read back
    source: MtResource<Vec<u8>>,
    /// Passes left before the data is available
    frames_remaining: u32,
    /// Slot the snapshot is written to
    result: ReadbackResult,
}

impl GpuReadback {
    /// Creates a new readback worker.
    ///
    /// # Arguments
    /// * `source` - Buffer to read back
    /// * `latency_frames` - Passes that complete without data; the snapshot is
    ///   taken on the pass after them
    ///
    /// # Returns
    /// The worker and the handle its data will be delivered to
    pub fn new(source: MtResource<Vec<u8>>, latency_frames: u32) -> (Self, ReadbackResult) {
        let result = ReadbackResult::default();
        let worker = GpuReadback {
            source,
            frames_remaining: latency_frames,
            result: result.clone(),
        };
        (worker, result)
    }

    /// Wraps a new readback in a renderer task.
    pub fn create_task(
        name: impl Into<String>,
        source: MtResource<Vec<u8>>,
        latency_frames: u32,
    ) -> (TaskHandle, ReadbackResult) {
        let (worker, result) = Self::new(source, latency_frames);
        (RendererTask::create(name, worker), result)
    }
}

impl TaskWorker for GpuReadback {
    fn step(&mut self) -> bool {
        if self.frames_remaining > 0 {
            self.frames_remaining -= 1;
            return false;
        }

        let snapshot = self.source.get().clone();
        *self.result.data.get_mut() = Some(snapshot);
        true
    }
}
