//! Task for streaming a payload into a destination buffer over several frames.
//!
//! Large uploads are split into fixed-size slices so a single frame never spends
//! more than one slice worth of time copying.

use crate::{
    core::MtResource,
    engine_state::task_management::task::{RendererTask, TaskHandle, TaskWorker},
};

/// A worker that appends `payload` to `destination`, one slice per invocation.
pub struct StreamingUpload {
    /// The bytes to upload
    payload: Vec<u8>,
    /// How much of the payload has been uploaded so far
    offset: usize,
    /// Maximum number of bytes copied per invocation
    slice_size: usize,
    /// Buffer receiving the payload
    destination: MtResource<Vec<u8>>,
}

impl StreamingUpload {
    /// Creates a new streaming upload worker.
    ///
    /// # Arguments
    /// * `payload` - The bytes to upload
    /// * `slice_size` - Bytes copied per pass, a size of zero is treated as one
    /// * `destination` - Buffer the payload is appended to
    ///
    /// # Returns
    /// A new `StreamingUpload` instance
    pub fn new(payload: Vec<u8>, slice_size: usize, destination: MtResource<Vec<u8>>) -> Self {
        StreamingUpload {
            payload,
            offset: 0,
            slice_size: slice_size.max(1),
            destination,
        }
    }

    /// Wraps a new upload in a renderer task.
    pub fn create_task(
        name: impl Into<String>,
        payload: Vec<u8>,
        slice_size: usize,
        destination: MtResource<Vec<u8>>,
    ) -> TaskHandle {
        RendererTask::create(name, Self::new(payload, slice_size, destination))
    }

    /// Number of passes needed to upload the whole payload.
    pub fn passes_required(&self) -> usize {
        self.payload.len().div_ceil(self.slice_size).max(1)
    }
}

impl TaskWorker for StreamingUpload {
    fn step(&mut self) -> bool {
        let end = (self.offset + self.slice_size).min(self.payload.len());
        self.destination
            .get_mut()
            .extend_from_slice(&self.payload[self.offset..end]);
        self.offset = end;

        self.offset == self.payload.len()
    }
}
