//! Incremental renderer workers.
//!
//! Workers in this module spread GPU-adjacent work over several frames, one
//! slice per scheduling pass, so neither the issuing thread nor the core thread
//! stalls on them.
//!
//! # Available Tasks
//! - `StreamingUpload`: Copies a payload into a destination buffer slice by slice
//! - `GpuReadback`: Delivers a snapshot of a source buffer after a fixed frame latency

pub mod gpu_readback_task;
pub mod streaming_upload_task;

pub use gpu_readback_task::{GpuReadback, ReadbackResult};
pub use streaming_upload_task::StreamingUpload;
