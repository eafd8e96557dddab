//! # Core Module
//!
//! Shared-state primitives used by both the issuing thread and the core
//! thread.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking
//! - `lock`: Mutex acquisition that survives a poisoned lock
//! - `panic_message`: Readable text for a panic caught on the core thread
//!
//! ## Usage
//! ```rust
//! use render_task_core::core::MtResource;
//!
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//! ```

pub mod mt_resource;

pub use mt_resource::MtResource;

use std::any::Any;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the guard if a previous holder panicked.
///
/// Scheduler state stays structurally valid across a panicking worker, so a
/// poisoned lock is not treated as fatal.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Extracts the message of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
