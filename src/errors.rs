//! # Error Types
//!
//! This module defines the error type shared by the task scheduler, the core
//! thread and the synchronization bridge.
//!
//! The scheduler itself performs no error recovery. Errors only surface where a
//! caller asked for something that cannot be honoured: queuing a task that is
//! mid-flight, dispatching to a core thread that is gone, or a command that
//! panicked while the caller was blocked on it.

use thiserror::Error;

/// The main error type for the render task core.
#[derive(Error, Debug)]
pub enum RenderCoreError {
    /// A task was submitted while its worker was still executing.
    #[error("Task '{0}' is already executing, it cannot be queued again until it finishes")]
    TaskAlreadyExecuting(String),

    /// The core thread has been shut down or exited.
    #[error("Core thread is not running")]
    CoreThreadStopped,

    /// A command panicked on the core thread during a blocking submission.
    #[error("Command panicked on the core thread: {0}")]
    CommandPanicked(String),

    /// The core thread panicked outside of command execution and could not be joined.
    #[error("Core thread panicked and could not be joined")]
    CoreThreadPanicked,

    /// File or thread creation I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed engine configuration.
    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Convenience alias used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, RenderCoreError>;
