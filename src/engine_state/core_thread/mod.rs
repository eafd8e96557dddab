//! # Core Thread
//!
//! The core thread is the single thread that owns task execution and every
//! low-level graphics call. Other threads talk to it exclusively by queuing
//! commands and submitting them.
//!
//! ## Command Flow
//! 1. `queue_command()` buffers a command on the caller's side
//! 2. `submit(false)` hands every buffered command to the core thread as one batch
//! 3. `submit(true)` does the same and blocks until the batch has executed
//!
//! Batches execute in submission order. A panicking command is caught and
//! logged, and the thread keeps serving later batches.
//!
//! ## Example Usage
//! ```rust
//! use std::sync::{atomic::{AtomicBool, Ordering}, Arc};
//! use render_task_core::config::CoreThreadConfig;
//! use render_task_core::engine_state::core_thread::{CommandDispatch, CoreThread};
//!
//! let core_thread = CoreThread::spawn(&CoreThreadConfig::default()).unwrap();
//! let ran = Arc::new(AtomicBool::new(false));
//! let flag = ran.clone();
//!
//! core_thread.queue_command(Box::new(move || flag.store(true, Ordering::SeqCst)));
//! core_thread.submit_and_block().unwrap();
//! assert!(ran.load(Ordering::SeqCst));
//! ```

use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle, ThreadId};

use crate::config::CoreThreadConfig;
use crate::core::{lock, panic_message};
use crate::errors::{RenderCoreError, Result};

/// A unit of work executed on the core thread.
pub type Command = Box<dyn FnOnce() + Send>;

/// Command queue of the thread that owns rendering work.
///
/// This is the only way the task system reaches the core thread, which keeps the
/// scheduler and the synchronization bridge independent of how the thread is run.
pub trait CommandDispatch: Send + Sync {
    /// Buffers a command. It does not run before the next `submit()`.
    fn queue_command(&self, command: Command);

    /// Hands every buffered command to the core thread.
    ///
    /// # Arguments
    /// * `block` - Wait until the submitted commands have executed
    ///
    /// # Returns
    /// An error if the core thread is gone, or if a command panicked during a
    /// blocking submission
    fn submit(&self, block: bool) -> Result<()>;

    /// Submits every buffered command and waits until they have executed.
    fn submit_and_block(&self) -> Result<()> {
        self.submit(true)
    }
}

/// A batch of commands sent to the core thread in one submission.
struct CommandBatch {
    commands: Vec<Command>,
    completion: Option<Sender<Result<()>>>,
}

/// Dedicated rendering thread fed through a channel of command batches.
///
/// Commands may be queued from any thread. Submitting from the core thread itself
/// runs the batch inline rather than waiting on its own queue.
pub struct CoreThread {
    pending: Mutex<Vec<Command>>,
    batch_sender: Mutex<Option<Sender<CommandBatch>>>,
    thread_id: ThreadId,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CoreThread {
    /// Spawns the core thread.
    ///
    /// # Arguments
    /// * `config` - Thread name and stack size
    ///
    /// # Returns
    /// The running core thread, or an `Io` error if the OS refused to spawn it
    pub fn spawn(config: &CoreThreadConfig) -> Result<Self> {
        let (batch_tx, batch_rx) = channel::<CommandBatch>();

        let mut builder = thread::Builder::new().name(config.name.clone());
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let worker = builder.spawn(move || {
            log::info!("Core thread started");
            while let Ok(batch) = batch_rx.recv() {
                let outcome = execute_batch(batch.commands);
                if let Some(completion) = batch.completion {
                    let _ = completion.send(outcome);
                }
            }
            log::info!("Core thread stopped");
        })?;

        Ok(Self {
            pending: Mutex::new(Vec::new()),
            batch_sender: Mutex::new(Some(batch_tx)),
            thread_id: worker.thread().id(),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Returns true when called from the core thread.
    pub fn is_core_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Returns true until `shutdown()` has been called.
    pub fn is_running(&self) -> bool {
        lock(&self.batch_sender).is_some()
    }

    /// Number of commands queued but not yet submitted.
    pub fn pending_commands(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Stops the core thread after it has executed everything already queued or
    /// submitted, and joins it.
    ///
    /// Calling it again is a no-op. When called from the core thread the thread
    /// is only told to stop, since it cannot join itself.
    pub fn shutdown(&self) -> Result<()> {
        let Some(sender) = lock(&self.batch_sender).take() else {
            return Ok(());
        };

        let commands = mem::take(&mut *lock(&self.pending));
        if !commands.is_empty() {
            let _ = sender.send(CommandBatch {
                commands,
                completion: None,
            });
        }
        drop(sender);

        if self.is_core_thread() {
            log::warn!("Core thread asked to shut itself down, stopping after the current batch");
            return Ok(());
        }

        match lock(&self.worker).take() {
            Some(worker) => worker
                .join()
                .map_err(|_| RenderCoreError::CoreThreadPanicked),
            None => Ok(()),
        }
    }
}

impl CommandDispatch for CoreThread {
    fn queue_command(&self, command: Command) {
        lock(&self.pending).push(command);
    }

    fn submit(&self, block: bool) -> Result<()> {
        let commands = mem::take(&mut *lock(&self.pending));

        if self.is_core_thread() {
            return execute_batch(commands);
        }

        let sender = lock(&self.batch_sender)
            .clone()
            .ok_or(RenderCoreError::CoreThreadStopped)?;

        if !block {
            if commands.is_empty() {
                return Ok(());
            }
            return sender
                .send(CommandBatch {
                    commands,
                    completion: None,
                })
                .map_err(|_| RenderCoreError::CoreThreadStopped);
        }

        let (completion_tx, completion_rx) = channel();
        sender
            .send(CommandBatch {
                commands,
                completion: Some(completion_tx),
            })
            .map_err(|_| RenderCoreError::CoreThreadStopped)?;

        completion_rx
            .recv()
            .map_err(|_| RenderCoreError::CoreThreadStopped)?
    }
}

impl Drop for CoreThread {
    fn drop(&mut self) {
        if let Err(error) = self.shutdown() {
            log::error!("Failed to shut down core thread: {}", error);
        }
    }
}

/// Executes a batch in order. Returns the first panic as `CommandPanicked`.
fn execute_batch(commands: Vec<Command>) -> Result<()> {
    let mut outcome = Ok(());
    for command in commands {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(command)) {
            let message = panic_message(payload.as_ref());
            log::error!("Command panicked on the core thread: {}", message);
            if outcome.is_ok() {
                outcome = Err(RenderCoreError::CommandPanicked(message));
            }
        }
    }
    outcome
}
