//! # Renderer Tasks
//!
//! A `RendererTask` is a unit of deferred work executed on the core thread. Its
//! worker is invoked once per scheduling pass until it reports completion, which
//! lets long running operations (streaming uploads, multi-frame readbacks) make
//! progress across frames without blocking either thread.
//!
//! ## Task Lifecycle
//! 1. A task is created with `RendererTask::create()` and starts out `Idle`
//! 2. `TaskScheduler::add_task()` queues it for the core thread
//! 3. Each pass flips it to `Executing`, invokes the worker once, and moves it to
//!    `Complete` or back to `Idle` for the next pass
//! 4. `cancel()` may flip it to `Canceled` at any time, which is terminal
//!
//! ## Thread Safety
//! - The state is an atomic, readable from any thread without blocking
//! - State writes happen on the core thread, except `cancel()` and the reset
//!   performed by `add_task()`
//! - A write of `Complete` or `Canceled` happens-before any read that observes it

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::{lock, panic_message};
use crate::errors::Result;

use super::sync_bridge::SyncBridge;

/// Shared handle to a task. The creator and the scheduler both hold one for
/// as long as the task is pending.
pub type TaskHandle = Arc<RendererTask>;

/// Lifecycle state of a [`RendererTask`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Waiting for its next worker invocation
    Idle = 0,
    /// The worker is currently running on the core thread
    Executing = 1,
    /// The worker reported completion
    Complete = 2,
    /// The task was canceled and will never run again
    Canceled = 3,
}

impl TaskState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskState::Idle,
            1 => TaskState::Executing,
            2 => TaskState::Complete,
            _ => TaskState::Canceled,
        }
    }

    /// Returns true for `Complete` and `Canceled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Complete | TaskState::Canceled)
    }
}

/// The resumable operation behind a task.
///
/// `step` is called once per scheduling pass on the core thread and returns
/// `true` once the work is fully complete. Any closure of the shape
/// `FnMut() -> bool + Send` is a worker.
///
/// A worker that can never finish keeps being invoked every pass until the
/// task is canceled.
pub trait TaskWorker: Send {
    /// Performs one increment of work.
    ///
    /// # Returns
    /// `true` if the task is now complete, `false` to be invoked again next pass
    fn step(&mut self) -> bool;
}

impl<F> TaskWorker for F
where
    F: FnMut() -> bool + Send,
{
    fn step(&mut self) -> bool {
        self()
    }
}

type CompletionCallback = Box<dyn FnMut(&RendererTask) + Send>;

/// Outcome of an attempt to start a worker invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BeginOutcome {
    /// The task moved to `Executing` and its worker may be invoked
    Started,
    /// The task is already running further up the core thread's stack
    Busy,
    /// The task is complete or canceled
    Finished,
}

/// How `update()` treats an entry of the unresolved list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// Still pending, carry it over to the next frame
    Pending,
    /// Completed, fire its callbacks
    Complete,
    /// Canceled or already re-listed
    Dropped,
}

/// A named unit of deferred work with an atomic lifecycle state.
pub struct RendererTask {
    name: String,
    state: AtomicU8,
    invocations: AtomicU64,
    /// Set from `begin_execution()` until the worker has returned, whatever the
    /// state says in the meantime
    in_worker: AtomicBool,
    /// Set while the task sits in one of the scheduler's execution lists
    scheduled: AtomicBool,
    /// Set while the task sits in the scheduler's unresolved list
    awaiting_notification: AtomicBool,
    worker: Mutex<Box<dyn TaskWorker>>,
    on_complete: Mutex<Vec<CompletionCallback>>,
}

impl RendererTask {
    /// Creates a new task in the `Idle` state.
    ///
    /// # Arguments
    /// * `name` - Diagnostic label used in log output
    /// * `worker` - Operation invoked once per pass until it returns `true`
    ///
    /// # Returns
    /// A shared handle to the new task
    ///
    /// # Example
    /// ```rust
    /// use render_task_core::engine_state::task_management::task::{RendererTask, TaskState};
    ///
    /// let mut remaining = 3;
    /// let task = RendererTask::create("prepare mesh", move || {
    ///     remaining -= 1;
    ///     remaining == 0
    /// });
    /// assert_eq!(task.state(), TaskState::Idle);
    /// ```
    pub fn create(name: impl Into<String>, worker: impl TaskWorker + 'static) -> TaskHandle {
        Arc::new(Self {
            name: name.into(),
            state: AtomicU8::new(TaskState::Idle as u8),
            invocations: AtomicU64::new(0),
            in_worker: AtomicBool::new(false),
            scheduled: AtomicBool::new(false),
            awaiting_notification: AtomicBool::new(false),
            worker: Mutex::new(Box::new(worker)),
            on_complete: Mutex::new(Vec::new()),
        })
    }

    /// Diagnostic label of this task.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns true if the worker reported completion.
    pub fn is_complete(&self) -> bool {
        self.state() == TaskState::Complete
    }

    /// Returns true if the task was canceled.
    pub fn is_canceled(&self) -> bool {
        self.state() == TaskState::Canceled
    }

    /// Total number of worker invocations across the task's lifetime.
    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(Ordering::Acquire)
    }

    /// Cancels the task.
    ///
    /// A worker that is mid-invocation finishes that invocation, but is never
    /// invoked again and the task never becomes `Complete`.
    pub fn cancel(&self) {
        let previous = self.state.swap(TaskState::Canceled as u8, Ordering::AcqRel);
        if previous != TaskState::Canceled as u8 {
            log::debug!("Renderer task '{}' canceled", self.name);
        }
    }

    /// Registers a callback fired by `TaskScheduler::update()` once the task has
    /// completed. Callbacks persist across re-submissions.
    pub fn on_complete(&self, callback: impl FnMut(&RendererTask) + Send + 'static) {
        lock(&self.on_complete).push(Box::new(callback));
    }

    /// Blocks until this task is complete or canceled, running it to exhaustion on
    /// the core thread instead of waiting for ambient scheduling.
    ///
    /// See [`SyncBridge::wait`].
    pub fn wait(self: &Arc<Self>, bridge: &SyncBridge) -> Result<()> {
        bridge.wait(self)
    }

    /// Resets the task to `Idle` for a new submission. Fails while the worker is
    /// on the stack, including a worker whose task was canceled mid-invocation.
    pub(crate) fn reset_for_submission(&self) -> std::result::Result<(), TaskState> {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                let running = current == TaskState::Executing as u8
                    || self.in_worker.load(Ordering::SeqCst);
                (!running).then_some(TaskState::Idle as u8)
            })
            .map(|_| ())
            .map_err(TaskState::from_u8)
    }

    pub(crate) fn begin_execution(&self) -> BeginOutcome {
        match self.state.compare_exchange(
            TaskState::Idle as u8,
            TaskState::Executing as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {
                self.in_worker.store(true, Ordering::SeqCst);
                BeginOutcome::Started
            }
            Err(current) if current == TaskState::Executing as u8 => BeginOutcome::Busy,
            Err(_) => BeginOutcome::Finished,
        }
    }

    /// Invokes the worker once and records the outcome. Returns true if the task
    /// reached a terminal state.
    ///
    /// Must follow a successful `begin_execution()`. A panicking worker cancels
    /// its task.
    pub(crate) fn run_worker(&self) -> bool {
        self.invocations.fetch_add(1, Ordering::AcqRel);
        let complete = match panic::catch_unwind(AssertUnwindSafe(|| lock(&self.worker).step())) {
            Ok(complete) => complete,
            Err(payload) => {
                log::error!(
                    "Worker of renderer task '{}' panicked, canceling it: {}",
                    self.name,
                    panic_message(payload.as_ref())
                );
                self.state.store(TaskState::Canceled as u8, Ordering::SeqCst);
                self.in_worker.store(false, Ordering::SeqCst);
                return true;
            }
        };

        // From here on a task canceled mid-invocation may be re-submitted.
        self.in_worker.store(false, Ordering::SeqCst);

        let next = if complete {
            TaskState::Complete
        } else {
            TaskState::Idle
        };

        // Only leave `Executing` if nobody canceled the task mid-invocation.
        match self.state.compare_exchange(
            TaskState::Executing as u8,
            next as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {
                if complete {
                    log::debug!(
                        "Renderer task '{}' completed after {} invocations",
                        self.name,
                        self.invocation_count()
                    );
                }
                complete
            }
            // Canceled, or canceled and already re-submitted as `Idle`.
            Err(current) => TaskState::from_u8(current).is_terminal(),
        }
    }

    /// Marks the task as present in the execution lists. Returns true if it was
    /// not there already and the caller must push it.
    pub(crate) fn claim_schedule_slot(&self) -> bool {
        !self.scheduled.swap(true, Ordering::AcqRel)
    }

    /// Removes the task from the execution lists. Returns true if it was
    /// re-submitted concurrently and the caller must keep it instead.
    pub(crate) fn release_schedule_slot(&self) -> bool {
        self.scheduled.store(false, Ordering::Release);
        self.state() == TaskState::Idle && self.claim_schedule_slot()
    }

    pub(crate) fn claim_notification_slot(&self) -> bool {
        !self.awaiting_notification.swap(true, Ordering::AcqRel)
    }

    /// Clears the unresolved marker and classifies the task for `update()`.
    pub(crate) fn release_notification_slot(&self) -> Resolution {
        self.awaiting_notification.store(false, Ordering::Release);
        match self.state() {
            TaskState::Complete => Resolution::Complete,
            TaskState::Canceled => Resolution::Dropped,
            _ if self.claim_notification_slot() => Resolution::Pending,
            // Re-submitted concurrently, `add_task()` already pushed it again.
            _ => Resolution::Dropped,
        }
    }

    pub(crate) fn notify_complete(&self) {
        let mut callbacks = std::mem::take(&mut *lock(&self.on_complete));
        for callback in callbacks.iter_mut() {
            callback(self);
        }

        // Keep callbacks registered while the old ones were running.
        let mut registered = lock(&self.on_complete);
        callbacks.append(&mut registered);
        *registered = callbacks;
    }
}

impl fmt::Debug for RendererTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererTask")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("invocations", &self.invocation_count())
            .finish()
    }
}
