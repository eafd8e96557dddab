//! # Task Management System
//!
//! This module hands deferred work from the issuing (simulation) thread to the
//! core (rendering) thread and executes it there incrementally, one worker
//! invocation per task per pass.
//!
//! ## Architecture Overview
//!
//! - `RendererTask`: A named unit of work with an atomic lifecycle state
//! - `TaskScheduler`: Owns the queued, running and remaining task lists
//! - `SyncBridge`: Forces a task to completion and blocks the caller until it is done
//!
//! ## Task Lifecycle
//! 1. Tasks are created with `RendererTask::create()` and submitted via `TaskScheduler::add_task()`
//! 2. Each pass of `process_tasks()` splices the queued tasks behind the ones already running
//! 3. Every running task gets exactly one worker invocation per pass
//! 4. Incomplete tasks are retried next pass ahead of anything queued after them
//! 5. `update()` on the issuing thread fires completion callbacks
//!
//! ## Locking
//! The queued list is guarded by one mutex, held only while a task is appended
//! or while the queue is spliced into the running list. Workers are invoked with
//! no lock held, so producers never wait on a long running worker.
//!
//! ## Example Usage
//! ```rust
//! use render_task_core::engine_state::task_management::{task::RendererTask, TaskScheduler};
//!
//! let scheduler = TaskScheduler::new();
//! let mut steps = 0;
//! let task = RendererTask::create("upload", move || {
//!     steps += 1;
//!     steps == 2
//! });
//!
//! scheduler.add_task(&task).unwrap();
//!
//! // On the core thread, once per frame:
//! scheduler.process_tasks(false);
//! assert!(!task.is_complete());
//! scheduler.process_tasks(false);
//! assert!(task.is_complete());
//! ```

pub mod sync_bridge;
pub mod task;

use std::mem;
use std::sync::Mutex;

use task::{BeginOutcome, RendererTask, Resolution, TaskHandle};
use web_time::Instant;

use crate::core::lock;
use crate::errors::{RenderCoreError, Result};

/// Tasks touched by the issuing thread. Guarded by the task mutex.
#[derive(Default)]
struct SubmittedTasks {
    /// Submitted, not yet handed to the core thread
    queued: Vec<TaskHandle>,
    /// Submitted, completion not yet reported by `update()`
    unresolved: Vec<TaskHandle>,
}

/// Tasks handed to the core thread. Only the core thread mutates this.
#[derive(Default)]
struct RunningTasks {
    /// Awaiting their next pass, in execution order
    waiting: Vec<TaskHandle>,
    /// Taken out by passes that are still invoking workers
    in_flight: usize,
}

/// Scheduler-owned task queues and the per-pass execution state machine.
///
/// `add_task()` and `update()` run on the issuing thread. `process_tasks()` and
/// `process_task()` run on the core thread.
pub struct TaskScheduler {
    submitted: Mutex<SubmittedTasks>,
    /// Never held while a worker runs. Lock order is `submitted`, then `running`.
    running: Mutex<RunningTasks>,
}

impl TaskScheduler {
    /// Creates a scheduler with empty queues.
    pub fn new() -> Self {
        Self {
            submitted: Mutex::new(SubmittedTasks::default()),
            running: Mutex::new(RunningTasks::default()),
        }
    }

    /// Queues a task for execution on the core thread.
    ///
    /// The task's state is reset to `Idle`, which also covers re-submitting a task
    /// that already completed or was canceled. A task that is still pending is not
    /// listed twice.
    ///
    /// # Arguments
    /// * `task` - The task to queue
    ///
    /// # Returns
    /// `Err(TaskAlreadyExecuting)` if the task's worker is running right now. This
    /// is a contract violation on the caller's side, not a transient condition.
    pub fn add_task(&self, task: &TaskHandle) -> Result<()> {
        let mut submitted = lock(&self.submitted);

        if task.reset_for_submission().is_err() {
            log::error!(
                "Task '{}' is already executing, it cannot be queued again until it finishes",
                task.name()
            );
            return Err(RenderCoreError::TaskAlreadyExecuting(task.name().to_string()));
        }

        if task.claim_schedule_slot() {
            submitted.queued.push(task.clone());
        }
        if task.claim_notification_slot() {
            submitted.unresolved.push(task.clone());
        }

        log::debug!("Queued renderer task '{}'", task.name());
        Ok(())
    }

    /// Fires completion callbacks for tasks that finished since the last call.
    ///
    /// Call once per frame on the issuing thread. Completed tasks have their
    /// callbacks invoked, pending tasks are carried to the next frame and canceled
    /// tasks are dropped. No worker is invoked here, and callbacks run without any
    /// scheduler lock held, so they may submit tasks.
    pub fn update(&self) {
        let unresolved = mem::take(&mut lock(&self.submitted).unresolved);
        if unresolved.is_empty() {
            return;
        }

        let mut carried = Vec::new();
        for task in unresolved {
            match task.release_notification_slot() {
                Resolution::Pending => carried.push(task),
                Resolution::Complete => task.notify_complete(),
                Resolution::Dropped => {}
            }
        }

        let mut submitted = lock(&self.submitted);
        // Carried tasks were submitted before anything added while callbacks ran.
        carried.append(&mut submitted.unresolved);
        submitted.unresolved = carried;
    }

    /// Runs one scheduling pass, or passes until nothing is left when `force_all`.
    ///
    /// Every running task gets one worker invocation per pass, in submission
    /// order. Tasks that are complete or canceled when their turn comes are
    /// dropped without invoking the worker.
    ///
    /// # Arguments
    /// * `force_all` - Keep running passes until every task is complete or canceled
    pub fn process_tasks(&self, force_all: bool) {
        self.splice_queued();

        loop {
            let running = {
                let mut running = lock(&self.running);
                let taken = mem::take(&mut running.waiting);
                running.in_flight += taken.len();
                taken
            };
            if running.is_empty() {
                break;
            }

            let executed = running.len();
            let mut remaining = Vec::with_capacity(running.len());
            for task in running {
                if Self::step(&task) {
                    remaining.push(task);
                }
            }

            log::trace!(
                "Task pass finished: {} executed, {} remaining",
                executed,
                remaining.len()
            );

            let mut running = lock(&self.running);
            running.in_flight -= executed;
            // Anything spliced while the workers ran goes behind the tasks in flight.
            remaining.append(&mut running.waiting);
            running.waiting = remaining;

            if !force_all || running.waiting.is_empty() {
                break;
            }
        }
    }

    /// Runs a single task, ignoring every other pending task.
    ///
    /// Queued tasks are still handed to the core thread so the queue does not
    /// stall, but none of their workers are invoked.
    ///
    /// # Arguments
    /// * `task` - The task to run
    /// * `force_all` - Invoke the worker repeatedly until the task is complete or
    ///   canceled, instead of once
    pub fn process_task(&self, task: &RendererTask, force_all: bool) {
        self.splice_queued();

        let started = Instant::now();
        let invocations_before = task.invocation_count();
        loop {
            if task.begin_execution() != BeginOutcome::Started {
                break;
            }
            if task.run_worker() || !force_all {
                break;
            }
        }

        if force_all {
            log::debug!(
                "Ran renderer task '{}' synchronously in {:?} ({} invocations, {:?})",
                task.name(),
                started.elapsed(),
                task.invocation_count() - invocations_before,
                task.state()
            );
        }
    }

    /// Number of tasks submitted but not yet handed to the core thread.
    pub fn queued_count(&self) -> usize {
        lock(&self.submitted).queued.len()
    }

    /// Number of tasks handed to the core thread, including those a pass in
    /// progress has yet to hand back.
    pub fn running_count(&self) -> usize {
        let running = lock(&self.running);
        running.waiting.len() + running.in_flight
    }

    /// Number of tasks whose completion has not been reported by `update()` yet.
    pub fn unresolved_count(&self) -> usize {
        lock(&self.submitted).unresolved.len()
    }

    /// True when no task is queued or running, including during a pass.
    pub fn is_idle(&self) -> bool {
        let submitted = lock(&self.submitted);
        let running = lock(&self.running);
        submitted.queued.is_empty() && running.waiting.is_empty() && running.in_flight == 0
    }

    fn splice_queued(&self) {
        let mut submitted = lock(&self.submitted);
        if !submitted.queued.is_empty() {
            let queued = mem::take(&mut submitted.queued);
            lock(&self.running).waiting.extend(queued);
        }
    }

    /// Gives `task` its invocation for this pass. Returns true if it must be
    /// retried in a later pass.
    fn step(task: &TaskHandle) -> bool {
        match task.begin_execution() {
            BeginOutcome::Started => !task.run_worker() || task.release_schedule_slot(),
            // Executing further up the stack through a forced run.
            BeginOutcome::Busy => true,
            BeginOutcome::Finished => task.release_schedule_slot(),
        }
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}
