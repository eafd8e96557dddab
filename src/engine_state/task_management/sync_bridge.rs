//! # Synchronization Bridge
//!
//! Some callers cannot tolerate a task finishing on an arbitrary future frame,
//! for example a save step that needs the result of a GPU readback right now.
//! `SyncBridge` runs such a task to exhaustion on the core thread and blocks the
//! caller until it is done.
//!
//! ## Protocol
//! 1. Publish pending scene transforms and core object changes to the core thread
//! 2. Queue a command that runs only the waited-on task until it is complete or canceled
//! 3. Submit the command queue and block until the core thread has executed it
//!
//! Once `wait()` returns, the task is in a terminal state and every side effect of
//! its worker is visible to the caller.

use std::sync::Arc;

use super::task::TaskHandle;
use super::TaskScheduler;
use crate::engine_state::core_thread::CommandDispatch;
use crate::engine_state::scene::core_objects::CoreObjectSync;
use crate::engine_state::scene::ScenePublisher;
use crate::errors::Result;

/// Blocking, on-demand execution of renderer tasks.
///
/// All collaborators are injected at construction, so the bridge can drive any
/// scheduler through any command queue.
#[derive(Clone)]
pub struct SyncBridge {
    scheduler: Arc<TaskScheduler>,
    dispatch: Arc<dyn CommandDispatch>,
    scene: Arc<dyn ScenePublisher>,
    core_objects: Arc<dyn CoreObjectSync>,
}

impl SyncBridge {
    /// Creates a new bridge.
    ///
    /// # Arguments
    /// * `scheduler` - Scheduler whose tasks are executed
    /// * `dispatch` - Command queue of the thread that owns task execution
    /// * `scene` - Publisher of issuing-thread transform changes
    /// * `core_objects` - Reconciles objects created or destroyed on the issuing thread
    pub fn new(
        scheduler: Arc<TaskScheduler>,
        dispatch: Arc<dyn CommandDispatch>,
        scene: Arc<dyn ScenePublisher>,
        core_objects: Arc<dyn CoreObjectSync>,
    ) -> Self {
        Self {
            scheduler,
            dispatch,
            scene,
            core_objects,
        }
    }

    /// Runs `task` to completion on the core thread and blocks until it is done.
    ///
    /// The task does not need to have been submitted. No other task's worker is
    /// invoked.
    ///
    /// A panicking worker is caught on the core thread and leaves the task
    /// `Canceled`, which still counts as done.
    ///
    /// # Returns
    /// An error if the core thread is gone
    pub fn wait(&self, task: &TaskHandle) -> Result<()> {
        if task.state().is_terminal() {
            return Ok(());
        }

        self.publish_issuing_state();

        let scheduler = self.scheduler.clone();
        let waited = task.clone();
        self.dispatch.queue_command(Box::new(move || {
            scheduler.process_task(&waited, true);
        }));
        self.dispatch.submit_and_block()?;

        if !task.state().is_terminal() {
            // Only reachable when a worker waits on its own task.
            log::warn!(
                "Task '{}' is still {:?} after a forced run",
                task.name(),
                task.state()
            );
        }
        Ok(())
    }

    /// Runs every pending task to completion on the core thread and blocks until
    /// the scheduler is drained.
    ///
    /// Called from inside a worker, the drain runs inline and only covers tasks
    /// the enclosing pass is not already holding, so those may still be pending
    /// when this returns.
    pub fn wait_all(&self) -> Result<()> {
        self.publish_issuing_state();

        let scheduler = self.scheduler.clone();
        self.dispatch.queue_command(Box::new(move || {
            scheduler.process_tasks(true);
        }));
        self.dispatch.submit_and_block()
    }

    /// Scheduler driven by this bridge.
    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    fn publish_issuing_state(&self) {
        self.scene.update_core_object_transforms();
        self.core_objects.sync_to_core();
    }
}
