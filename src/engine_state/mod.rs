//! # Engine State Module
//!
//! Wires the task system to the core thread and drives it frame by frame.
//!
//! ## Key Components
//!
//! * `Engine` - Owns every subsystem and advances them once per frame
//! * `core_thread` - The dedicated rendering thread and its command queue
//! * `rendering` - Renderer extensions and sample incremental workers
//! * `scene` - Transform and object state published to the core thread
//! * `task_management` - Renderer tasks, the scheduler and the synchronization bridge
//!
//! ## Architecture
//!
//! Collaborators are created here and injected into whoever needs them, so the
//! scheduler and the bridge never reach for a process-wide renderer. Each frame
//! the issuing thread fires completion callbacks, publishes scene state and hands
//! the core thread one command that advances tasks and renders every view.

use std::sync::Arc;

use core_thread::{CommandDispatch, CoreThread};
use rendering::extension::{ExtensionId, RenderView, RendererExtension};
use rendering::Renderer;
use scene::core_objects::{CoreObjectManager, CoreObjectSync};
use scene::{ObjectId, SceneManager, ScenePublisher};
use task_management::sync_bridge::SyncBridge;
use task_management::task::TaskHandle;
use task_management::TaskScheduler;

use crate::config::EngineConfig;
use crate::core::MtResource;
use crate::errors::Result;

pub mod core_thread;
pub mod rendering;
pub mod scene;
pub mod task_management;

/// The main state container for the render task core.
///
/// # Examples
///
/// ```
/// use render_task_core::config::EngineConfig;
/// use render_task_core::engine_state::Engine;
/// use render_task_core::engine_state::task_management::task::RendererTask;
///
/// let mut engine = Engine::new(EngineConfig::default()).unwrap();
/// let task = RendererTask::create("warm caches", || true);
/// engine.add_task(&task).unwrap();
///
/// // Main loop
/// engine.frame().unwrap();
///
/// engine.wait(&task).unwrap();
/// assert!(task.is_complete());
/// engine.shutdown().unwrap();
/// ```
pub struct Engine {
    config: EngineConfig,
    core_thread: Arc<CoreThread>,
    renderer: Arc<Renderer>,
    scene: Arc<SceneManager>,
    core_objects: Arc<CoreObjectManager>,
    bridge: SyncBridge,
    /// Cameras rendered every frame, readable from the core thread
    views: MtResource<Vec<ObjectId>>,
    frame_index: u64,
}

impl Engine {
    /// Spawns the core thread and wires every subsystem together.
    ///
    /// # Arguments
    /// * `config` - Core thread and scheduling settings
    ///
    /// # Returns
    /// The engine, or an error if the core thread could not be spawned
    pub fn new(config: EngineConfig) -> Result<Self> {
        let core_thread = Arc::new(CoreThread::spawn(&config.core_thread)?);
        let scheduler = Arc::new(TaskScheduler::new());
        let renderer = Arc::new(Renderer::new(scheduler.clone()));
        let scene = Arc::new(SceneManager::new());
        let core_objects = Arc::new(CoreObjectManager::new());

        let bridge = SyncBridge::new(
            scheduler,
            core_thread.clone(),
            scene.clone(),
            core_objects.clone(),
        );

        log::info!("Engine initialized with core thread '{}'", config.core_thread.name);

        Ok(Self {
            config,
            core_thread,
            renderer,
            scene,
            core_objects,
            bridge,
            views: MtResource::new(Vec::new()),
            frame_index: 0,
        })
    }

    /// Advances one frame.
    ///
    /// Completion callbacks fire first, then scene state is published and a
    /// single command is handed to the core thread that runs one task pass and
    /// renders every view. The call does not wait for the core thread.
    pub fn frame(&mut self) -> Result<()> {
        self.renderer.tasks().update();
        self.scene.update_core_object_transforms();
        self.core_objects.sync_to_core();

        let renderer = self.renderer.clone();
        let views = self.views.clone();
        let frame_index = self.frame_index;
        self.core_thread.queue_command(Box::new(move || {
            renderer.tasks().process_tasks(false);
            for camera in views.get().iter() {
                renderer.render_view(&RenderView {
                    camera: *camera,
                    frame_index,
                });
            }
        }));

        self.frame_index += 1;
        self.core_thread.submit(false)
    }

    /// Submits a task to the scheduler.
    pub fn add_task(&self, task: &TaskHandle) -> Result<()> {
        self.renderer.tasks().add_task(task)
    }

    /// Runs one task to completion and blocks until it is done.
    pub fn wait(&self, task: &TaskHandle) -> Result<()> {
        self.bridge.wait(task)
    }

    /// Runs every pending task to completion and blocks until they are done.
    pub fn wait_all(&self) -> Result<()> {
        self.bridge.wait_all()
    }

    /// Adds a camera whose view is rendered every frame.
    pub fn add_view(&self, camera: ObjectId) {
        let mut views = self.views.get_mut();
        if !views.contains(&camera) {
            views.push(camera);
        }
    }

    /// Stops rendering a camera's view.
    pub fn remove_view(&self, camera: ObjectId) {
        self.views.get_mut().retain(|view| *view != camera);
    }

    /// Adds an extension to the render pipeline.
    pub fn register_extension(&self, extension: Arc<dyn RendererExtension>) -> ExtensionId {
        self.renderer.register_extension(extension)
    }

    /// Stops the core thread, force-draining pending tasks first if configured.
    pub fn shutdown(&self) -> Result<()> {
        if self.core_thread.is_running() && self.config.tasks.drain_on_shutdown {
            self.bridge.wait_all()?;
            self.renderer.tasks().update();
        }
        self.core_thread.shutdown()
    }

    /// Index of the next frame.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The renderer facet: extensions and the task scheduler.
    pub fn renderer(&self) -> &Arc<Renderer> {
        &self.renderer
    }

    /// Issuing-side scene transforms.
    pub fn scene(&self) -> &Arc<SceneManager> {
        &self.scene
    }

    /// Objects shared with the core thread.
    pub fn core_objects(&self) -> &Arc<CoreObjectManager> {
        &self.core_objects
    }

    /// The synchronization bridge used by `wait()`.
    pub fn bridge(&self) -> &SyncBridge {
        &self.bridge
    }

    /// The core thread's command queue.
    pub fn core_thread(&self) -> &Arc<CoreThread> {
        &self.core_thread
    }
}
