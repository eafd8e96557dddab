//! Rendering system facade.
//!
//! `Renderer` ties together the two things the core thread does every frame:
//! advancing deferred tasks and invoking renderer extensions in pipeline order.
//! GPU passes themselves live outside this crate; the renderer only decides
//! what runs, and in which order.

pub mod debug_overlay;
pub mod extension;
pub mod tasks;

use std::sync::Arc;

use extension::{ExtensionId, ExtensionRegistry, RenderLocation, RenderView, RendererExtension};

use crate::core::MtResource;
use crate::engine_state::task_management::TaskScheduler;

/// Task-management and extension facet of the renderer.
///
/// Extensions may be registered from any thread. Rendering happens on the core
/// thread and works on a snapshot of the registry, so an extension may register
/// or unregister others while rendering.
pub struct Renderer {
    extensions: MtResource<ExtensionRegistry>,
    tasks: Arc<TaskScheduler>,
}

impl Renderer {
    /// Creates a renderer around an existing task scheduler.
    ///
    /// # Arguments
    /// * `tasks` - Scheduler advanced once per frame by the core thread
    pub fn new(tasks: Arc<TaskScheduler>) -> Self {
        Self {
            extensions: MtResource::new(ExtensionRegistry::new()),
            tasks,
        }
    }

    /// The task scheduler owned by this renderer.
    pub fn tasks(&self) -> &Arc<TaskScheduler> {
        &self.tasks
    }

    /// Adds an extension to the pipeline.
    pub fn register_extension(&self, extension: Arc<dyn RendererExtension>) -> ExtensionId {
        self.extensions.get_mut().register(extension)
    }

    /// Removes an extension from the pipeline.
    pub fn unregister_extension(&self, id: ExtensionId) -> Option<Arc<dyn RendererExtension>> {
        self.extensions.get_mut().unregister(id)
    }

    /// Names of all registered extensions in execution order.
    pub fn extension_order(&self) -> Vec<String> {
        self.extensions
            .get()
            .iter()
            .map(|(_, extension)| extension.name().to_string())
            .collect()
    }

    /// Invokes every extension registered at `location` whose `check` accepts the view.
    ///
    /// # Returns
    /// Number of extensions that rendered
    pub fn render_location(&self, location: RenderLocation, view: &RenderView) -> usize {
        let extensions: Vec<_> = self
            .extensions
            .get()
            .iter_location(location)
            .cloned()
            .collect();

        let mut rendered = 0;
        for extension in extensions {
            if extension.check(view) {
                extension.render(view);
                rendered += 1;
            }
        }
        rendered
    }

    /// Walks every location in pipeline order for one view.
    ///
    /// # Returns
    /// Number of extensions that rendered
    pub fn render_view(&self, view: &RenderView) -> usize {
        RenderLocation::ALL
            .iter()
            .map(|location| self.render_location(*location, view))
            .sum()
    }
}
