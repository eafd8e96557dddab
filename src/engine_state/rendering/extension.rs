//! Renderer extensions and their execution order.
//!
//! Extensions hook into the render pipeline at a coarse `RenderLocation` and are
//! ordered within it by priority. The registry keeps them in one total order:
//! location ascending, then priority descending, then registration order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::engine_state::scene::ObjectId;

/// Pipeline phase an extension runs in, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderLocation {
    /// Before any scene geometry is rendered
    PreBasePass,
    /// After the G-buffer has been populated, before lighting
    PostBasePass,
    /// After lighting, before post-processing
    PostLightPass,
    /// On top of the final image
    Overlay,
}

impl RenderLocation {
    /// Every location in execution order.
    pub const ALL: [RenderLocation; 4] = [
        RenderLocation::PreBasePass,
        RenderLocation::PostBasePass,
        RenderLocation::PostLightPass,
        RenderLocation::Overlay,
    ];
}

/// The view an extension is asked to render into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderView {
    /// Camera object the view renders from
    pub camera: ObjectId,
    /// Index of the frame being rendered
    pub frame_index: u64,
}

/// A callback participating in the render pipeline.
///
/// Location and priority are read once, at registration.
pub trait RendererExtension: Send + Sync {
    /// Diagnostic label.
    fn name(&self) -> &str;

    /// Pipeline phase the extension runs in.
    fn location(&self) -> RenderLocation;

    /// Higher priorities run first within a location.
    fn priority(&self) -> i32 {
        0
    }

    /// Returns true if the extension wants to render `view`.
    fn check(&self, _view: &RenderView) -> bool {
        true
    }

    /// Renders the extension for `view`. Called on the core thread.
    fn render(&self, view: &RenderView);
}

/// Registration handle, also the final ordering tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ExtensionKey {
    location: RenderLocation,
    priority: Reverse<i32>,
    id: ExtensionId,
}

/// Ordered set of registered extensions.
#[derive(Default)]
pub struct ExtensionRegistry {
    entries: BTreeMap<ExtensionKey, Arc<dyn RendererExtension>>,
    keys: HashMap<ExtensionId, ExtensionKey>,
    next_id: u64,
}

impl ExtensionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an extension at its place in the execution order.
    ///
    /// # Returns
    /// The handle used to unregister it
    pub fn register(&mut self, extension: Arc<dyn RendererExtension>) -> ExtensionId {
        let id = ExtensionId(self.next_id);
        self.next_id += 1;

        let key = ExtensionKey {
            location: extension.location(),
            priority: Reverse(extension.priority()),
            id,
        };

        log::debug!(
            "Registered renderer extension '{}' at {:?} with priority {}",
            extension.name(),
            key.location,
            key.priority.0
        );

        self.entries.insert(key, extension);
        self.keys.insert(id, key);
        id
    }

    /// Removes an extension.
    ///
    /// # Returns
    /// The extension, or `None` if the id is not registered
    pub fn unregister(&mut self, id: ExtensionId) -> Option<Arc<dyn RendererExtension>> {
        let key = self.keys.remove(&id)?;
        self.entries.remove(&key)
    }

    /// Every extension in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (ExtensionId, &Arc<dyn RendererExtension>)> {
        self.entries.iter().map(|(key, extension)| (key.id, extension))
    }

    /// Extensions of one location in execution order.
    pub fn iter_location(
        &self,
        location: RenderLocation,
    ) -> impl Iterator<Item = &Arc<dyn RendererExtension>> {
        let first = ExtensionKey {
            location,
            priority: Reverse(i32::MAX),
            id: ExtensionId(0),
        };
        let last = ExtensionKey {
            location,
            priority: Reverse(i32::MIN),
            id: ExtensionId(u64::MAX),
        };
        self.entries.range(first..=last).map(|(_, extension)| extension)
    }

    /// Number of registered extensions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.values().map(|extension| extension.name()))
            .finish()
    }
}
