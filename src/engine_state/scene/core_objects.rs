//! Objects created and destroyed on the issuing thread, mirrored on the core
//! thread.
//!
//! Creation and destruction are staged and only applied to the core view by
//! `sync_to_core()`, so the core thread never observes an object mid-frame.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::ObjectId;
use crate::core::MtResource;

/// Reconciles objects created or destroyed on the issuing thread with the core
/// thread's view.
pub trait CoreObjectSync: Send + Sync {
    /// Applies every staged creation and destruction to the core view.
    fn sync_to_core(&self);
}

#[derive(Default)]
struct CoreObjectState {
    pending_create: Vec<(ObjectId, String)>,
    pending_destroy: Vec<ObjectId>,
    initialized: BTreeMap<ObjectId, String>,
}

/// Registry of objects shared with the core thread.
#[derive(Clone)]
pub struct CoreObjectManager {
    next_id: Arc<AtomicU64>,
    state: MtResource<CoreObjectState>,
}

impl CoreObjectManager {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1)),
            state: MtResource::default(),
        }
    }

    /// Stages the creation of a new object.
    ///
    /// # Arguments
    /// * `name` - Diagnostic label
    ///
    /// # Returns
    /// The id of the new object. It is initialized on the core thread at the next sync.
    pub fn create(&self, name: impl Into<String>) -> ObjectId {
        let id = ObjectId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.state.get_mut().pending_create.push((id, name.into()));
        id
    }

    /// Stages the destruction of an object.
    pub fn destroy(&self, id: ObjectId) {
        let mut state = self.state.get_mut();
        let before = state.pending_create.len();
        state.pending_create.retain(|(pending, _)| *pending != id);

        // Created and destroyed before the core thread ever saw it.
        if state.pending_create.len() == before {
            state.pending_destroy.push(id);
        }
    }

    /// Returns true once the object's creation reached the core thread.
    pub fn is_core_initialized(&self, id: ObjectId) -> bool {
        self.state.get().initialized.contains_key(&id)
    }

    /// Name of an object initialized on the core thread.
    pub fn core_object_name(&self, id: ObjectId) -> Option<String> {
        self.state.get().initialized.get(&id).cloned()
    }

    /// Number of objects alive on the core thread.
    pub fn core_object_count(&self) -> usize {
        self.state.get().initialized.len()
    }
}

impl Default for CoreObjectManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreObjectSync for CoreObjectManager {
    fn sync_to_core(&self) {
        let mut state = self.state.get_mut();
        let state = &mut *state;

        let created = state.pending_create.len();
        let destroyed = state.pending_destroy.len();

        for (id, name) in state.pending_create.drain(..) {
            state.initialized.insert(id, name);
        }
        for id in state.pending_destroy.drain(..) {
            state.initialized.remove(&id);
        }

        if created + destroyed > 0 {
            log::trace!(
                "Synced core objects: {} created, {} destroyed",
                created,
                destroyed
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_is_staged_until_sync() {
        let objects = CoreObjectManager::new();
        let camera = objects.create("main camera");
        assert!(!objects.is_core_initialized(camera));

        objects.sync_to_core();
        assert!(objects.is_core_initialized(camera));
        assert_eq!(objects.core_object_name(camera).as_deref(), Some("main camera"));

        objects.destroy(camera);
        assert!(objects.is_core_initialized(camera));
        objects.sync_to_core();
        assert!(!objects.is_core_initialized(camera));
    }

    #[test]
    fn destroying_an_unsynced_object_never_reaches_the_core() {
        let objects = CoreObjectManager::new();
        let transient = objects.create("transient");
        let kept = objects.create("kept");
        objects.destroy(transient);
        objects.sync_to_core();

        assert!(!objects.is_core_initialized(transient));
        assert!(objects.is_core_initialized(kept));
        assert_eq!(objects.core_object_count(), 1);
    }

    #[test]
    fn ids_are_unique() {
        let objects = CoreObjectManager::new();
        let first = objects.create("a");
        let second = objects.create("b");
        assert_ne!(first, second);
    }
}
