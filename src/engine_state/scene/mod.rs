//! # Scene State
//!
//! Transforms are written on the issuing thread and read on the core thread.
//! Writes land in a pending set and only become visible to the core thread when
//! they are published, which happens once per frame and before every forced
//! synchronous task run.
//!
//! ## Key Components
//! * `SceneManager` - Issuing-side transform storage and its published core view
//! * `ScenePublisher` - The publish hook consumed by the synchronization bridge
//! * `core_objects` - Creation and destruction of objects shared with the core thread

pub mod core_objects;

use std::collections::HashMap;

use cgmath::{Matrix4, One, Quaternion, Vector3};

use crate::core::MtResource;

/// Identifier of an object shared between the issuing and core threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// Publishes pending issuing-thread scene changes to the core thread's view.
pub trait ScenePublisher: Send + Sync {
    /// Copies every transform changed since the last call into the core view.
    fn update_core_object_transforms(&self);
}

/// Position, orientation and scale of a scene object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// World-space position
    pub position: Vector3<f32>,
    /// World-space orientation
    pub rotation: Quaternion<f32>,
    /// Per-axis scale
    pub scale: Vector3<f32>,
}

impl Transform {
    /// A transform at `position` with no rotation and unit scale.
    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// World matrix: scale, then rotate, then translate.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

#[derive(Default)]
struct SceneState {
    /// Latest transform of every object, as seen by the issuing thread
    current: HashMap<ObjectId, Transform>,
    /// Objects changed since the last publish
    dirty: Vec<ObjectId>,
    /// Objects removed since the last publish
    removed: Vec<ObjectId>,
    /// What the core thread renders with
    published: HashMap<ObjectId, Transform>,
    publish_count: u64,
}

/// Transform storage split into an issuing-side view and a published core view.
#[derive(Clone, Default)]
pub struct SceneManager {
    state: MtResource<SceneState>,
}

impl SceneManager {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transform of an object. Visible to the core thread after the
    /// next publish.
    pub fn set_transform(&self, id: ObjectId, transform: Transform) {
        let mut state = self.state.get_mut();
        if state.current.insert(id, transform) != Some(transform) {
            state.dirty.push(id);
        }
    }

    /// Latest transform written on the issuing thread.
    pub fn transform(&self, id: ObjectId) -> Option<Transform> {
        self.state.get().current.get(&id).copied()
    }

    /// Transform as currently seen by the core thread.
    pub fn core_transform(&self, id: ObjectId) -> Option<Transform> {
        self.state.get().published.get(&id).copied()
    }

    /// Removes an object from the scene. The core view drops it on the next publish.
    pub fn remove(&self, id: ObjectId) {
        let mut state = self.state.get_mut();
        if state.current.remove(&id).is_some() {
            state.removed.push(id);
        }
    }

    /// Number of changes waiting to be published.
    pub fn pending_changes(&self) -> usize {
        let state = self.state.get();
        state.dirty.len() + state.removed.len()
    }

    /// Number of publishes performed so far.
    pub fn publish_count(&self) -> u64 {
        self.state.get().publish_count
    }
}

impl ScenePublisher for SceneManager {
    fn update_core_object_transforms(&self) {
        let mut state = self.state.get_mut();
        let state = &mut *state;

        let dirty = std::mem::take(&mut state.dirty);
        let removed = std::mem::take(&mut state.removed);
        let changed = dirty.len() + removed.len();

        for id in dirty {
            if let Some(transform) = state.current.get(&id) {
                state.published.insert(id, *transform);
            }
        }
        for id in removed {
            if !state.current.contains_key(&id) {
                state.published.remove(&id);
            }
        }

        state.publish_count += 1;
        if changed > 0 {
            log::trace!("Published {} transform changes to the core thread", changed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Rotation3, SquareMatrix, Vector4};

    #[test]
    fn identity_transform_is_identity_matrix() {
        assert_eq!(Transform::default().to_matrix(), Matrix4::identity());
    }

    #[test]
    fn matrix_applies_scale_before_translation() {
        let transform = Transform {
            position: Vector3::new(1.0, 2.0, 3.0),
            rotation: Quaternion::from_angle_z(Deg(0.0)),
            scale: Vector3::new(2.0, 2.0, 2.0),
        };
        let point = transform.to_matrix() * Vector4::new(1.0, 1.0, 1.0, 1.0);
        assert_eq!(point, Vector4::new(3.0, 4.0, 5.0, 1.0));
    }

    #[test]
    fn writes_are_invisible_until_published() {
        let scene = SceneManager::new();
        let id = ObjectId(7);
        let transform = Transform::from_position(Vector3::new(0.0, 5.0, 0.0));

        scene.set_transform(id, transform);
        assert_eq!(scene.transform(id), Some(transform));
        assert_eq!(scene.core_transform(id), None);
        assert_eq!(scene.pending_changes(), 1);

        scene.update_core_object_transforms();
        assert_eq!(scene.core_transform(id), Some(transform));
        assert_eq!(scene.pending_changes(), 0);

        scene.remove(id);
        assert_eq!(scene.core_transform(id), Some(transform));
        scene.update_core_object_transforms();
        assert_eq!(scene.core_transform(id), None);
        assert_eq!(scene.publish_count(), 2);
    }

    #[test]
    fn removing_then_re_adding_keeps_the_object() {
        let scene = SceneManager::new();
        let id = ObjectId(1);
        scene.set_transform(id, Transform::default());
        scene.update_core_object_transforms();

        scene.remove(id);
        let moved = Transform::from_position(Vector3::new(1.0, 0.0, 0.0));
        scene.set_transform(id, moved);
        scene.update_core_object_transforms();

        assert_eq!(scene.core_transform(id), Some(moved));
    }
}
