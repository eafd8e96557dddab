//! Shared, lock-protected state handed between threads.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted resource container with read-write locking.
///
/// `MtResource` is how data crosses between the issuing thread and the core
/// thread: the extension registry, the published scene view and the payloads
/// of streaming and readback workers all live in one. Clones share the same
/// underlying value.
///
/// # Type Parameters
/// - `T`: The type of the contained resource, must be `Send + Sync`
///
/// # Examples
///
/// ## Sharing Between Threads
/// ```
/// # use std::thread;
/// use render_task_core::core::MtResource;
///
/// let uploaded = MtResource::new(Vec::<u8>::new());
/// let core_side = uploaded.clone();
///
/// let handle = thread::spawn(move || {
///     core_side.get_mut().extend_from_slice(&[1, 2, 3]);
/// });
///
/// handle.join().unwrap();
/// assert_eq!(uploaded.get().len(), 3);
/// ```
///
/// # Performance Considerations
/// - Read operations (`get()`) can occur concurrently
/// - Write operations (`get_mut()`) are exclusive and will block other operations
/// - A lock poisoned by a panicking holder is recovered rather than propagated
pub struct MtResource<T: Send + Sync> {
    resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    ///
    /// # Arguments
    /// * `resource` - The value to be stored in the resource
    ///
    /// # Returns
    /// A new `MtResource` containing the provided value
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read-only guard that allows reading the contained value.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a mutable guard that allows modifying the contained value.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if both handles point at the same underlying value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.resource, &other.resource)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

impl<T: Send + Sync + Default + 'static> Default for MtResource<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
