//! # Object Pool
//!
//! Per-type slot allocator for component instances that are frequently
//! created and destroyed.
//!
//! Released slots go onto a free list and are refilled by the next
//! allocation instead of returning memory to the global allocator. Every
//! slot carries a generation counter that is bumped on release, so a
//! [`PoolHandle`] to a previous occupant never resolves to the new one.

/// Handle to a live object in an [`ObjectPool`].
///
/// The slot index is embedded in the handle, so lookups and releases are
/// O(1). The generation detects handles that outlived their object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolHandle {
    /// Slot index into the pool.
    index: u32,
    /// Generation of the slot when the handle was issued.
    generation: u32,
}

impl PoolHandle {
    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Returns the generation the handle was issued with.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A growable free-list pool of `T`.
///
/// # Thread Safety
///
/// The pool is NOT internally synchronised. In the runtime it is only
/// mutated during the single-threaded commit phase.
///
/// # Example
///
/// ```rust
/// use ecs_component::ObjectPool;
///
/// let mut pool: ObjectPool<String> = ObjectPool::new();
/// let handle = pool.allocate("first".to_string());
/// assert_eq!(pool.get(handle).map(String::as_str), Some("first"));
///
/// assert_eq!(pool.release(handle).as_deref(), Some("first"));
/// assert!(pool.get(handle).is_none());
/// ```
#[derive(Debug)]
pub struct ObjectPool<T> {
    /// Every slot ever created, live or free.
    slots: Vec<Slot<T>>,
    /// Indices of free slots; the most recently released is reused first.
    free_list: Vec<u32>,
    /// Number of live objects.
    live: usize,
}

impl<T> ObjectPool<T> {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Creates an empty pool with room for `capacity` objects before the
    /// slot table reallocates.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Returns the number of live objects.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no object is live.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns the number of slots, live or free.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of free slots waiting to be reused.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Stores `value`, reusing a released slot when one is available.
    pub fn allocate(&mut self, value: T) -> PoolHandle {
        self.live += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return PoolHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        PoolHandle {
            index,
            generation: 0,
        }
    }

    /// Releases the object behind `handle` and returns it.
    ///
    /// Returns `None` if the handle does not refer to a live object of this
    /// pool (already released, or issued by another pool).
    pub fn release(&mut self, handle: PoolHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }

        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        self.live -= 1;
        Some(value)
    }

    /// Overwrites the object behind `handle` in place, returning the old one.
    pub fn replace(&mut self, handle: PoolHandle, value: T) -> Option<T> {
        let slot = self.get_mut(handle)?;
        Some(std::mem::replace(slot, value))
    }

    /// Returns `true` if `handle` refers to a live object.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: PoolHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Gets a reference to a live object.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Gets a mutable reference to a live object.
    #[inline]
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Drops every live object. Slots are kept for reuse and all
    /// outstanding handles are invalidated.
    pub fn clear(&mut self) {
        self.free_list.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free_list.push(index as u32);
        }
        self.live = 0;
    }

    /// Iterates over all live objects.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    PoolHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }
}

impl<T> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_pool_allocate_release() {
        let mut pool: ObjectPool<u32> = ObjectPool::new();

        let h1 = pool.allocate(42);
        assert_eq!(*pool.get(h1).unwrap(), 42);
        assert_eq!(pool.len(), 1);

        let freed = pool.release(h1).unwrap();
        assert_eq!(freed, 42);
        assert!(pool.is_empty());
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn test_pool_reuses_released_slot() {
        let mut pool: ObjectPool<u32> = ObjectPool::new();

        let h1 = pool.allocate(1);
        pool.release(h1);

        let h2 = pool.allocate(2);
        assert_eq!(h1.index(), h2.index());
        assert_eq!(pool.slot_count(), 1);
        assert_eq!(*pool.get(h2).unwrap(), 2);
    }

    #[test]
    fn test_stale_handle_does_not_resolve_to_new_occupant() {
        let mut pool: ObjectPool<&str> = ObjectPool::new();

        let old = pool.allocate("old");
        pool.release(old);
        let new = pool.allocate("new");

        assert_eq!(old.index(), new.index());
        assert_ne!(old.generation(), new.generation());
        assert!(pool.get(old).is_none());
        assert!(pool.release(old).is_none());
        assert_eq!(pool.get(new), Some(&"new"));
    }

    #[test]
    fn test_double_release_is_rejected() {
        let mut pool: ObjectPool<u8> = ObjectPool::new();
        let h = pool.allocate(9);
        assert_eq!(pool.release(h), Some(9));
        assert_eq!(pool.release(h), None);
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn test_foreign_handle_is_rejected() {
        let mut other: ObjectPool<u8> = ObjectPool::new();
        other.allocate(1);
        let foreign = other.allocate(2);

        let mut pool: ObjectPool<u8> = ObjectPool::new();
        pool.allocate(3);
        assert!(pool.release(foreign).is_none());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_replace_in_place() {
        let mut pool: ObjectPool<String> = ObjectPool::new();
        let h = pool.allocate("a".to_string());
        let old = pool.replace(h, "b".to_string());
        assert_eq!(old.as_deref(), Some("a"));
        assert_eq!(pool.get(h).map(String::as_str), Some("b"));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut pool: ObjectPool<u32> = ObjectPool::with_capacity(4);
        let a = pool.allocate(1);
        let b = pool.allocate(2);
        pool.clear();
        assert!(pool.is_empty());
        assert!(!pool.contains(a));
        assert!(!pool.contains(b));

        // Slot 0 is handed out first again.
        let c = pool.allocate(3);
        assert_eq!(c.index(), 0);
        assert!(!pool.contains(a));
    }

    #[test]
    fn test_iter_skips_free_slots() {
        let mut pool: ObjectPool<u32> = ObjectPool::new();
        let a = pool.allocate(1);
        pool.allocate(2);
        pool.release(a);
        let values: Vec<u32> = pool.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![2]);
    }

    proptest! {
        #[test]
        fn test_live_handles_match_model(ops in prop::collection::vec(any::<Option<u8>>(), 0..200)) {
            let mut pool: ObjectPool<u8> = ObjectPool::new();
            let mut live: HashMap<PoolHandle, u8> = HashMap::new();
            let mut retired: Vec<PoolHandle> = Vec::new();

            for op in ops {
                match op {
                    Some(value) => {
                        let handle = pool.allocate(value);
                        prop_assert!(live.insert(handle, value).is_none());
                    }
                    None => {
                        if let Some(&handle) = live.keys().next() {
                            let expected = live.remove(&handle);
                            prop_assert_eq!(pool.release(handle), expected);
                            retired.push(handle);
                        }
                    }
                }
            }

            prop_assert_eq!(pool.len(), live.len());
            for (handle, value) in &live {
                prop_assert_eq!(pool.get(*handle), Some(value));
            }
            for handle in retired {
                prop_assert!(pool.get(handle).is_none());
            }
        }
    }
}
