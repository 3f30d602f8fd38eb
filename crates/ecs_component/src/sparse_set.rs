//! Paged sparse set of entities.
//!
//! A [`SparseSet`] tracks which entities are members of some group (in the
//! runtime: "entities that currently own component `T`"). It pairs a dense
//! array of members with a sparse, entity-indexed array of dense positions:
//!
//! ```text
//! dense:  [e7, e2, e9]
//! sparse: e2 -> 1, e7 -> 0, e9 -> 2, everything else vacant
//! ```
//!
//! Insert appends to `dense`; remove swaps the last member into the hole.
//! Both, and the membership test, are O(1). The sparse side is split into
//! fixed-size pages that are only allocated once an entity lands in them,
//! and released again when their last member leaves.

use crate::entity::Entity;

/// Default number of sparse slots per page.
pub const DEFAULT_PAGE_SIZE: usize = 1024;

/// Marks a sparse slot with no member.
const VACANT: u32 = u32::MAX;

/// A set of entities with O(1) insert, remove and membership test.
///
/// Iteration yields exactly the current members. The order is insertion
/// order until a removal moves the last member into the removed slot; it is
/// stable between mutations.
#[derive(Debug, Clone)]
pub struct SparseSet<const PAGE_SIZE: usize = DEFAULT_PAGE_SIZE> {
    dense: Vec<Entity>,
    pages: Vec<Option<Box<[u32; PAGE_SIZE]>>>,
    /// Members per page, parallel to `pages`.
    occupancy: Vec<u32>,
}

impl<const PAGE_SIZE: usize> SparseSet<PAGE_SIZE> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        const { assert!(PAGE_SIZE > 0, "sparse set page size must be non-zero") };
        Self {
            dense: Vec::new(),
            pages: Vec::new(),
            occupancy: Vec::new(),
        }
    }

    /// Create an empty set with room for `capacity` members before the dense
    /// array reallocates.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut set = Self::new();
        set.dense.reserve(capacity);
        set
    }

    /// Adds `entity`. Returns `false` (and changes nothing) if it is already
    /// a member.
    pub fn insert(&mut self, entity: Entity) -> bool {
        if self.contains(entity) {
            return false;
        }
        let position = self.dense.len() as u32;
        self.dense.push(entity);
        *self.slot_mut(entity) = position;
        self.occupancy[entity.index() / PAGE_SIZE] += 1;
        true
    }

    /// Removes `entity`. Returns `false` if it was not a member.
    pub fn remove(&mut self, entity: Entity) -> bool {
        let Some(position) = self.position(entity) else {
            return false;
        };

        self.dense.swap_remove(position);
        if let Some(&moved) = self.dense.get(position) {
            *self.slot_mut(moved) = position as u32;
        }
        *self.slot_mut(entity) = VACANT;

        let page_index = entity.index() / PAGE_SIZE;
        self.occupancy[page_index] -= 1;
        if self.occupancy[page_index] == 0 {
            self.pages[page_index] = None;
        }
        true
    }

    /// Returns `true` if `entity` is a member.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.position(entity).is_some()
    }

    /// Returns the position of `entity` in the dense array.
    #[must_use]
    pub fn position(&self, entity: Entity) -> Option<usize> {
        let index = entity.index();
        let page = self.pages.get(index / PAGE_SIZE)?.as_ref()?;
        match page[index % PAGE_SIZE] {
            VACANT => None,
            position => Some(position as usize),
        }
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns `true` if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Returns the members as a slice, in iteration order.
    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.dense
    }

    /// Iterates over the members.
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, Entity>> {
        self.dense.iter().copied()
    }

    /// Returns the number of allocated sparse pages.
    #[must_use]
    pub fn allocated_pages(&self) -> usize {
        self.pages.iter().filter(|page| page.is_some()).count()
    }

    /// Removes every member and releases the sparse pages.
    pub fn clear(&mut self) {
        self.dense.clear();
        self.pages.clear();
        self.occupancy.clear();
    }

    /// Returns the sparse slot for `entity`, allocating its page if needed.
    fn slot_mut(&mut self, entity: Entity) -> &mut u32 {
        let index = entity.index();
        let page_index = index / PAGE_SIZE;
        if page_index >= self.pages.len() {
            self.pages.resize_with(page_index + 1, || None);
            self.occupancy.resize(page_index + 1, 0);
        }
        let page = self.pages[page_index].get_or_insert_with(|| Box::new([VACANT; PAGE_SIZE]));
        &mut page[index % PAGE_SIZE]
    }
}

impl<const PAGE_SIZE: usize> Default for SparseSet<PAGE_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const PAGE_SIZE: usize> IntoIterator for &'a SparseSet<PAGE_SIZE> {
    type Item = Entity;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, Entity>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
