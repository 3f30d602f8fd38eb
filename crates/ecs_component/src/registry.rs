//! Namespaced type registry.
//!
//! A [`TypeRegistry`] hands out small, dense integer ids to Rust types the
//! first time each type is registered. Component types and resource types
//! live in independent namespaces, so the first component and the first
//! resource both get id `0`.
//!
//! Ids depend on registration order and are only meaningful within the
//! registry that produced them. They are never persisted.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use tracing::debug;

/// Marker for an id namespace.
pub trait Namespace: 'static {
    /// Short label used when formatting ids (e.g. `"component"`).
    const LABEL: &'static str;
}

/// Namespace of component type ids.
#[derive(Debug)]
pub enum ComponentSpace {}

impl Namespace for ComponentSpace {
    const LABEL: &'static str = "component";
}

/// Namespace of resource type ids.
#[derive(Debug)]
pub enum ResourceSpace {}

impl Namespace for ResourceSpace {
    const LABEL: &'static str = "resource";
}

/// A dense type id within namespace `N`.
pub struct TypeIndex<N> {
    raw: u32,
    _space: PhantomData<fn() -> N>,
}

/// Id of a registered component type.
pub type ComponentTypeId = TypeIndex<ComponentSpace>;

/// Id of a registered resource type.
pub type ResourceTypeId = TypeIndex<ResourceSpace>;

impl<N> TypeIndex<N> {
    /// Builds an id from its raw value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            raw,
            _space: PhantomData,
        }
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.raw
    }

    /// Returns the id as a position into per-type tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

// Manual impls: deriving would put needless bounds on the namespace marker.
impl<N> Clone for TypeIndex<N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N> Copy for TypeIndex<N> {}

impl<N> PartialEq for TypeIndex<N> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<N> Eq for TypeIndex<N> {}

impl<N> PartialOrd for TypeIndex<N> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<N> Ord for TypeIndex<N> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<N> Hash for TypeIndex<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<N: Namespace> fmt::Debug for TypeIndex<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", N::LABEL, self.raw)
    }
}

impl<N: Namespace> fmt::Display for TypeIndex<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What the registry remembers about a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    /// Human-readable type name.
    pub name: &'static str,
    /// The Rust type identity.
    pub type_id: TypeId,
}

/// Assigns [`TypeIndex`] values to Rust types, lazily, in namespace `N`.
pub struct TypeRegistry<N> {
    ids: HashMap<TypeId, TypeIndex<N>>,
    infos: Vec<TypeInfo>,
}

impl<N: Namespace> TypeRegistry<N> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            infos: Vec::new(),
        }
    }

    /// Returns the id for `T`, assigning the next unused id on first call.
    pub fn register<T: 'static>(&mut self, name: &'static str) -> TypeIndex<N> {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.ids.get(&type_id) {
            return id;
        }

        let id = TypeIndex::from_raw(self.infos.len() as u32);
        self.ids.insert(type_id, id);
        self.infos.push(TypeInfo { name, type_id });
        debug!(namespace = N::LABEL, id = id.raw(), name, "registered type");
        id
    }

    /// Returns the id for `T` if it has been registered.
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<TypeIndex<N>> {
        self.get_by_type_id(TypeId::of::<T>())
    }

    /// Returns the id for a Rust [`TypeId`] if it has been registered.
    #[must_use]
    pub fn get_by_type_id(&self, type_id: TypeId) -> Option<TypeIndex<N>> {
        self.ids.get(&type_id).copied()
    }

    /// Returns the registration info for an id.
    #[must_use]
    pub fn info(&self, id: TypeIndex<N>) -> Option<&TypeInfo> {
        self.infos.get(id.index())
    }

    /// Returns the human-readable name registered for an id.
    #[must_use]
    pub fn name(&self, id: TypeIndex<N>) -> Option<&'static str> {
        self.info(id).map(|info| info.name)
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Iterates over registered types in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TypeIndex<N>, &TypeInfo)> {
        self.infos
            .iter()
            .enumerate()
            .map(|(i, info)| (TypeIndex::from_raw(i as u32), info))
    }

    /// Forget every registration. The next registered type gets id `0` again.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.infos.clear();
    }
}

impl<N: Namespace> fmt::Debug for TypeRegistry<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("namespace", &N::LABEL)
            .field("types", &self.infos)
            .finish()
    }
}

impl<N: Namespace> Default for TypeRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
