//! # ecs_component
//!
//! Leaf building blocks of the entity/component runtime. Nothing in this
//! crate knows about worlds, systems or ticks.
//!
//! This crate provides:
//!
//! - [`Component`] and [`Resource`] traits: the contracts for entity data
//!   and world-wide singletons.
//! - [`Entity`]: lightweight, never-reused `u64` entity identifiers.
//! - [`EntityAllocator`]: monotonically increasing ID allocator.
//! - [`TypeRegistry`]: lazily assigned, namespaced type ids.
//! - [`SparseSet`]: O(1) membership index over entities.
//! - [`ObjectPool`]: free-list slot allocator with generational handles.

pub mod component;
pub mod entity;
pub mod pool;
pub mod registry;
pub mod sparse_set;

pub use component::{Component, Resource};
pub use entity::{Entity, EntityAllocator};
pub use pool::{ObjectPool, PoolHandle};
pub use registry::{
    ComponentSpace, ComponentTypeId, Namespace, ResourceSpace, ResourceTypeId, TypeIndex,
    TypeInfo, TypeRegistry,
};
pub use sparse_set::{DEFAULT_PAGE_SIZE, SparseSet};
