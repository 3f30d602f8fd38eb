//! Read-only queries over committed world state.

use std::fmt;

use ecs_component::{Component, ComponentTypeId, Entity, SparseSet};

use crate::storage::ComponentStorage;

/// A tuple of component types that can be queried together.
///
/// Implemented for tuples `(A,)` through `(A, B, C, D, E, F, G, H)`.
pub trait QueryData {
    /// The borrowed components yielded per matching entity.
    type Item<'w>;

    /// Returns the ids of every requested type, or `None` if any of them has
    /// never been registered (in which case nothing can match).
    fn component_ids(storage: &ComponentStorage) -> Option<Vec<ComponentTypeId>>;

    /// Borrows the requested components of `entity`.
    fn fetch<'w>(storage: &'w ComponentStorage, entity: Entity) -> Option<Self::Item<'w>>;
}

macro_rules! impl_query_data {
    ($($name:ident),+) => {
        impl<$($name: Component),+> QueryData for ($($name,)+) {
            type Item<'w> = ($(&'w $name,)+);

            fn component_ids(storage: &ComponentStorage) -> Option<Vec<ComponentTypeId>> {
                Some(vec![$(storage.component_id::<$name>()?),+])
            }

            fn fetch<'w>(storage: &'w ComponentStorage, entity: Entity) -> Option<Self::Item<'w>> {
                Some(($(storage.get::<$name>(entity)?,)+))
            }
        }
    };
}

impl_query_data!(A);
impl_query_data!(A, B);
impl_query_data!(A, B, C);
impl_query_data!(A, B, C, D);
impl_query_data!(A, B, C, D, E);
impl_query_data!(A, B, C, D, E, F);
impl_query_data!(A, B, C, D, E, F, G);
impl_query_data!(A, B, C, D, E, F, G, H);

/// Read-only query executor handed to every update system.
///
/// Sees the world as it was committed at the start of the tick.
#[derive(Clone, Copy)]
pub struct Queryer<'w> {
    storage: &'w ComponentStorage,
}

impl<'w> Queryer<'w> {
    pub(crate) fn new(storage: &'w ComponentStorage) -> Self {
        Self { storage }
    }

    /// Returns every entity owning all the component types in `Q`.
    ///
    /// The smallest participating index drives iteration (ties go to the
    /// first listed type); results follow that index's dense order.
    #[must_use]
    pub fn query<Q: QueryData>(&self) -> Vec<Entity> {
        let Some(ids) = Q::component_ids(self.storage) else {
            return Vec::new();
        };
        let Some(indices) = ids
            .iter()
            .map(|&id| self.storage.index(id))
            .collect::<Option<Vec<&SparseSet>>>()
        else {
            return Vec::new();
        };
        let Some((driver, driving)) = indices
            .iter()
            .enumerate()
            .min_by_key(|(_, index)| index.len())
        else {
            return Vec::new();
        };

        driving
            .iter()
            .filter(|&entity| {
                indices
                    .iter()
                    .enumerate()
                    .all(|(i, index)| i == driver || index.contains(entity))
            })
            .collect()
    }

    /// Like [`query`](Self::query), but also borrows each match's components.
    #[must_use]
    pub fn query_components<Q: QueryData>(&self) -> Vec<(Entity, Q::Item<'w>)> {
        self.query::<Q>()
            .into_iter()
            .filter_map(|entity| Q::fetch(self.storage, entity).map(|item| (entity, item)))
            .collect()
    }

    /// Returns `true` if `entity` owns a `T`.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.storage.contains::<T>(entity)
    }

    /// Returns the `T` owned by `entity`.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&'w T> {
        self.storage.get::<T>(entity)
    }

    /// Returns `true` if `entity` is live.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.storage.is_alive(entity)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.storage.entity_count()
    }
}

impl fmt::Debug for Queryer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queryer")
            .field("entities", &self.storage.entity_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Name(&'static str);
    impl Component for Name {}

    #[derive(Debug, PartialEq)]
    struct Id(u32);
    impl Component for Id {}

    #[derive(Debug, PartialEq)]
    struct Tag;
    impl Component for Tag {}

    fn e(id: u64) -> Entity {
        Entity::from_raw(id)
    }

    fn populated() -> ComponentStorage {
        let mut storage = ComponentStorage::default();
        for id in 1..=4 {
            storage.spawn(e(id));
            storage.insert(e(id), Name("n"));
        }
        storage.insert(e(2), Id(2));
        storage.insert(e(4), Id(4));
        storage.insert(e(4), Tag);
        storage
    }

    #[test]
    fn test_query_intersects_types() {
        let storage = populated();
        let queryer = Queryer::new(&storage);
        assert_eq!(queryer.query::<(Name,)>(), vec![e(1), e(2), e(3), e(4)]);
        assert_eq!(queryer.query::<(Name, Id)>(), vec![e(2), e(4)]);
        assert_eq!(queryer.query::<(Id, Name)>(), vec![e(2), e(4)]);
        assert_eq!(queryer.query::<(Name, Id, Tag)>(), vec![e(4)]);
    }

    #[test]
    fn test_query_unregistered_type_is_empty() {
        #[derive(Debug)]
        struct Unused;
        impl Component for Unused {}

        let storage = populated();
        let queryer = Queryer::new(&storage);
        assert!(queryer.query::<(Name, Unused)>().is_empty());
        assert!(queryer.query_components::<(Unused,)>().is_empty());
    }

    #[test]
    fn test_query_components_borrows_values() {
        let storage = populated();
        let queryer = Queryer::new(&storage);
        let rows = queryer.query_components::<(Name, Id)>();
        let ids: Vec<(Entity, u32)> = rows.iter().map(|(entity, (_, id))| (*entity, id.0)).collect();
        assert_eq!(ids, vec![(e(2), 2), (e(4), 4)]);
        assert!(rows.iter().all(|(_, (name, _))| name.0 == "n"));
    }

    #[test]
    fn test_has_and_get() {
        let storage = populated();
        let queryer = Queryer::new(&storage);
        assert!(queryer.has::<Id>(e(2)));
        assert!(!queryer.has::<Id>(e(1)));
        assert_eq!(queryer.get::<Id>(e(4)), Some(&Id(4)));
        assert_eq!(queryer.get::<Id>(e(3)), None);
        assert_eq!(queryer.get::<Name>(e(9)), None);
        assert!(queryer.is_alive(e(1)));
        assert_eq!(queryer.entity_count(), 4);
    }

    #[test]
    fn test_query_skips_despawned() {
        let mut storage = populated();
        storage.despawn(e(2));
        let queryer = Queryer::new(&storage);
        assert_eq!(queryer.query::<(Name, Id)>(), vec![e(4)]);
        assert!(!queryer.query::<(Name,)>().contains(&e(2)));
    }
}
