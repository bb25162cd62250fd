//! Entity stores: observable cells over entity collections.
//!
//! [`EntityStore`] specializes [`StoreBase`] for
//! [`EntityCollection`] state. Every mutator delegates to the collection
//! algebra and pushes only when the operation produced a new snapshot,
//! so no-op mutations never wake subscribers. The collection's snapshot
//! identity makes that gate a pointer comparison.

use std::cmp::Ordering;

use brook_core::{Entity, EntityCollection};

use crate::base::{Selected, StateStream, StoreBase};

/// An observable cell holding an [`EntityCollection`].
pub struct EntityStore<E: Entity> {
    base: StoreBase<EntityCollection<E>>,
}

impl<E: Entity> EntityStore<E> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            base: StoreBase::new(EntityCollection::default()),
        }
    }

    /// Create a store seeded with entities (last-writer-wins dedup).
    pub fn with_entities(entities: impl IntoIterator<Item = E>) -> Self {
        Self {
            base: StoreBase::new(EntityCollection::new(entities)),
        }
    }

    /// Clone of the current collection snapshot.
    pub fn snapshot(&self) -> EntityCollection<E> {
        self.base.snapshot()
    }

    /// Replay-one, distinct-until-changed subscription to the whole
    /// collection.
    pub fn state(&self) -> StateStream<EntityCollection<E>> {
        self.base.state()
    }

    /// Distinct stream of the ID sequence.
    pub fn ids(&self) -> Selected<EntityCollection<E>, Vec<E::Id>> {
        self.base.select(|collection| collection.ids().to_vec())
    }

    /// Distinct stream of the entity sequence.
    pub fn entities(&self) -> Selected<EntityCollection<E>, Vec<E>>
    where
        E: PartialEq,
    {
        self.base.select(|collection| collection.to_vec())
    }

    /// Distinct stream of the entity count.
    pub fn len(&self) -> Selected<EntityCollection<E>, usize> {
        self.base.select(EntityCollection::len)
    }

    /// Distinct stream of the emptiness flag.
    pub fn is_empty(&self) -> Selected<EntityCollection<E>, bool> {
        self.base.select(EntityCollection::is_empty)
    }

    /// Terminate the store. See [`StoreBase::complete`].
    pub fn complete(&self) {
        self.base.complete();
    }

    /// The underlying cell, for selects and effect pipelines.
    pub fn base(&self) -> &StoreBase<EntityCollection<E>> {
        &self.base
    }

    // Mutators. Each applies one algebra operation and pushes only when
    // the collection identity changed.

    /// Add one entity; no-op when its ID is present.
    pub fn add(&self, entity: E) {
        self.apply(|collection| collection.add(entity));
    }

    /// Add each entity in order.
    pub fn add_many(&self, entities: impl IntoIterator<Item = E>) {
        self.apply(|collection| collection.add_many(entities));
    }

    /// Replace the entity sharing this entity's ID; no-op when absent.
    pub fn update(&self, entity: E) {
        self.apply(|collection| collection.update(entity));
    }

    /// Update each entity in order.
    pub fn update_many(&self, entities: impl IntoIterator<Item = E>) {
        self.apply(|collection| collection.update_many(entities));
    }

    /// Upsert one entity.
    pub fn set(&self, entity: E) {
        self.apply(|collection| collection.set(entity));
    }

    /// Upsert each entity in order.
    pub fn set_many(&self, entities: impl IntoIterator<Item = E>) {
        self.apply(|collection| collection.set_many(entities));
    }

    /// Remove the entity with this ID; no-op when absent.
    pub fn delete(&self, id: &E::Id) {
        self.apply(|collection| collection.delete(id));
    }

    /// Remove all entities whose IDs appear in the input.
    pub fn delete_many(&self, ids: impl IntoIterator<Item = E::Id>) {
        self.apply(|collection| collection.delete_many(ids));
    }

    /// Remove the entity sharing the sample's ID; no-op when absent.
    pub fn remove(&self, sample: &E) {
        self.apply(|collection| collection.remove(sample));
    }

    /// Remove all entities sharing the samples' IDs.
    pub fn remove_many<'a>(&self, samples: impl IntoIterator<Item = &'a E>) {
        self.apply(|collection| collection.remove_many(samples));
    }

    /// Drop every entity; no-op when already empty.
    pub fn clear(&self) {
        self.apply(|collection| collection.clear());
    }

    /// Keep entities matching the predicate.
    pub fn filter(&self, predicate: impl Fn(&E) -> bool) {
        self.apply(|collection| collection.filter(predicate));
    }

    /// Stable-sort entities by the comparator; no-op when the order is
    /// unchanged.
    pub fn sort(&self, compare: impl Fn(&E, &E) -> Ordering) {
        self.apply(|collection| collection.sort(compare));
    }

    fn apply(
        &self,
        operate: impl FnOnce(&EntityCollection<E>) -> EntityCollection<E>,
    ) {
        let current = self.base.snapshot();
        let next = operate(&current);
        // Snapshot identity: a no-op operation returns the same backing
        // storage and never wakes subscribers.
        if next != current {
            self.base.next(next);
        }
    }
}

impl<E: Entity> Default for EntityStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity + std::fmt::Debug> std::fmt::Debug for EntityStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("collection", &self.base.snapshot())
            .finish()
    }
}
