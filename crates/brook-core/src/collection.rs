//! Immutable, ID-keyed entity collections.
//!
//! [`EntityCollection`] is an insertion-ordered sequence of entities keyed
//! by an ID derived through the [`Entity`] hooks. Every mutator is total
//! and returns either a freshly built collection or, when the operation
//! provably changes nothing, a snapshot sharing the same backing storage
//! as the input. That no-op identity is an observable contract, not an
//! optimization: downstream stores compare snapshots to suppress
//! re-emission.

use std::cmp::Ordering;
use std::sync::Arc;

/// Hooks a concrete entity type supplies to the collection algebra.
///
/// Both hooks must be pure and deterministic. `same_id` defaults to `==`
/// and exists for entity types whose ID equality is looser than their
/// `PartialEq` (case-insensitive keys, for example).
pub trait Entity: Clone + Send + Sync + 'static {
    /// ID type of this entity.
    type Id: Clone + PartialEq + Send + Sync + 'static;

    /// Derive the ID of this entity.
    fn id(&self) -> Self::Id;

    /// Compare two IDs for equality.
    fn same_id(a: &Self::Id, b: &Self::Id) -> bool {
        a == b
    }
}

struct CollectionInner<E: Entity> {
    ids: Vec<E::Id>,
    entities: Vec<E>,
}

/// An immutable collection of entities, keyed and deduplicated by ID.
///
/// `ids` and `entities` are parallel sequences: `ids[i]` is always the ID
/// of `entities[i]`, and no two entries share an ID. Construction from an
/// iterator applies last-writer-wins deduplication: when the same ID
/// occurs twice, the later occurrence's value and position win.
///
/// Cloning is cheap (shared backing storage). `PartialEq` compares
/// snapshot identity, not element values: a collection is equal only to
/// snapshots sharing its backing storage, which is exactly what the no-op
/// identity law produces. Two independently built collections with equal
/// elements compare unequal on purpose.
pub struct EntityCollection<E: Entity> {
    inner: Arc<CollectionInner<E>>,
}

impl<E: Entity> EntityCollection<E> {
    /// Build a collection from entities, deduplicating by ID with
    /// last-writer-wins semantics.
    pub fn new(entities: impl IntoIterator<Item = E>) -> Self {
        let mut deduped: Vec<E> = Vec::new();

        for entity in entities {
            let id = entity.id();
            if let Some(at) = deduped.iter().position(|seen| E::same_id(&seen.id(), &id)) {
                deduped.remove(at);
            }
            deduped.push(entity);
        }

        Self::from_unique(deduped)
    }

    /// Internal constructor for entity sequences already unique by ID.
    fn from_unique(entities: Vec<E>) -> Self {
        let ids = entities.iter().map(E::id).collect();
        Self {
            inner: Arc::new(CollectionInner { ids, entities }),
        }
    }

    /// IDs of all entities, in insertion order.
    pub fn ids(&self) -> &[E::Id] {
        &self.inner.ids
    }

    /// All entities, in insertion order.
    pub fn entities(&self) -> &[E] {
        &self.inner.entities
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.inner.ids.len()
    }

    /// Whether the collection holds no entities.
    pub fn is_empty(&self) -> bool {
        self.inner.ids.is_empty()
    }

    /// Look up an entity by ID.
    pub fn get(&self, id: &E::Id) -> Option<&E> {
        self.position(id).map(|at| &self.inner.entities[at])
    }

    /// Whether an entity with this ID is present.
    pub fn has(&self, id: &E::Id) -> bool {
        self.position(id).is_some()
    }

    /// Whether an entity with the same ID as the sample is present.
    pub fn includes(&self, sample: &E) -> bool {
        self.has(&sample.id())
    }

    fn position(&self, id: &E::Id) -> Option<usize> {
        self.inner.ids.iter().position(|known| E::same_id(known, id))
    }

    /// Append the entity unless one with the same ID is already present.
    pub fn add(&self, entity: E) -> Self {
        if self.includes(&entity) {
            return self.clone();
        }

        let mut entities = self.inner.entities.clone();
        entities.push(entity);
        Self::from_unique(entities)
    }

    /// Fold of [`EntityCollection::add`] over the input, in order.
    pub fn add_many(&self, entities: impl IntoIterator<Item = E>) -> Self {
        entities
            .into_iter()
            .fold(self.clone(), |collection, entity| collection.add(entity))
    }

    /// Replace the entity sharing the given entity's ID, preserving its
    /// position; no-op when absent.
    pub fn update(&self, entity: E) -> Self {
        match self.position(&entity.id()) {
            Some(at) => {
                let mut entities = self.inner.entities.clone();
                entities[at] = entity;
                Self::from_unique(entities)
            }
            None => self.clone(),
        }
    }

    /// Fold of [`EntityCollection::update`] over the input, in order.
    pub fn update_many(&self, entities: impl IntoIterator<Item = E>) -> Self {
        entities
            .into_iter()
            .fold(self.clone(), |collection, entity| collection.update(entity))
    }

    /// Upsert: [`EntityCollection::update`] when an entity with the same
    /// ID exists, [`EntityCollection::add`] otherwise.
    pub fn set(&self, entity: E) -> Self {
        if self.includes(&entity) {
            self.update(entity)
        } else {
            self.add(entity)
        }
    }

    /// Fold of [`EntityCollection::set`] over the input, in order.
    pub fn set_many(&self, entities: impl IntoIterator<Item = E>) -> Self {
        entities
            .into_iter()
            .fold(self.clone(), |collection, entity| collection.set(entity))
    }

    /// Remove the entity with this ID, preserving the order of the rest;
    /// no-op when absent.
    pub fn delete(&self, id: &E::Id) -> Self {
        if !self.has(id) {
            return self.clone();
        }

        let entities = self
            .inner
            .entities
            .iter()
            .filter(|entity| !E::same_id(&entity.id(), id))
            .cloned()
            .collect();
        Self::from_unique(entities)
    }

    /// Remove all entities whose IDs appear in the input.
    ///
    /// Builds the surviving sequence once and compares lengths to decide
    /// between a no-op and a new collection, so a batch removal is a
    /// single construction rather than a fold of single deletes.
    pub fn delete_many(&self, ids: impl IntoIterator<Item = E::Id>) -> Self {
        let ids: Vec<E::Id> = ids.into_iter().collect();
        let kept: Vec<E> = self
            .inner
            .entities
            .iter()
            .filter(|entity| {
                let entity_id = entity.id();
                !ids.iter().any(|id| E::same_id(id, &entity_id))
            })
            .cloned()
            .collect();

        if kept.len() == self.len() {
            self.clone()
        } else {
            Self::from_unique(kept)
        }
    }

    /// Remove the entity sharing the sample's ID; no-op when absent.
    pub fn remove(&self, sample: &E) -> Self {
        self.delete(&sample.id())
    }

    /// Batched [`EntityCollection::remove`] with single-construction
    /// semantics, as [`EntityCollection::delete_many`].
    pub fn remove_many<'a>(&self, samples: impl IntoIterator<Item = &'a E>) -> Self {
        self.delete_many(samples.into_iter().map(E::id))
    }

    /// Empty collection; no-op when already empty.
    pub fn clear(&self) -> Self {
        if self.is_empty() {
            self.clone()
        } else {
            Self::from_unique(Vec::new())
        }
    }

    /// Keep entities matching the predicate; no-op when nothing was
    /// removed.
    pub fn filter(&self, predicate: impl Fn(&E) -> bool) -> Self {
        let kept: Vec<E> = self
            .inner
            .entities
            .iter()
            .filter(|entity| predicate(entity))
            .cloned()
            .collect();

        if kept.len() == self.len() {
            self.clone()
        } else {
            Self::from_unique(kept)
        }
    }

    /// Stable-sort entities by the comparator.
    ///
    /// No-op when the resulting ID sequence is positionally identical to
    /// the original over its full length.
    pub fn sort(&self, compare: impl Fn(&E, &E) -> Ordering) -> Self {
        let mut entities = self.inner.entities.clone();
        entities.sort_by(|a, b| compare(a, b));

        let reordered = entities
            .iter()
            .zip(self.inner.entities.iter())
            .any(|(sorted, original)| !E::same_id(&sorted.id(), &original.id()));

        if reordered {
            Self::from_unique(entities)
        } else {
            self.clone()
        }
    }

    /// Defensive copy of the entity sequence.
    pub fn to_vec(&self) -> Vec<E> {
        self.inner.entities.clone()
    }

    /// Iterate entities in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.inner.entities.iter()
    }
}

impl<E: Entity> Clone for EntityCollection<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entity> Default for EntityCollection<E> {
    fn default() -> Self {
        Self::from_unique(Vec::new())
    }
}

/// Snapshot identity: equal only when both sides share backing storage.
impl<E: Entity> PartialEq for EntityCollection<E> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<E: Entity + std::fmt::Debug> std::fmt::Debug for EntityCollection<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<E: Entity> FromIterator<E> for EntityCollection<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a, E: Entity> IntoIterator for &'a EntityCollection<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Todo {
        id: u32,
        title: &'static str,
    }

    impl Entity for Todo {
        type Id = u32;

        fn id(&self) -> u32 {
            self.id
        }
    }

    fn todo(id: u32, title: &'static str) -> Todo {
        Todo { id, title }
    }

    fn same_snapshot(a: &EntityCollection<Todo>, b: &EntityCollection<Todo>) -> bool {
        a == b
    }

    #[test]
    fn construction_dedups_last_writer_wins() {
        let collection = EntityCollection::new([todo(1, "a"), todo(2, "b"), todo(1, "c")]);

        assert_eq!(collection.ids(), &[2, 1]);
        assert_eq!(collection.get(&1).map(|t| t.title), Some("c"));
    }

    #[test]
    fn ids_and_entities_stay_parallel() {
        let collection = EntityCollection::new([todo(3, "x"), todo(1, "y"), todo(2, "z")]);

        for (id, entity) in collection.ids().iter().zip(collection.entities()) {
            assert_eq!(*id, entity.id());
        }
    }

    #[test]
    fn add_appends_and_noops_on_duplicate() {
        let base = EntityCollection::new([todo(1, "a")]);

        let grown = base.add(todo(2, "b"));
        assert!(grown.includes(&todo(2, "b")));
        assert_eq!(grown.ids(), &[1, 2]);

        let unchanged = grown.add(todo(2, "other"));
        assert!(same_snapshot(&grown, &unchanged));
    }

    #[test]
    fn update_replaces_in_place() {
        let base = EntityCollection::new([todo(1, "a"), todo(2, "b"), todo(3, "c")]);

        let updated = base.update(todo(2, "B"));
        assert_eq!(updated.ids(), &[1, 2, 3]);
        assert_eq!(updated.get(&2).map(|t| t.title), Some("B"));

        let unchanged = base.update(todo(9, "missing"));
        assert!(same_snapshot(&base, &unchanged));
    }

    #[test]
    fn set_upserts() {
        let base = EntityCollection::new([todo(1, "a")]);

        let replaced = base.set(todo(1, "A"));
        assert_eq!(replaced.ids(), &[1]);
        assert_eq!(replaced.get(&1).map(|t| t.title), Some("A"));

        let appended = base.set(todo(2, "b"));
        assert_eq!(appended.ids(), &[1, 2]);
    }

    #[test]
    fn delete_preserves_order_of_rest() {
        let base = EntityCollection::new([todo(1, "a"), todo(2, "b"), todo(3, "c")]);

        let smaller = base.delete(&2);
        assert_eq!(smaller.ids(), &[1, 3]);

        let unchanged = base.delete(&9);
        assert!(same_snapshot(&base, &unchanged));
    }

    #[test]
    fn delete_many_is_single_construction() {
        let base = EntityCollection::new([todo(1, "a"), todo(2, "b"), todo(3, "c")]);

        let smaller = base.delete_many([1, 3]);
        assert_eq!(smaller.ids(), &[2]);

        let unchanged = base.delete_many([8, 9]);
        assert!(same_snapshot(&base, &unchanged));
    }

    #[test]
    fn remove_many_uses_sample_ids() {
        let base = EntityCollection::new([todo(1, "a"), todo(2, "b")]);
        let samples = [todo(1, "stale title is fine"), todo(9, "absent")];

        let smaller = base.remove_many(samples.iter());
        assert_eq!(smaller.ids(), &[2]);
    }

    #[test]
    fn clear_noops_when_empty() {
        let base = EntityCollection::new([todo(1, "a")]);

        let emptied = base.clear();
        assert!(emptied.is_empty());

        let still_empty = emptied.clear();
        assert!(same_snapshot(&emptied, &still_empty));
    }

    #[test]
    fn filter_noops_when_nothing_removed() {
        let base = EntityCollection::new([todo(1, "a"), todo(2, "b")]);

        let all = base.filter(|_| true);
        assert!(same_snapshot(&base, &all));

        let some = base.filter(|t| t.id == 1);
        assert_eq!(some.ids(), &[1]);
    }

    #[test]
    fn sort_noops_when_order_unchanged() {
        let base = EntityCollection::new([todo(1, "a"), todo(2, "b")]);

        let sorted = base.sort(|a, b| a.id.cmp(&b.id));
        assert!(same_snapshot(&base, &sorted));

        let reversed = base.sort(|a, b| b.id.cmp(&a.id));
        assert_eq!(reversed.ids(), &[2, 1]);

        // A second identical sort returns the same snapshot.
        let again = reversed.sort(|a, b| b.id.cmp(&a.id));
        assert!(same_snapshot(&reversed, &again));
    }

    #[test]
    fn to_vec_is_a_defensive_copy() {
        let base = EntityCollection::new([todo(1, "a")]);

        let mut copied = base.to_vec();
        copied.push(todo(2, "b"));

        assert_eq!(base.len(), 1);
    }

    #[test]
    fn equal_values_are_not_the_same_snapshot() {
        let left = EntityCollection::new([todo(1, "a")]);
        let right = EntityCollection::new([todo(1, "a")]);

        assert!(!same_snapshot(&left, &right));
        assert!(same_snapshot(&left, &left.clone()));
    }

    proptest! {
        #[test]
        fn invariants_hold_for_any_construction(seed in prop::collection::vec((0u32..16, 0u32..1000), 0..32)) {
            let collection = EntityCollection::new(
                seed.iter().map(|(id, n)| Todo { id: *id, title: if n % 2 == 0 { "even" } else { "odd" } }),
            );

            prop_assert_eq!(collection.ids().len(), collection.entities().len());

            for (id, entity) in collection.ids().iter().zip(collection.entities()) {
                prop_assert_eq!(*id, entity.id());
            }

            for (at, id) in collection.ids().iter().enumerate() {
                prop_assert!(!collection.ids()[..at].contains(id));
            }
        }

        #[test]
        fn absent_target_operations_are_identity(seed in prop::collection::vec(0u32..8, 0..16)) {
            let collection = EntityCollection::new(seed.iter().map(|id| Todo { id: *id, title: "t" }));

            // 100 is outside the generated ID range.
            let deleted = collection.delete(&100);
            prop_assert!(collection == deleted);

            let updated = collection.update(Todo { id: 100, title: "nope" });
            prop_assert!(collection == updated);

            let kept = collection.filter(|_| true);
            prop_assert!(collection == kept);
        }

        #[test]
        fn add_then_includes(seed in prop::collection::vec(0u32..8, 0..16), extra in 0u32..16) {
            let collection = EntityCollection::new(seed.iter().map(|id| Todo { id: *id, title: "t" }));
            let sample = Todo { id: extra, title: "added" };

            let added = collection.add(sample.clone());
            prop_assert!(added.includes(&sample));

            if collection.includes(&sample) {
                prop_assert!(collection == added);
            } else {
                prop_assert_eq!(added.len(), collection.len() + 1);
            }
        }
    }
}
