//! # brook-store
//!
//! Reactive layer of the brook state-management workspace:
//!
//! - [`StoreBase`]: an always-valued observable cell feeding replay-one,
//!   distinct-until-changed streams.
//! - [`FeatureStore`]: a cell driven by a handler table, routing actions
//!   by runtime type.
//! - [`EntityStore`]: a cell over an [`EntityCollection`], pushing only
//!   when the collection identity changed.
//! - [`ActionBus`]: synchronous dispatch fan-out plus a deferred queue
//!   for effect-originated actions.
//! - [`FeatureRegistry`] / [`EffectsRegistry`] / [`Store`]: explicit
//!   composition at the application root.
//!
//! ## Design Principles
//!
//! 1. **Synchronous reduction, deferred effects**: `dispatch` runs every
//!    matching handler to completion before returning; actions produced
//!    by effects re-enter through a queue on a later scheduler tick.
//!
//! 2. **Distinct emission**: subscribers only wake for values that
//!    actually differ, at every layer (cell, projection, collection
//!    identity).
//!
//! 3. **Completion is terminal**: completing a store finishes its
//!    streams, cancels its effect pipelines, and turns further pushes
//!    into warned no-ops.

mod base;
mod bus;
mod entity;
mod feature;
mod registry;
mod store;

pub use base::{Effect, Selected, State, StateStream, StoreBase};
pub use bus::{ActionBus, ActionsStream};
pub use entity::EntityStore;
pub use feature::FeatureStore;
pub use registry::{EffectStream, EffectsProvider, EffectsRegistry, FeatureRegistry};
pub use store::Store;

pub use brook_core::{Action, AnyAction, Entity, EntityCollection, Handler, Handlers, StoreError};
