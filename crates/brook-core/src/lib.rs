//! # brook-core
//!
//! Pure data layer of the brook state-management workspace:
//!
//! - [`Action`]: runtime-type-tagged intent values routed by `TypeId`.
//! - [`Handlers`]: an explicit, ordered table binding action types to
//!   reducer functions on a state value.
//! - [`EntityCollection`]: an immutable, ID-keyed, insertion-ordered
//!   sequence with full set algebra and no-op identity semantics.
//! - [`StoreError`]: the registry error taxonomy.
//!
//! ## Design Principles
//!
//! 1. **No runtime coupling**: this crate has no async or channel types.
//!    The reactive layer lives in `brook-store`.
//!
//! 2. **No-op identity law**: every collection mutator that provably
//!    changes nothing returns a snapshot that compares equal (pointer
//!    identity on shared backing storage) to its input. Stores use this
//!    to suppress re-emission.
//!
//! 3. **Explicit handler tables**: action routing is declared with a
//!    builder rather than discovered through reflection or global
//!    registries.

mod action;
mod collection;
mod error;
mod handler;

pub use action::{Action, AnyAction};
pub use collection::{Entity, EntityCollection};
pub use error::StoreError;
pub use handler::{Handler, Handlers};
