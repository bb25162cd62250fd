//! The store facade: one bus, both registries, one shutdown.
//!
//! [`Store`] is the application-root composition point. Features and
//! effects are registered against it explicitly; there is no container
//! or discovery step.

use std::sync::Arc;

use brook_core::{Action, AnyAction, Handlers, StoreError};

use crate::base::{Selected, State, StateStream};
use crate::bus::{ActionBus, ActionsStream};
use crate::feature::FeatureStore;
use crate::registry::{EffectsProvider, EffectsRegistry, FeatureRegistry};

/// Application-root store: an action bus wired to feature and effects
/// registries.
///
/// Must be created inside a tokio runtime.
pub struct Store {
    bus: ActionBus,
    features: FeatureRegistry,
    effects: EffectsRegistry,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        let bus = ActionBus::new();
        Self {
            features: FeatureRegistry::new(bus.clone()),
            effects: EffectsRegistry::new(bus.clone()),
            bus,
        }
    }

    /// Register a feature store for state type `S`.
    pub fn register_feature<S: State>(
        &self,
        initial: S,
        handlers: Handlers<S>,
    ) -> Result<Arc<FeatureStore<S>>, StoreError> {
        self.features.register(initial, handlers)
    }

    /// Register an effects provider.
    pub fn register_effects(&self, provider: Arc<dyn EffectsProvider>) -> Result<(), StoreError> {
        self.effects.register(provider)
    }

    /// The feature store for state type `S`.
    pub fn feature<S: State>(&self) -> Result<Arc<FeatureStore<S>>, StoreError> {
        self.features.feature::<S>()
    }

    /// Subscribe to state type `S`.
    pub fn select<S: State>(&self) -> Result<StateStream<S>, StoreError> {
        self.features.select::<S>()
    }

    /// Subscribe to a projection of state type `S`.
    pub fn select_with<S, U, F>(&self, project: F) -> Result<Selected<S, U>, StoreError>
    where
        S: State,
        U: State,
        F: Fn(&S) -> U + Send + 'static,
    {
        self.features.select_with(project)
    }

    /// Current snapshot of state type `S`.
    pub fn snapshot<S: State>(&self) -> Result<S, StoreError> {
        self.features.snapshot::<S>()
    }

    /// Dispatch an action synchronously to every registered feature.
    pub fn dispatch(&self, action: impl Action) {
        self.bus.dispatch(Arc::new(action));
    }

    /// Dispatch an already-shared action.
    pub fn dispatch_shared(&self, action: AnyAction) {
        self.bus.dispatch(action);
    }

    /// An async observer over all dispatched actions.
    pub fn actions(&self) -> ActionsStream {
        self.bus.actions()
    }

    /// The underlying bus, for constructing effects providers.
    pub fn bus(&self) -> &ActionBus {
        &self.bus
    }

    /// Complete every feature store, stop the effects bridges, and stop
    /// the bus pump. Idempotent.
    pub fn shutdown(&self) {
        self.features.complete_all();
        self.effects.shutdown();
        self.bus.shutdown();
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
