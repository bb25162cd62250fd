//! Feature and effects registries.
//!
//! [`FeatureRegistry`] owns one [`FeatureStore`] per state type, keyed by
//! the state's `TypeId`, and wires each into the action bus as a
//! synchronous sink. [`EffectsRegistry`] owns effects providers and
//! bridges their action streams back onto the bus through the deferred
//! queue, so effect-originated actions never dispatch on the stack that
//! triggered them.

use std::any::{Any, TypeId};
use std::pin::Pin;
use std::sync::Arc;

use brook_core::{Action, Handlers, StoreError};
use futures::{Stream, StreamExt};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::base::{Selected, State, StateStream};
use crate::bus::ActionBus;
use crate::feature::FeatureStore;

/// Registry of feature stores, keyed by state type.
pub struct FeatureRegistry {
    bus: ActionBus,
    features: RwLock<IndexMap<TypeId, RegisteredFeature>>,
}

struct RegisteredFeature {
    state_name: &'static str,
    // Arc<FeatureStore<S>> behind Any, recovered by downcast in feature().
    store: Arc<dyn Any + Send + Sync>,
    complete: Box<dyn Fn() + Send + Sync>,
}

impl FeatureRegistry {
    /// Create a registry dispatching from the given bus.
    pub fn new(bus: ActionBus) -> Self {
        Self {
            bus,
            features: RwLock::new(IndexMap::new()),
        }
    }

    /// Register a feature store for state type `S` and wire it into the
    /// bus.
    ///
    /// Errors with [`StoreError::FeatureAlreadyRegistered`] when `S` is
    /// already present; the existing registration is untouched.
    pub fn register<S: State>(
        &self,
        initial: S,
        handlers: Handlers<S>,
    ) -> Result<Arc<FeatureStore<S>>, StoreError> {
        let state_name = std::any::type_name::<S>();
        let mut features = self.features.write();
        if features.contains_key(&TypeId::of::<S>()) {
            return Err(StoreError::FeatureAlreadyRegistered { state: state_name });
        }

        let store = Arc::new(FeatureStore::new(initial, handlers));

        let sink = Arc::clone(&store);
        self.bus
            .subscribe_sink(move |action| sink.dispatch(action.as_ref()));

        let on_complete = Arc::clone(&store);
        features.insert(
            TypeId::of::<S>(),
            RegisteredFeature {
                state_name,
                store: Arc::clone(&store) as Arc<dyn Any + Send + Sync>,
                complete: Box::new(move || on_complete.complete()),
            },
        );
        tracing::debug!(state = state_name, "feature registered");

        Ok(store)
    }

    /// The feature store for state type `S`.
    ///
    /// Errors with [`StoreError::FeatureNotRegistered`] when absent.
    pub fn feature<S: State>(&self) -> Result<Arc<FeatureStore<S>>, StoreError> {
        let missing = || StoreError::FeatureNotRegistered {
            state: std::any::type_name::<S>(),
        };

        let features = self.features.read();
        let registered = features.get(&TypeId::of::<S>()).ok_or_else(missing)?;
        // The map is keyed by TypeId, so the downcast cannot fail.
        Arc::clone(&registered.store)
            .downcast::<FeatureStore<S>>()
            .map_err(|_| missing())
    }

    /// Subscribe to state type `S`.
    pub fn select<S: State>(&self) -> Result<StateStream<S>, StoreError> {
        Ok(self.feature::<S>()?.state())
    }

    /// Subscribe to a projection of state type `S`.
    pub fn select_with<S, U, F>(&self, project: F) -> Result<Selected<S, U>, StoreError>
    where
        S: State,
        U: State,
        F: Fn(&S) -> U + Send + 'static,
    {
        Ok(self.feature::<S>()?.select(project))
    }

    /// Current snapshot of state type `S`.
    pub fn snapshot<S: State>(&self) -> Result<S, StoreError> {
        Ok(self.feature::<S>()?.snapshot())
    }

    /// Names of registered state types, in registration order.
    pub fn state_names(&self) -> Vec<&'static str> {
        self.features
            .read()
            .values()
            .map(|feature| feature.state_name)
            .collect()
    }

    /// Complete every registered feature store, in registration order.
    pub fn complete_all(&self) {
        for feature in self.features.read().values() {
            (feature.complete)();
        }
    }
}

/// A stream of actions produced by an effects provider.
pub type EffectStream = Pin<Box<dyn Stream<Item = Box<dyn Action>> + Send>>;

/// A bundle of effects pipelines.
///
/// `effects` is called once, at registration, and returns the action
/// streams this provider contributes. Each stream typically starts from
/// [`ActionBus::actions`] (captured at provider construction) and maps
/// observed actions to follow-up actions.
pub trait EffectsProvider: Send + Sync {
    /// The provider's action streams. Called once per registration.
    fn effects(&self) -> Vec<EffectStream>;

    /// Human-readable provider name for logs and errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Registry of effects providers.
///
/// Every action produced by a registered stream is re-entered through
/// [`ActionBus::post`], so it dispatches on a later scheduler tick.
pub struct EffectsRegistry {
    bus: ActionBus,
    providers: RwLock<Vec<Arc<dyn EffectsProvider>>>,
    shutdown: watch::Sender<bool>,
}

impl EffectsRegistry {
    /// Create a registry posting onto the given bus.
    pub fn new(bus: ActionBus) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            bus,
            providers: RwLock::new(Vec::new()),
            shutdown,
        }
    }

    /// Register a provider and spawn a forwarding task per stream.
    ///
    /// Errors with [`StoreError::EffectsAlreadyRegistered`] when this
    /// exact instance is already registered; already-running bridges are
    /// untouched. Distinct instances of the same provider type are
    /// distinct registrations.
    pub fn register(&self, provider: Arc<dyn EffectsProvider>) -> Result<(), StoreError> {
        let mut providers = self.providers.write();
        if providers.iter().any(|known| Arc::ptr_eq(known, &provider)) {
            return Err(StoreError::EffectsAlreadyRegistered {
                provider: provider.name(),
            });
        }

        let name = provider.name();
        let streams = provider.effects();
        tracing::debug!(provider = name, streams = streams.len(), "effects registered");

        for mut stream in streams {
            let bus = self.bus.clone();
            let mut shutdown = self.shutdown.subscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        action = stream.next() => {
                            let Some(action) = action else { break };
                            bus.post(Arc::from(action));
                        }
                    }
                }
            });
        }

        providers.push(provider);
        Ok(())
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Whether no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    /// Stop every forwarding task. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
