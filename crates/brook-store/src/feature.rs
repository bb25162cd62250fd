//! Feature stores: action-driven state cells.
//!
//! A [`FeatureStore`] pairs a [`StoreBase`] with a handler table and
//! turns dispatched actions into state transitions. Routing is by the
//! action's runtime type; a dispatch runs every matching binding, in
//! declaration order, against the evolving intermediate value, and pushes
//! at most once.

use brook_core::{Action, Handlers};

use crate::base::{Selected, State, StateStream, StoreBase};

/// An action-driven state cell.
pub struct FeatureStore<S: State> {
    base: StoreBase<S>,
    handlers: Handlers<S>,
}

impl<S: State> FeatureStore<S> {
    /// Create a feature store with its initial value and handler table.
    pub fn new(initial: S, handlers: Handlers<S>) -> Self {
        Self {
            base: StoreBase::new(initial),
            handlers,
        }
    }

    /// Route an action through the handler table.
    ///
    /// Matching bindings run in declaration order, each seeing the result
    /// of the previous one. The final value is pushed only when it
    /// differs from the snapshot the dispatch started from, so one
    /// dispatch causes at most one emission. After completion, dispatch
    /// is a warned no-op.
    pub fn dispatch(&self, action: &dyn Action) {
        if self.base.is_complete() {
            tracing::warn!(action = action.name(), "dispatch after store completion");
            return;
        }

        let mut current = self.base.snapshot();
        let mut matched = 0usize;
        for handler in self.handlers.iter() {
            if handler.handles(action) {
                matched += 1;
                current = handler.invoke(&current, action);
            }
        }

        if matched > 0 {
            tracing::debug!(action = action.name(), handlers = matched, "action handled");
            self.base.next_if_changed(current);
        }
    }

    /// Clone of the current value.
    pub fn snapshot(&self) -> S {
        self.base.snapshot()
    }

    /// Replay-one, distinct-until-changed subscription.
    pub fn state(&self) -> StateStream<S> {
        self.base.state()
    }

    /// Projected, independently distinct subscription.
    pub fn select<U, F>(&self, project: F) -> Selected<S, U>
    where
        U: State,
        F: Fn(&S) -> U + Send + 'static,
    {
        self.base.select(project)
    }

    /// Terminate the store. See [`StoreBase::complete`].
    pub fn complete(&self) {
        self.base.complete();
    }

    /// Whether the store has completed.
    pub fn is_complete(&self) -> bool {
        self.base.is_complete()
    }

    /// The underlying cell, for updaters and effect pipelines.
    pub fn base(&self) -> &StoreBase<S> {
        &self.base
    }
}

impl<S: State + std::fmt::Debug> std::fmt::Debug for FeatureStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureStore")
            .field("value", &self.base.snapshot())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brook_core::Handlers;
    use std::any::Any;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        value: i64,
    }

    #[derive(Debug)]
    struct Add(i64);

    impl Action for Add {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct Reset;

    impl Action for Reset {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn counter_store(handlers: Handlers<Counter>) -> FeatureStore<Counter> {
        FeatureStore::new(Counter { value: 0 }, handlers)
    }

    #[tokio::test]
    async fn dispatch_routes_by_action_type() {
        let store = counter_store(
            Handlers::new()
                .on(|state: &Counter, action: &Add| Counter {
                    value: state.value + action.0,
                })
                .on(|_: &Counter, _: &Reset| Counter { value: 0 }),
        );

        store.dispatch(&Add(5));
        assert_eq!(store.snapshot(), Counter { value: 5 });

        store.dispatch(&Reset);
        assert_eq!(store.snapshot(), Counter { value: 0 });
    }

    #[tokio::test]
    async fn chained_handlers_see_the_evolving_value() {
        let store = counter_store(
            Handlers::new()
                .on(|state: &Counter, action: &Add| Counter {
                    value: state.value + action.0,
                })
                .on(|state: &Counter, _: &Add| Counter {
                    value: state.value * 10,
                }),
        );

        let mut stream = store.state();
        assert_eq!(stream.recv().await, Some(Counter { value: 0 }));

        store.dispatch(&Add(2));
        store.complete();

        // One emission: second handler applied to the first's result.
        assert_eq!(stream.recv().await, Some(Counter { value: 20 }));
        assert_eq!(stream.recv().await, None);
    }

    #[tokio::test]
    async fn unmatched_actions_emit_nothing() {
        let store = counter_store(Handlers::new().on(|state: &Counter, action: &Add| Counter {
            value: state.value + action.0,
        }));

        let mut stream = store.state();
        assert_eq!(stream.recv().await, Some(Counter { value: 0 }));

        store.dispatch(&Reset);
        store.complete();
        assert_eq!(stream.recv().await, None);
    }

    #[tokio::test]
    async fn noop_reductions_emit_nothing() {
        let store = counter_store(Handlers::new().on(|state: &Counter, action: &Add| Counter {
            value: state.value + action.0,
        }));

        let mut stream = store.state();
        assert_eq!(stream.recv().await, Some(Counter { value: 0 }));

        store.dispatch(&Add(0));
        store.complete();
        assert_eq!(stream.recv().await, None);
    }

    #[tokio::test]
    async fn dispatch_after_complete_is_a_noop() {
        let store = counter_store(Handlers::new().on(|state: &Counter, action: &Add| Counter {
            value: state.value + action.0,
        }));

        store.complete();
        store.dispatch(&Add(3));
        assert_eq!(store.snapshot(), Counter { value: 0 });
    }
}
