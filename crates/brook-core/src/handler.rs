//! Handler bindings: associating action types with reducer functions.
//!
//! A [`Handler`] pairs one action type with one reducer closure over a
//! state value. A [`Handlers`] table collects them in declaration order,
//! which is also dispatch order. The table replaces decorator-style
//! metadata discovery with an explicit builder: state kinds declare their
//! reducers at construction time.

use std::any::TypeId;

use crate::action::Action;

/// A single binding between an action type and a reducer on `S`.
///
/// `handles` and `invoke` agree by construction: `invoke` is only ever
/// called after `handles` returned true for the same action.
pub struct Handler<S> {
    action: TypeId,
    action_name: &'static str,
    run: Box<dyn Fn(&S, &dyn Action) -> S + Send + Sync>,
}

impl<S> Handler<S> {
    /// Bind action type `A` to a reducer.
    ///
    /// The reducer must be pure with respect to the store: it may read
    /// only `state` and `action`, and must return either a value equal to
    /// `state` (no-op) or a new state value.
    pub fn new<A, F>(reducer: F) -> Self
    where
        A: Action,
        F: Fn(&S, &A) -> S + Send + Sync + 'static,
    {
        Self {
            action: TypeId::of::<A>(),
            action_name: std::any::type_name::<A>(),
            run: Box::new(move |state, action| {
                let action = action
                    .as_any()
                    .downcast_ref::<A>()
                    .expect("invoke is guarded by handles");
                reducer(state, action)
            }),
        }
    }

    /// Whether this binding handles the given action.
    pub fn handles(&self, action: &dyn Action) -> bool {
        action.as_any().type_id() == self.action
    }

    /// Apply the bound reducer. Must only be called after [`Handler::handles`]
    /// returned true for the same action.
    pub fn invoke(&self, state: &S, action: &dyn Action) -> S {
        (self.run)(state, action)
    }

    /// Name of the bound action type.
    pub fn action_name(&self) -> &'static str {
        self.action_name
    }
}

impl<S> std::fmt::Debug for Handler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("action", &self.action_name)
            .finish()
    }
}

/// An ordered table of handler bindings for one state type.
///
/// # Example
///
/// ```
/// use brook_core::{Action, Handlers};
/// use std::any::Any;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Counter(u32);
///
/// #[derive(Debug)]
/// struct Increment(u32);
///
/// impl Action for Increment {
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
///
/// let handlers = Handlers::new()
///     .on(|state: &Counter, action: &Increment| Counter(state.0 + action.0));
/// assert_eq!(handlers.len(), 1);
/// ```
pub struct Handlers<S> {
    entries: Vec<Handler<S>>,
}

impl<S> Handlers<S> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a binding for action type `A`. Declaration order is dispatch
    /// order.
    pub fn on<A, F>(mut self, reducer: F) -> Self
    where
        A: Action,
        F: Fn(&S, &A) -> S + Send + Sync + 'static,
    {
        self.entries.push(Handler::new(reducer));
        self
    }

    /// Iterate bindings in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Handler<S>> {
        self.entries.iter()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no bindings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S> Default for Handlers<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for Handlers<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter(u32);

    #[derive(Debug)]
    struct Increment(u32);

    impl Action for Increment {
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

    #[test]
    fn handles_matches_exact_type_only() {
        let handler = Handler::new(|state: &Counter, action: &Increment| {
            Counter(state.0 + action.0)
        });

        assert!(handler.handles(&Increment(1)));
        assert!(!handler.handles(&Reset));
    }

    #[test]
    fn invoke_applies_reducer() {
        let handler = Handler::new(|state: &Counter, action: &Increment| {
            Counter(state.0 + action.0)
        });

        let next = handler.invoke(&Counter(1), &Increment(2));
        assert_eq!(next, Counter(3));
    }

    #[test]
    fn table_preserves_declaration_order() {
        let handlers = Handlers::new()
            .on(|state: &Counter, action: &Increment| Counter(state.0 + action.0))
            .on(|_: &Counter, _: &Reset| Counter(0));

        let names: Vec<_> = handlers.iter().map(Handler::action_name).collect();
        assert!(names[0].ends_with("Increment"));
        assert!(names[1].ends_with("Reset"));
    }
}
