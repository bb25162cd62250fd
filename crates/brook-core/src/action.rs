//! Actions: intent-plus-payload values dispatched into the store.
//!
//! An action is any `'static` value implementing [`Action`]. Identity for
//! handler routing is the action's runtime type (`TypeId`), not a string
//! discriminant; the human-readable [`Action::name`] exists for logs and
//! error messages only.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An immutable intent value routed to handlers by its runtime type.
///
/// Implementors only need to supply [`Action::as_any`]; the default
/// [`Action::name`] reports the concrete type name.
///
/// # Example
///
/// ```
/// use brook_core::Action;
/// use std::any::Any;
///
/// #[derive(Debug)]
/// struct AddTodo {
///     title: String,
/// }
///
/// impl Action for AddTodo {
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait Action: Send + Sync + fmt::Debug + 'static {
    /// Upcast for downcasting in handler bindings.
    fn as_any(&self) -> &dyn Any;

    /// Human-readable action type name for logs and errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A shared, type-erased action as it travels on the action bus.
pub type AnyAction = Arc<dyn Action>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Ping;

    impl Action for Ping {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn name_reports_concrete_type() {
        let action = Ping;
        assert!(action.name().ends_with("Ping"));
    }

    #[test]
    fn downcast_through_any() {
        let action: AnyAction = Arc::new(Ping);
        assert!(action.as_any().downcast_ref::<Ping>().is_some());
    }
}
