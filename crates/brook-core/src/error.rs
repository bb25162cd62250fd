//! Registry error taxonomy.

use thiserror::Error;

/// Errors surfaced by the feature and effects registries.
///
/// All variants carry the human-readable type name of the offending
/// registration so logs can identify it without downcasting.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A feature store for this state type is already registered.
    #[error("feature for state `{state}` is already registered")]
    FeatureAlreadyRegistered {
        /// Type name of the duplicated state.
        state: &'static str,
    },

    /// No feature store for this state type has been registered.
    #[error("no feature registered for state `{state}`")]
    FeatureNotRegistered {
        /// Type name of the missing state.
        state: &'static str,
    },

    /// This effects provider instance is already registered.
    #[error("effects provider `{provider}` is already registered")]
    EffectsAlreadyRegistered {
        /// Type name of the duplicated provider.
        provider: &'static str,
    },
}
