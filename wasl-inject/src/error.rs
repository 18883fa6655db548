//! Error types for Wasl resolution and binding.
//!
//! Every failure is raised synchronously at the point of resolution or
//! binding; nothing is swallowed or retried internally.

use std::fmt;

use crate::key::BindingKey;
use crate::scope::Scope;

/// Main error type for all Wasl operations.
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    /// No binding, explicit provider, or constructible type was found for
    /// an injection point.
    #[error("{}", .0)]
    NoProvider(NoProviderError),

    /// A call-context-scoped resolution ran with no context registered on
    /// the current thread.
    #[error("{}", .0)]
    NoContextRegistered(NoContextRegisteredError),

    /// A fixed-instance provider was paired with a caching scope.
    #[error("{}", .0)]
    CantBeScoped(CantBeScopedError),

    /// A provider factory returned an error, or the produced value did not
    /// have the requested type.
    #[error("Failed to construct {key}: {source}")]
    ConstructionFailed {
        key: BindingKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl InjectError {
    /// Wraps an arbitrary error as a construction failure for type `T`.
    ///
    /// Intended for provider factories:
    ///
    /// ```rust,ignore
    /// .to_factory(|| {
    ///     let conn = connect().map_err(InjectError::construction::<Database>)?;
    ///     Ok(Database { conn })
    /// })
    /// ```
    pub fn construction<T: ?Sized + 'static>(
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ConstructionFailed {
            key: BindingKey::of::<T>(),
            source: source.into(),
        }
    }
}

/// Error when resolution finds nothing to construct from.
#[derive(Debug)]
pub struct NoProviderError {
    /// The key that was being resolved.
    pub requested: BindingKey,
    /// The member name of the failing injection point.
    pub member: &'static str,
    /// Similar types that ARE bound (for "did you mean?" suggestions).
    pub suggestions: Vec<String>,
}

impl fmt::Display for NoProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "No provider for injection point `{}` of type {}",
            self.member, self.requested
        )?;

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: bind {} in the active injector, give the point an explicit provider, or implement Injectable for the type",
            self.requested.type_name()
        )
    }
}

/// Error when a call-context-scoped provider runs outside a context.
///
/// Indicates a missing lifecycle hook upstream: the unit of work never
/// called `CallContext::register()`.
#[derive(Debug)]
pub struct NoContextRegisteredError {
    /// Type name of the value being resolved.
    pub target: &'static str,
}

impl fmt::Display for NoContextRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "No call context registered on this thread while resolving {}",
            self.target
        )?;
        write!(
            f,
            "\n  Hint: wrap the unit of work in CallContext::enter(), or call CallContext::register() before it starts"
        )
    }
}

/// Error when a fixed instance is bound under a caching scope.
///
/// An instance provider already returns the same value on every call, so
/// re-caching it by provider identity is a configuration mistake. Raised
/// at bind/declaration time, not at resolution time.
#[derive(Debug)]
pub struct CantBeScopedError {
    /// Type name of the bound instance.
    pub target: &'static str,
    /// The caching scope that was requested.
    pub scope: Scope,
}

impl fmt::Display for CantBeScopedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Instance binding for {} cannot use the {} scope",
            self.target, self.scope
        )?;
        write!(
            f,
            "\n  A fixed instance always resolves to the same value; bind it without a scope"
        )
    }
}

/// Convenient Result type for Wasl operations.
pub type Result<T> = std::result::Result<T, InjectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_provider_display() {
        let err = InjectError::NoProvider(NoProviderError {
            requested: BindingKey::annotated::<String>("primary"),
            member: "db",
            suggestions: vec!["my_app::Database".into()],
        });

        let msg = format!("{err}");
        assert!(msg.contains("No provider"));
        assert!(msg.contains("`db`"));
        assert!(msg.contains("primary"));
        assert!(msg.contains("Did you mean"));
        assert!(msg.contains("my_app::Database"));
    }

    #[test]
    fn no_provider_display_without_suggestions() {
        let err = InjectError::NoProvider(NoProviderError {
            requested: BindingKey::of::<i32>(),
            member: "port",
            suggestions: vec![],
        });

        let msg = format!("{err}");
        assert!(!msg.contains("Did you mean"));
        assert!(msg.contains("Hint"));
    }

    #[test]
    fn no_context_display() {
        let err = InjectError::NoContextRegistered(NoContextRegisteredError {
            target: "my_app::RequestState",
        });

        let msg = format!("{err}");
        assert!(msg.contains("No call context registered"));
        assert!(msg.contains("RequestState"));
        assert!(msg.contains("CallContext::enter"));
    }

    #[test]
    fn cant_be_scoped_display() {
        let err = InjectError::CantBeScoped(CantBeScopedError {
            target: "my_app::Config",
            scope: Scope::Process,
        });

        let msg = format!("{err}");
        assert!(msg.contains("Config"));
        assert!(msg.contains("process"));
        assert!(msg.contains("without a scope"));
    }

    #[test]
    fn construction_helper_carries_key() {
        let err = InjectError::construction::<String>("boom");
        match err {
            InjectError::ConstructionFailed { key, .. } => {
                assert_eq!(key, BindingKey::of::<String>());
            }
            other => panic!("Expected ConstructionFailed, got: {other:?}"),
        }
    }
}
