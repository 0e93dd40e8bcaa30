//! Error type shared by registration and invocation.

use thiserror::Error;

use crate::types::TypeKey;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The type already has a provider in this container.
    #[error("provider for type '{key}' already exists")]
    DuplicateProvider { key: TypeKey },

    /// A function offered as a provider has no non-error return value.
    #[error("function '{signature}' must return at least one value")]
    NoProvidableReturn { signature: &'static str },

    /// Registration of a function failed for one of its return values.
    #[error("failed to add function '{signature}' as provider: {source}")]
    Registration {
        signature: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// A plain value was handed to an invocation entry point.
    #[error("can't invoke not a function '{key}'")]
    NotAFunction { key: TypeKey },

    /// The whole parent chain was searched without a match.
    #[error("provider for parameter[{index}] of type '{key}' not found")]
    ProviderNotFound { index: usize, key: TypeKey },

    /// Resolving one parameter of a function failed.
    #[error("couldn't provide parameter[{index}] of type '{key}' for function '{signature}': {source}")]
    ParameterResolution {
        signature: &'static str,
        index: usize,
        key: TypeKey,
        #[source]
        source: Box<Error>,
    },

    /// A function provider was asked for its value while it was still being built.
    #[error("circular dependency while providing type '{key}'")]
    CircularDependency { key: TypeKey },

    /// A dynamic function returned a list that does not match its declared slots.
    #[error("function '{signature}' returned {actual} values, declared {expected}")]
    ReturnMismatch {
        signature: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A provider produced a value that is not of the type it is registered for.
    #[error("provided value is not of type '{key}'")]
    TypeMismatch { key: TypeKey },

    /// The error value returned by a user function, passed through untouched.
    #[error(transparent)]
    Invocation(anyhow::Error),
}

impl Error {
    /// Innermost error behind any registration or parameter wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Registration { source, .. } | Error::ParameterResolution { source, .. } => {
                source.root()
            }
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::ProviderNotFound { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self.root(), Error::DuplicateProvider { .. })
    }

    /// Downcast the user error carried by [`Error::Invocation`].
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self.root() {
            Error::Invocation(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn root_unwraps_parameter_chain() {
        let inner = Error::ProviderNotFound {
            index: 1,
            key: TypeKey::of::<u32>(),
        };
        let outer = Error::ParameterResolution {
            signature: "fn(u32)",
            index: 0,
            key: TypeKey::of::<String>(),
            source: Box::new(inner),
        };

        assert!(outer.is_not_found());
        assert!(!outer.is_duplicate());
        assert!(outer.to_string().contains("parameter[0]"));
        assert!(outer.to_string().contains("parameter[1] of type 'u32' not found"));
    }

    #[test]
    fn invocation_error_is_transparent() {
        let err = Error::Invocation(anyhow::Error::new(Boom));

        assert_eq!(err.to_string(), "boom");
        assert!(err.downcast_ref::<Boom>().is_some());
    }
}
