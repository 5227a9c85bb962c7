use std::fmt::Display;

use thiserror::Error;

/// Everything that can abort a resolve call.
///
/// Every variant is fail-fast: the first error raised anywhere in the graph
/// aborts the whole top-level call and is handed back to its caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// A resolver or post hook targets a field its object does not declare.
    #[error("attribute `{target}` not found on `{object}`")]
    TargetAttributeNotFound {
        object: &'static str,
        target: &'static str,
    },

    /// Strict mode is on and a resolver produces an untyped value.
    #[error("`{object}.{field}`: return annotation is required in strict mode")]
    MissingReturnAnnotation {
        object: &'static str,
        field: &'static str,
    },

    /// A loader declares a config field that the resolver was not given.
    #[error("`{loader}.{field}` not found in loader config")]
    LoaderConfigValueMissing {
        loader: &'static str,
        field: &'static str,
    },

    /// A loader rejected the value supplied for one of its config fields.
    #[error("`{loader}.{field}` rejected its config value: {reason}")]
    LoaderConfigInvalid {
        loader: &'static str,
        field: &'static str,
        reason: String,
    },

    /// A loader handle was used after the resolve call owning it returned.
    #[error("loader `{loader}` used outside of an active resolve call")]
    DependencyOutsideInvocation { loader: &'static str },

    /// A loader identity was provisioned twice with different key or value types.
    #[error("loader `{loader}` is already provisioned with other key or value types")]
    LoaderTypeMismatch { loader: &'static str },

    /// A batch function broke the one-value-per-key contract.
    #[error("loader `{loader}` returned {actual} values for {expected} keys")]
    BatchLengthMismatch {
        loader: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("batch load failed: {0}")]
    BatchLoad(String),

    #[error("resolver failed: {0}")]
    Resolver(String),

    #[error("deferred value was dropped before completion")]
    DeferredDropped,

    #[error("serialization error: {0}")]
    Serialization(String),
}

// Failures are cached per key and handed to every waiter, so the variant
// keeps the message instead of the non-cloneable source error.
impl From<serde_json::Error> for ResolveError {
    fn from(err: serde_json::Error) -> Self {
        ResolveError::Serialization(err.to_string())
    }
}

impl ResolveError {
    /// Wraps a batch function failure.
    pub fn batch(reason: impl Display) -> Self {
        ResolveError::BatchLoad(reason.to_string())
    }

    /// Wraps a failure raised inside a resolver function.
    pub fn resolver(reason: impl Display) -> Self {
        ResolveError::Resolver(reason.to_string())
    }
}

pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
