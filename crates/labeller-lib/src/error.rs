//! Error types for resource resolution and labelling

use thiserror::Error;

/// Main error type for labeller operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The resource store could not be reached for a type or a call
    #[error("backend unavailable for {target}: {message}")]
    BackendUnavailable { target: String, message: String },

    /// The resource disappeared between resolution and use
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// A conditional write was rejected or the write failed
    #[error("resource conflict on {resource}: {message}")]
    ResourceConflict { resource: String, message: String },

    /// Malformed selector regex
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A backend document could not be decoded
    #[error("malformed resource: {0}")]
    Malformed(String),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a backend-unavailable error for the given target
    pub fn backend(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error for the given resource key
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::ResourceNotFound(resource.into())
    }

    /// Create a conflict error for the given resource key
    pub fn conflict(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ResourceConflict {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a malformed-resource error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the next periodic pass may succeed where this one failed.
    ///
    /// Misconfiguration never heals on its own; everything the backend
    /// reports does.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::BackendUnavailable { .. }
                | Error::ResourceNotFound(_)
                | Error::ResourceConflict { .. }
        )
    }

    /// Map a kube client error for a single-object call on `resource`
    pub fn from_kube(resource: &str, err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => Self::not_found(resource),
            kube::Error::Api(resp) if resp.code == 409 => {
                Self::conflict(resource, resp.message.clone())
            }
            _ => Self::backend(resource, err.to_string()),
        }
    }
}
