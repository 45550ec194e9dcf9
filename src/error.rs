//! Error taxonomy shared by the diff and verify paths.

use thiserror::Error;

use crate::ports::ApiError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while diffing or verifying definitions.
///
/// The type is `Clone` so that a verification outcome can be memoized and
/// handed back verbatim on a cache hit.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A remote definition, service or cluster does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The check could not be meaningfully performed.
    #[error("{0}")]
    SkipVerify(String),
    /// The check ran and the referenced resource is invalid or missing.
    #[error("{0}")]
    Invalid(String),
    /// A remote API call failed.
    #[error("{context}: {source}")]
    Api {
        /// What was being attempted.
        context: String,
        /// The underlying API failure.
        #[source]
        source: ApiError,
    },
    /// A local file or process operation failed.
    #[error("{context}: {message}")]
    Io {
        /// What was being attempted.
        context: String,
        /// The rendered I/O failure.
        message: String,
    },
    /// The configuration or a local definition is unusable.
    #[error("{0}")]
    Config(String),
    /// The caller-supplied deadline elapsed.
    #[error("operation timed out after {0}s")]
    Timeout(u64),
    /// A named verification check failed; wraps the check's own error.
    #[error("verify {name} failed: {source}")]
    CheckFailed {
        /// The check name.
        name: String,
        /// The failure reported by the check.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps an API failure with a description of the attempted call.
    pub fn api(context: impl Into<String>, source: ApiError) -> Self {
        Self::Api { context: context.into(), source }
    }

    /// Wraps a local I/O failure with a description of the attempted operation.
    pub fn io(context: impl Into<String>, err: &impl std::fmt::Display) -> Self {
        Self::Io { context: context.into(), message: err.to_string() }
    }

    /// Returns `true` for the distinguished "could not check" kind.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::SkipVerify(_))
    }

    /// Returns `true` when the error (or the API failure it wraps) means "does not exist".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api { source, .. } => matches!(source, ApiError::NotFound(_)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_failure_keeps_nested_text() {
        let leaf = Error::Invalid("awslogs-group is required".into());
        let inner = Error::CheckFailed { name: "LogConfiguration[]".into(), source: Box::new(leaf) };
        let outer = Error::CheckFailed { name: "TaskDefinition".into(), source: Box::new(inner) };
        assert_eq!(
            outer.to_string(),
            "verify TaskDefinition failed: verify LogConfiguration[] failed: awslogs-group is required"
        );
    }

    #[test]
    fn api_not_found_is_not_found() {
        let err = Error::api("describe", ApiError::NotFound("gone".into()));
        assert!(err.is_not_found());
        assert!(!err.is_skip());
        assert_eq!(err.to_string(), "describe: gone");
    }
}
