//! Error types for the reconciliation engine.
//!
//! Errors are categorized so the caller can tell a broken declaration from a
//! remote API that broke its contract, and both from a flaky network.

use std::fmt;

use crate::controller::{Operation, Phase};

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caused by the declared input; fix the declaration.
    Configuration,
    /// The remote API violated the expected response contract.
    Integration,
    /// Non-2xx status, network failure or timeout.
    Transport,
    /// The remote object does not exist.
    NotFound,
    /// The engine was driven through an impossible lifecycle step.
    Lifecycle,
}

impl ErrorCategory {
    /// Whether retrying the whole operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Invalid resource declaration",
            Self::Integration => "Unexpected response from the remote API",
            Self::Transport => "Remote API request failed",
            Self::NotFound => "Remote object not found",
            Self::Lifecycle => "Illegal lifecycle transition",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Configuration => "Fix the named field in the declaration and try again",
            Self::Integration => "Report the logged request and response to the API owners",
            Self::Transport => "Check connectivity and credentials, then retry the operation",
            Self::NotFound => "Verify the identifier refers to an existing object",
            Self::Lifecycle => "Refresh tracked state before retrying",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors raised while mapping or reconciling a resource.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Zero or more than one case of a variant is populated.
    #[error("{kind}: invalid {field}: {message}")]
    InvalidVariant {
        kind: &'static str,
        field: String,
        message: String,
    },

    /// A flat payload carries a discriminant no case matches.
    #[error("{kind}: unknown variant tag {tag:?} at {field} (expected one of {expected})")]
    UnknownVariantTag {
        kind: &'static str,
        field: String,
        tag: String,
        expected: String,
    },

    /// An enumerated engine/adapter name outside the whitelist.
    #[error("{kind}: unsupported value {value:?} for {field} (expected one of {expected})")]
    UnsupportedAdapter {
        kind: &'static str,
        field: String,
        value: String,
        expected: String,
    },

    /// The remote returned a child list of a different length.
    #[error("{kind}: {field} has {desired} entries but the remote returned {remote}")]
    ChildCountMismatch {
        kind: &'static str,
        field: String,
        desired: usize,
        remote: usize,
    },

    /// The transport collaborator failed.
    #[error("{kind}: {operation} failed: {source}")]
    Transport {
        kind: &'static str,
        operation: Operation,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Import of an identifier the remote does not know.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Tracked state without an identifier.
    #[error("{kind}: tracked state has no id")]
    MissingId { kind: &'static str },

    #[error("{kind}: illegal transition {from} -> {to}")]
    IllegalTransition {
        kind: &'static str,
        from: Phase,
        to: Phase,
    },
}

impl Error {
    /// Create an `InvalidVariant` error.
    pub fn invalid_variant(
        kind: &'static str,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidVariant {
            kind,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Wrap a transport failure.
    pub fn transport(
        kind: &'static str,
        operation: Operation,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            kind,
            operation,
            source: Box::new(source),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidVariant { .. }
            | Error::UnknownVariantTag { .. }
            | Error::UnsupportedAdapter { .. } => ErrorCategory::Configuration,
            Error::ChildCountMismatch { .. } => ErrorCategory::Integration,
            Error::Transport { .. } => ErrorCategory::Transport,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::MissingId { .. } | Error::IllegalTransition { .. } => ErrorCategory::Lifecycle,
        }
    }

    /// Whether retrying the whole operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// The resource kind the error was raised for.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidVariant { kind, .. }
            | Error::UnknownVariantTag { kind, .. }
            | Error::UnsupportedAdapter { kind, .. }
            | Error::ChildCountMismatch { kind, .. }
            | Error::Transport { kind, .. }
            | Error::NotFound { kind, .. }
            | Error::MissingId { kind }
            | Error::IllegalTransition { kind, .. } => kind,
        }
    }
}
