//! Error types for devhub API calls.
//!
//! Errors are categorized so callers can tell "the object does not exist"
//! apart from a rejected request and from a flaky network, without
//! inspecting error messages.

use std::fmt;

/// Result type alias for devhub API calls.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network failure or timeout (transient, retryable).
    Network,
    /// The API failed on its side (5xx; transient, retryable).
    Server,
    /// The API answered with a non-success status.
    Rejected,
    /// The requested object does not exist.
    NotFound,
    /// A body could not be encoded or decoded.
    Format,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Server => "devhub server error",
            Self::Rejected => "Request rejected by the API",
            Self::NotFound => "Object not found",
            Self::Format => "Invalid payload",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check that the devhub host is reachable and try again",
            Self::Server => "The devhub API is failing; try again later",
            Self::Rejected => "Check the API key and the response body for details",
            Self::NotFound => "Verify the object id, or refresh to drop stale entries",
            Self::Format => "The API and this client may disagree on the payload shape",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during devhub API calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API answered 404.
    #[error("not found: {path}")]
    NotFound {
        /// Request path, relative to `/api/v1/`.
        path: String,
    },

    /// The API answered with any other non-2xx status.
    #[error("status: {status}, body: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Connection failure or timeout.
    #[error("network error: {0}")]
    Network(String),

    /// A response body could not be decoded.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// A request body could not be encoded.
    #[error("failed to encode request: {0}")]
    Serialize(String),
}

impl Error {
    /// Create a `NotFound` error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a `Status` error.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Status { status, .. } if *status >= 500 => ErrorCategory::Server,
            Error::Status { .. } => ErrorCategory::Rejected,
            Error::Network(_) => ErrorCategory::Network,
            Error::InvalidResponse(_) | Error::Serialize(_) => ErrorCategory::Format,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl declarative::RemoteError for Error {
    fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Status {
                status: code,
                body: String::new(),
            },
            other => Self::Network(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::RemoteError;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Server.is_retryable());
        assert!(!ErrorCategory::Rejected.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::Format.is_retryable());
    }

    #[test]
    fn test_error_category_description() {
        assert!(!ErrorCategory::Network.description().is_empty());
        assert!(!ErrorCategory::Rejected.description().is_empty());
        assert!(!ErrorCategory::NotFound.description().is_empty());
    }

    #[test]
    fn test_error_category_advice() {
        assert!(!ErrorCategory::Network.advice().is_empty());
        assert!(!ErrorCategory::Format.advice().is_empty());
    }

    #[test]
    fn test_error_category_display() {
        let display = format!("{}", ErrorCategory::Network);
        assert!(display.contains("Network"));
    }

    #[test]
    fn test_not_found_is_distinguished() {
        let err = Error::not_found("workflows/w1");
        assert!(err.is_not_found());
        assert_eq!(err.category(), ErrorCategory::NotFound);

        // Text that merely reads "not found" is a different condition.
        let err = Error::status(500, "not found");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_status_display_includes_body() {
        let err = Error::status(422, r#"{"error":"name taken"}"#);
        let display = err.to_string();
        assert!(display.contains("422"));
        assert!(display.contains("name taken"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_network_is_retryable() {
        let err = Error::Network("timed out".to_string());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_from_ureq_status() {
        let err: Error = ureq::Error::StatusCode(503).into();
        match err {
            Error::Status { status, .. } => assert_eq!(status, 503),
            other => panic!("Expected Error::Status, got {other:?}"),
        }
    }

    #[test]
    fn test_server_errors_are_retryable() {
        let err = Error::status(503, "upstream unavailable");
        assert_eq!(err.category(), ErrorCategory::Server);
        assert!(err.is_retryable());

        let err = Error::status(409, "conflict");
        assert_eq!(err.category(), ErrorCategory::Rejected);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_serde_error() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = parse.into();
        assert_eq!(err.category(), ErrorCategory::Format);
    }
}
