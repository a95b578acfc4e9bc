//! Error types for directory operations.
//!
//! Every failure is surfaced to the caller as-is; nothing in the client retries or reconnects.
//! [`Error::category`] groups the variants into the coarse classes callers usually branch on.

use thiserror::Error;

/// Main error type for directory operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Dialing the server or negotiating TLS failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The server rejected the bind credentials
    #[error("Bind rejected (rc={rc}): {message}")]
    Auth {
        /// LDAP result code returned for the bind
        rc: u32,
        /// Diagnostic message returned by the server
        message: String,
    },

    /// A request was issued before a connection was established
    #[error("Not connected to the directory server")]
    NotConnected,

    /// Transport failure while a request was in flight
    #[error("Request failed: {0}")]
    Request(String),

    /// The server answered a request with a non-success result code
    #[error("{operation} rejected (rc={rc}): {message}")]
    Rejected {
        /// Operation that was rejected (`search`, `modify`, ...)
        operation: String,
        /// LDAP result code
        rc: u32,
        /// Diagnostic message returned by the server
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Dial or TLS negotiation failures.
    Connection,
    /// Rejected credentials.
    Auth,
    /// Search/modify failures, including requests without a live connection.
    Request,
    /// Invalid client configuration.
    Config,
}

/// Specialized result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "CONNECTION_FAILED",
            Self::Auth { .. } => "AUTH_FAILED",
            Self::NotConnected => "NOT_CONNECTED",
            Self::Request(_) => "REQUEST_FAILED",
            Self::Rejected { .. } => "REQUEST_REJECTED",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    /// Returns the category this error belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection(_) => ErrorCategory::Connection,
            Self::Auth { .. } => ErrorCategory::Auth,
            Self::NotConnected
            | Self::Request(_)
            | Self::Rejected { .. }
            | Self::InvalidRequest(_) => ErrorCategory::Request,
            Self::ConfigError(_) => ErrorCategory::Config,
        }
    }

    /// Returns the LDAP result code when the server produced one.
    #[must_use]
    pub const fn result_code(&self) -> Option<u32> {
        match self {
            Self::Auth { rc, .. } | Self::Rejected { rc, .. } => Some(*rc),
            _ => None,
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::ConfigError(_))
    }
}

// Conversions from external error types
impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(format!("invalid directory URL: {err}"))
    }
}
