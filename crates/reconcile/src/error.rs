//! Error types for lifecycle operations.
//!
//! Errors are categorized so the host can decide how to report them and
//! whether the next refresh is expected to reconcile the outcome.

use thiserror::Error;
use validation::Diagnostics;

/// Failure reported by the remote API collaborator.
///
/// `NotFound` is the single drift signal; every other variant is fatal for
/// the current operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The object does not exist remotely (HTTP 404)
    #[error("object not found")]
    NotFound,

    /// Any other non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status code returned by the server
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Connection, TLS, DNS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Categories of lifecycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration rejected before any network call
    Validation,
    /// Remote API failure
    Remote,
    /// Remote and local representations disagree structurally
    Mapping,
    /// Primary call succeeded, a required secondary call failed
    Partial,
    /// The resource declaration itself is inconsistent
    Schema,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid configuration",
            Self::Remote => "Remote API error",
            Self::Mapping => "Unexpected remote object shape",
            Self::Partial => "Operation partially applied",
            Self::Schema => "Invalid resource declaration",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation => "Fix the reported attributes and try again",
            Self::Remote => "Check credentials, permissions and the object identifier",
            Self::Mapping => "The API returned a field of an unexpected type; report this as a bug",
            Self::Partial => "Run refresh to pick up the remote state, then apply again",
            Self::Schema => "This is a bug in the resource declaration",
        }
    }

    /// Whether local state may now lag behind remote state.
    pub fn needs_refresh(&self) -> bool {
        matches!(self, Self::Partial)
    }
}

/// Errors surfaced by lifecycle operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Local configuration failed schema validation
    #[error("invalid configuration:\n{0}")]
    Validation(Diagnostics),

    /// Remote value could not be mapped into the declared type
    #[error("{resource}: cannot map field {field:?}: {message}")]
    Mapping {
        resource: String,
        field: String,
        message: String,
    },

    /// Remote API call failed
    #[error("{resource} {id}: {source}")]
    Api {
        resource: String,
        /// Remote identifier, or `<new>` before create succeeded
        id: String,
        #[source]
        source: ApiError,
    },

    /// Primary object exists remotely but a follow-up call failed
    #[error("{resource} {id} was saved but {step} failed: {source}")]
    PartialSuccess {
        resource: String,
        id: String,
        step: String,
        #[source]
        source: ApiError,
    },

    /// Update or follow-up requested for an instance with no identifier
    #[error("{resource} has no remote identifier; create it first")]
    NotCreated { resource: String },

    /// Inconsistent resource declaration
    #[error("schema error: {0}")]
    Schema(String),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation(_) | Error::NotCreated { .. } => ErrorCategory::Validation,
            Error::Mapping { .. } => ErrorCategory::Mapping,
            Error::Api { .. } => ErrorCategory::Remote,
            Error::PartialSuccess { .. } => ErrorCategory::Partial,
            Error::Schema(_) => ErrorCategory::Schema,
        }
    }

    pub(crate) fn mapping(resource: &str, err: crate::mapping::MappingError) -> Self {
        Error::Mapping {
            resource: resource.to_string(),
            field: err.field,
            message: err.message,
        }
    }

    pub(crate) fn api(resource: &str, id: Option<&str>, source: ApiError) -> Self {
        Error::Api {
            resource: resource.to_string(),
            id: id.unwrap_or("<new>").to_string(),
            source,
        }
    }

    /// The wrapped API error, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api { source, .. } | Error::PartialSuccess { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;
