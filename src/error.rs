//! Portal error types
//!
//! Defines the errors that can escape a navigation or a mutation action.

use thiserror::Error;

/// Why an API request did not produce a usable response.
///
/// By the time a caller sees one of these the API client has already
/// surfaced it to the user (or started a sign-in), so the only correct
/// reaction is to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// HTTP 401, a sign-in redirect was triggered
    AuthRequired,
    /// HTTP 400, validation messages were shown next to the form
    Validation,
    /// Any other non-2xx status, a transport error, or an undecodable body
    RequestFailed,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::AuthRequired => write!(f, "authentication required"),
            Failure::Validation => write!(f, "validation failed"),
            Failure::RequestFailed => write!(f, "request failed"),
        }
    }
}

/// Errors that can occur in the portal client
#[derive(Error, Debug)]
pub enum PortalError {
    /// An API request did not complete; already surfaced to the user
    #[error("Request did not complete: {0}")]
    Incomplete(Failure),

    /// The current user has no organization to scope a view by
    #[error("Scope missing: {0}")]
    ScopeMissing(String),

    /// A mutation action was missing a required argument or selection
    #[error("Nothing to do: {0}")]
    NothingSelected(String),

    /// A template failed to render
    #[error("Template '{name}' failed: {message}")]
    Template { name: String, message: String },

    /// A view needs a query parameter the location does not carry
    #[error("Missing query parameter: {0}")]
    MissingParameter(String),

    /// A form field the action reads is not on the page
    #[error("Form field not found: {0}")]
    MissingField(String),

    /// Form input could not be used; the user was alerted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The HTTP transport could not be constructed
    #[error("Transport error: {0}")]
    Transport(String),
}

impl PortalError {
    /// True when the error has already been shown to the user and the
    /// caller should simply stop.
    pub fn is_surfaced(&self) -> bool {
        matches!(
            self,
            PortalError::Incomplete(_)
                | PortalError::ScopeMissing(_)
                | PortalError::NothingSelected(_)
                | PortalError::InvalidInput(_)
        )
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Serialization(err.to_string())
    }
}

/// Result type alias for portal operations
pub type PortalResult<T> = Result<T, PortalError>;
