//! Error types for pollmaster-core

use thiserror::Error;

/// Result type alias using pollmaster-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pollmaster-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local input validation failed; no request was sent
    #[error("{0}")]
    Validation(String),

    /// Backend rejected the email/password pair
    #[error("Invalid email or password: {0}")]
    InvalidCredentials(String),

    /// Role gate, admin key gate, or a 401/403 from the backend
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Connectivity failure before a response arrived
    #[error("Network error: {0}. Check your connection and try again.")]
    Network(String),

    /// Request did not complete within the configured bound
    #[error("Request timed out after {0} seconds. Try again.")]
    Timeout(u64),

    /// Vote on a label that the poll question does not offer
    #[error("Poll '{poll}' has no option named '{option}'")]
    InvalidOption { poll: String, option: String },

    /// Lookup of a poll or collection item that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Vote outside the poll's scheduled window
    #[error("Poll '{0}' is not open for voting")]
    PollClosed(String),

    /// Account exists but the OTP step has not been completed
    #[error("Account is not verified yet. Enter the 6-digit code sent to your email.")]
    VerificationRequired,

    /// Repeated sign-in/sign-up submission inside the debounce window
    #[error("A request is already being submitted. Please wait a moment.")]
    DuplicateSubmission,

    /// Any other backend failure
    #[error("Server error: {0}")]
    Api(String),

    /// Durable key-value storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Client configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl Error {
    /// Whether the failure came from the backend refusing the credential.
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}
