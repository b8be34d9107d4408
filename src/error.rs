//! Error types for vpcaudit.
//!
//! Plumbing code (HTTP, pagination, parsing) works in `anyhow::Result` and adds
//! context as it goes. Anything handed back to a caller of [`crate::inspector`]
//! is narrowed to [`Error`].

use thiserror::Error;

/// Result type alias for inspector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error kinds a caller of the analysis engine can observe.
#[derive(Error, Debug)]
pub enum Error {
    /// Credential material is missing or was rejected. Fatal for the process.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A region could not be queried.
    #[error("Region '{region}' unavailable: {reason}")]
    RegionUnavailable {
        /// Region code
        region: String,
        /// Sanitized reason
        reason: String,
    },

    /// Bad caller input, detected before any request is sent.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Resource absent.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Resource kind, e.g. "vpc"
        kind: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Non-success HTTP status returned by the VPC or IAM API.
    #[error("API request failed: {status}")]
    Api {
        /// HTTP status code
        status: u16,
    },
}

impl Error {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True if this error must stop the whole process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

/// Find a typed [`Error`] anywhere in an `anyhow` chain.
pub fn find_error(error: &anyhow::Error) -> Option<&Error> {
    error.chain().find_map(|cause| cause.downcast_ref::<Error>())
}

/// HTTP status carried by an `anyhow` chain, from our own [`Error::Api`] or a reqwest error.
pub fn status_of(error: &anyhow::Error) -> Option<u16> {
    if let Some(Error::Api { status }) = find_error(error) {
        return Some(*status);
    }
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<reqwest::Error>())
        .and_then(|e| e.status())
        .map(|s| s.as_u16())
}
