//! Common error types for boardwatch.
//!
//! This module provides a centralized Error enum using thiserror. The
//! identification variants mirror the outcomes of a board lookup; the rest
//! cover the collaborators (discovery backends, signature files,
//! configuration) the lookups run on top of.

use thiserror::Error;

/// Main error type for boardwatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller supplied a malformed value, detected before any I/O
    #[error("invalid {field} value: '{value}'")]
    InvalidArgument { field: &'static str, value: String },

    /// The identification service has no board for this VID/PID.
    ///
    /// This is a sentinel; match on the variant rather than the message.
    #[error("board not found")]
    NotFound,

    /// The identification service answered with an unexpected payload
    #[error("wrong format in server response: {0}")]
    MalformedResponse(String),

    /// The identification service answered with a failure status
    #[error("the server responded with status {0}")]
    Upstream(String),

    /// Network or HTTP client failure
    #[error("error querying the identification service: {0}")]
    Transport(#[from] reqwest::Error),

    /// Board identification could not be completed at all
    #[error("{message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<Error>,
    },

    /// The instance is unknown or was never initialized
    #[error("invalid instance")]
    InvalidInstance,

    /// Discovery backend errors
    #[error("discovery {backend}: {message}")]
    Discovery { backend: String, message: String },

    /// Signature database errors
    #[error("signature database error: {0}")]
    Signatures(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors from tokio or std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this is the "no such board" sentinel from a remote lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
