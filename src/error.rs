//! Client error types
//!
//! Every failure the console can hit collapses into one of these variants.
//! The `Display` output of each is exactly the text shown to the user.

use thiserror::Error;

use crate::local_storage::StorageError;

/// Errors surfaced by the API clients and view models
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never produced a response (DNS, connect, timeout, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response; `detail` is the server's message, shown verbatim
    #[error("{detail}")]
    Server { status: u16, detail: String },

    /// Client-side required-field check failed
    #[error("{0}")]
    Validation(String),

    /// A 2xx response whose body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Local persistence failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// Shortcut for a required-field failure
    pub fn required(message: &str) -> Self {
        ClientError::Validation(message.to_string())
    }

    /// HTTP status for server-reported failures
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 401/403 responses, which usually mean the stored token is stale
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
