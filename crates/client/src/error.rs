//! Failures surfaced by the gateway.

use thiserror::Error;

/// Every way a resource request can fail.
///
/// The store keeps only the rendered message (see [`serialize_error`]), so the
/// variants exist for logging and for callers using the gateway directly.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection refused, timeout, or a body that could not be read
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a 4xx/5xx status
    #[error("request failed with status code {status}: {message}")]
    Status { status: u16, message: String },

    /// The body or headers did not match the wire contract
    #[error("malformed response: {0}")]
    Malformed(String),

    /// An update or delete was requested for an entity that was never saved
    #[error("{resource} entity has no identifier")]
    MissingId { resource: &'static str },

    #[error("invalid server url '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl ClientError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Collapse a failure into the plain message kept on the store.
pub fn serialize_error(err: &ClientError) -> String {
    err.to_string()
}
