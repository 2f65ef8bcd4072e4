use thiserror::Error;

/// Errors returned by the SendGrid API client.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A request header value was rejected.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// SendGrid answered with a non-success status.
    #[error("SendGrid API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error text from the response body.
        message: String,
        /// The attribute SendGrid blamed, if any.
        field: Option<String>,
    },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization {
        /// What serde rejected.
        message: String,
        /// The raw body.
        body: String,
    },
}

impl Error {
    /// The HTTP status behind this error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` when SendGrid reported the object missing.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::Api {
            status: 404,
            message: message.into(),
            field: None,
        }
    }
}
