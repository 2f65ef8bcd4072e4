//! Error types surfaced by the provider.
//!
//! Every failure a resource adapter can hit ends up as a [`ProviderError`].
//! The gRPC layer turns these into error diagnostics; [`tonic::Status`]
//! conversion is kept for transport-level failures.

use thiserror::Error;

use crate::client;

/// Errors that can occur while serving provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested remote object was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Configuration or state failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider block is missing or invalid, or the provider is unconfigured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A state or API payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The gRPC server failed.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Binding the listener or writing the handshake failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SendGrid rejected a create because the object already exists.
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// The API key was rejected or lacks the scope for the call.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// SendGrid rate limited the request.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// SendGrid returned a server error or could not be reached.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The remote object is not in the state the operation needs.
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// The operation is not supported for this type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Any other SendGrid API failure.
    #[error("SendGrid API error: {0}")]
    Api(String),
}

impl ProviderError {
    /// The message carried by the error, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::AlreadyExists(msg)
            | Self::PermissionDenied(msg)
            | Self::ResourceExhausted(msg)
            | Self::Unavailable(msg)
            | Self::FailedPrecondition(msg)
            | Self::Unimplemented(msg)
            | Self::Api(msg) => msg,
            Self::Serialization(_) => "serialization error (see Debug output)",
            Self::Transport(_) => "transport error (see Debug output)",
            Self::Io(_) => "i/o error (see Debug output)",
        }
    }

    /// Returns `true` when the remote object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<client::Error> for ProviderError {
    fn from(err: client::Error) -> Self {
        let message = err.to_string();
        match err.status() {
            Some(400) | Some(422) => Self::Validation(message),
            Some(401) | Some(403) => Self::PermissionDenied(message),
            Some(404) => Self::NotFound(message),
            Some(409) => Self::AlreadyExists(message),
            Some(429) => Self::ResourceExhausted(message),
            Some(status) if status >= 500 => Self::Unavailable(message),
            Some(_) => Self::Api(message),
            None => match err {
                client::Error::Transport(ref e) if e.is_timeout() || e.is_connect() => {
                    Self::Unavailable(message)
                }
                client::Error::InvalidUrl(_) | client::Error::InvalidHeader(_) => {
                    Self::Configuration(message)
                }
                _ => Self::Api(message),
            },
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Serialization(e) => tonic::Status::invalid_argument(e.to_string()),
            ProviderError::Transport(e) => tonic::Status::unavailable(e.to_string()),
            ProviderError::Io(e) => tonic::Status::internal(e.to_string()),
            ProviderError::AlreadyExists(msg) => tonic::Status::already_exists(msg),
            ProviderError::PermissionDenied(msg) => tonic::Status::permission_denied(msg),
            ProviderError::ResourceExhausted(msg) => tonic::Status::resource_exhausted(msg),
            ProviderError::Unavailable(msg) => tonic::Status::unavailable(msg),
            ProviderError::FailedPrecondition(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            ProviderError::Api(msg) => tonic::Status::unknown(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16) -> client::Error {
        client::Error::Api {
            status,
            message: "boom".to_string(),
            field: None,
        }
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("alert 42".to_string());
        assert_eq!(format!("{}", err), "Resource not found: alert 42");

        let err = ProviderError::UnknownResource("sendgrid_nope".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: sendgrid_nope");

        let err = ProviderError::Api("teapot".to_string());
        assert_eq!(format!("{}", err), "SendGrid API error: teapot");
    }

    #[test]
    fn test_api_status_mapping() {
        assert!(matches!(
            ProviderError::from(api_error(400)),
            ProviderError::Validation(_)
        ));
        assert!(matches!(
            ProviderError::from(api_error(401)),
            ProviderError::PermissionDenied(_)
        ));
        assert!(matches!(
            ProviderError::from(api_error(403)),
            ProviderError::PermissionDenied(_)
        ));
        assert!(ProviderError::from(api_error(404)).is_not_found());
        assert!(matches!(
            ProviderError::from(api_error(409)),
            ProviderError::AlreadyExists(_)
        ));
        assert!(matches!(
            ProviderError::from(api_error(429)),
            ProviderError::ResourceExhausted(_)
        ));
        assert!(matches!(
            ProviderError::from(api_error(503)),
            ProviderError::Unavailable(_)
        ));
        assert!(matches!(
            ProviderError::from(api_error(418)),
            ProviderError::Api(_)
        ));
    }

    #[test]
    fn test_invalid_header_is_configuration() {
        let err = ProviderError::from(client::Error::InvalidHeader("api key".to_string()));
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::NotFound("x".to_string()).into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = ProviderError::Validation("x".to_string()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: tonic::Status = ProviderError::Configuration("x".to_string()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::ResourceExhausted("x".to_string()).into();
        assert_eq!(status.code(), tonic::Code::ResourceExhausted);

        let status: tonic::Status = ProviderError::Api("x".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Unknown);
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::PermissionDenied("missing scope alerts.create".to_string());
        assert_eq!(err.message(), "missing scope alerts.create");
    }
}
