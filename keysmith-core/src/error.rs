//! Top-level error types for Keysmith.

use std::fmt;

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::model::CredentialKind;
use crate::secret::SecretField;

/// Result type for Keysmith operations.
pub type Result<T> = std::result::Result<T, KeysmithError>;

/// Category of a non-2xx response from the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalServerError,
    ServiceUnavailable,
    Other(u16),
}

impl RemoteErrorKind {
    /// Map an HTTP status code to its category.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            500 => Self::InternalServerError,
            503 => Self::ServiceUnavailable,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest => write!(f, "bad request"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not found"),
            Self::InternalServerError => write!(f, "internal server error"),
            Self::ServiceUnavailable => write!(f, "service unavailable"),
            Self::Other(code) => write!(f, "HTTP {}", code),
        }
    }
}

/// Error type encompassing every failure a secret operation can surface.
///
/// None of these are retried inside the library.
#[derive(Debug, Error)]
pub enum KeysmithError {
    /// The endpoint needs a credential that was not configured.
    #[error("{operation} requires {credential}, which is not configured")]
    MissingCredential {
        credential: CredentialKind,
        operation: String,
    },

    /// The machine-identity login was rejected.
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Renewing the session token failed. The session is not re-established
    /// automatically; call `login()` to start a new one.
    #[error("token refresh failed: {message}")]
    TokenRefreshFailed { message: String },

    /// A token response carried a lifetime that does not fit a timestamp.
    #[error("token lifetime out of range (expiresIn={expires_in}, maxTTL={max_ttl})")]
    InvalidTokenLifetime { expires_in: i64, max_ttl: i64 },

    /// Service-token metadata lacks a field needed to derive the project key.
    #[error("service token metadata is missing `{field}`")]
    MalformedServiceToken { field: &'static str },

    /// The project key could not be recovered from the service token.
    #[error("failed to decrypt project key for workspace {workspace}: {source}")]
    ProjectKeyDecryptionFailed {
        workspace: String,
        #[source]
        source: CryptoError,
    },

    /// A secret field failed to decode or verify.
    #[error("failed to decrypt secret {field} in workspace {workspace}: {source}")]
    DecryptionFailed {
        workspace: String,
        field: SecretField,
        #[source]
        source: CryptoError,
    },

    /// A secret field could not be sealed before sending.
    #[error("failed to encrypt secret {field} for workspace {workspace}: {source}")]
    EncryptionFailed {
        workspace: String,
        field: SecretField,
        #[source]
        source: CryptoError,
    },

    /// A secret DTO did not follow the plaintext XOR ciphertext field layout.
    #[error("malformed secret {field}: {message}")]
    MalformedSecret { field: SecretField, message: String },

    /// The remote service answered with a non-2xx status.
    #[error("HTTP {status}; {kind}: `{body}`")]
    Remote {
        status: u16,
        kind: RemoteErrorKind,
        body: String,
    },

    /// Folder enumeration aborted; no partial listing is returned.
    #[error("folder traversal failed at {path}: {source}")]
    TraversalFailed {
        path: String,
        #[source]
        source: Box<KeysmithError>,
    },

    /// A secret or folder path could not be interpreted.
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// The request never produced an HTTP response.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KeysmithError {
    /// Build a [`KeysmithError::Remote`] from a status code and response body.
    pub fn remote(status: u16, body: impl Into<String>) -> Self {
        Self::Remote {
            status,
            kind: RemoteErrorKind::from_status(status),
            body: body.into(),
        }
    }

    /// Whether this is a remote 404.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Remote {
                kind: RemoteErrorKind::NotFound,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_categories() {
        assert_eq!(RemoteErrorKind::from_status(400), RemoteErrorKind::BadRequest);
        assert_eq!(RemoteErrorKind::from_status(401), RemoteErrorKind::Unauthorized);
        assert_eq!(RemoteErrorKind::from_status(403), RemoteErrorKind::Forbidden);
        assert_eq!(RemoteErrorKind::from_status(404), RemoteErrorKind::NotFound);
        assert_eq!(
            RemoteErrorKind::from_status(500),
            RemoteErrorKind::InternalServerError
        );
        assert_eq!(
            RemoteErrorKind::from_status(503),
            RemoteErrorKind::ServiceUnavailable
        );
        assert_eq!(RemoteErrorKind::from_status(418), RemoteErrorKind::Other(418));
    }

    #[test]
    fn test_remote_error_message() {
        let err = KeysmithError::remote(403, "{\"message\":\"no access\"}");
        assert_eq!(
            err.to_string(),
            "HTTP 403; forbidden: `{\"message\":\"no access\"}`"
        );
        assert!(!err.is_not_found());
        assert!(KeysmithError::remote(404, "").is_not_found());
    }

    #[test]
    fn test_unnamed_status_displays_code() {
        assert_eq!(RemoteErrorKind::Other(418).to_string(), "HTTP 418");
    }

    #[test]
    fn test_missing_credential_names_credential() {
        let err = KeysmithError::MissingCredential {
            credential: CredentialKind::ApiKey,
            operation: "GET /v2/users/me/organizations".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("API key"));
        assert!(message.contains("/v2/users/me/organizations"));
    }
}
