//! Error types for service calls.

use blockcert_issuer::IssuerError;

/// Errors that can occur when calling an external service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to serialize or deserialize data.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The service answered with an error.
    #[error("{operation} rejected ({status}): {message}")]
    Rejected {
        /// The API command or method.
        operation: String,
        /// HTTP status, or the JSON-RPC error code.
        status: i64,
        /// The service's error message.
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("malformed {operation} response: {detail}")]
    Malformed {
        /// The API command or method.
        operation: String,
        /// What was wrong.
        detail: String,
    },

    /// No tokio runtime could be entered or created.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ServiceError {
    pub(crate) fn malformed(operation: &str, detail: impl Into<String>) -> Self {
        ServiceError::Malformed {
            operation: operation.to_string(),
            detail: detail.into(),
        }
    }

    /// Report this as a failed collaborator call of the issuer.
    pub fn into_issuer(self, operation: &str) -> IssuerError {
        match self {
            ServiceError::Rejected {
                operation, message, ..
            } => IssuerError::collaborator(operation, message),
            other => IssuerError::collaborator(operation, other.to_string()),
        }
    }
}
