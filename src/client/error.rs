//! Error types for the API client

use thiserror::Error;

use crate::errors::{codes, ErrorResponse};
use crate::validation::ValidationError;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur in the API client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Rejected locally; no request was sent
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("You cannot delete your own account")]
    CannotDeleteSelf,

    /// The server answered with an error envelope or a non-success status
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// HTTP client error
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A body that could not be encoded, or a response of unexpected shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Server error code, when the server sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code.as_str()),
            ClientError::CannotDeleteSelf => Some(codes::CANNOT_DELETE_SELF),
            _ => None,
        }
    }

    /// Build the error for a failed response from its status and raw body.
    pub(crate) fn from_response(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorResponse>(body) {
            Ok(envelope) if envelope.error.code == codes::CANNOT_DELETE_SELF => {
                ClientError::CannotDeleteSelf
            }
            Ok(envelope) => {
                let message = if envelope.error.message.trim().is_empty() {
                    fallback_message(status)
                } else {
                    envelope.error.message
                };
                ClientError::Api {
                    status,
                    code: envelope.error.code,
                    message,
                }
            }
            Err(_) => ClientError::Api {
                status,
                code: "UNKNOWN".to_string(),
                message: fallback_message(status),
            },
        }
    }
}

fn fallback_message(status: u16) -> String {
    format!("Request failed with status {}. Please try again.", status)
}
