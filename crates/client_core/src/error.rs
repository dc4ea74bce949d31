//! Failure taxonomy for the workflow core.
//!
//! Every variant is recoverable: the application boundary turns each one into a
//! user-facing notice and keeps running.

use shared::error::{ErrorCode, GENERIC_FAILURE_MESSAGE};
use thiserror::Error;

use crate::device::CaptureOwner;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please complete all steps before marking attendance")]
    IncompleteMarkSelection,
    #[error("Please fill in all required fields")]
    IncompleteEnrollment,
    #[error("Enter email and password")]
    MissingCredentials,
    #[error("A student id is required before training can start")]
    MissingTrainingSubject,
    #[error("unknown page '{0}'")]
    UnknownPage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("Unable to access camera. Please check permissions.")]
    PermissionDenied,
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    #[error("camera is already in use by the {holder} flow")]
    Busy { holder: CaptureOwner },
    #[error("Camera not ready. Please wait a moment and try again.")]
    NotReady,
    #[error("camera is not streaming")]
    NotStreaming,
    #[error("failed to encode still frame: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// Non-success HTTP status; `message` comes from the body's `detail` when present.
    #[error("{message}")]
    Status {
        status: u16,
        code: ErrorCode,
        message: String,
    },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
    /// The backend answered 2xx but reported `ok: false`.
    #[error("{0}")]
    Rejected(String),
}

impl NetworkError {
    pub fn status(status: u16, detail: Option<String>) -> Self {
        Self::Status {
            status,
            code: ErrorCode::from_status(status),
            message: detail.unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            NetworkError::Decode(err.to_string())
        } else {
            NetworkError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminAuthError {
    #[error("Invalid admin credentials")]
    InvalidCredentials,
    #[error("admin login required")]
    NotAuthenticated,
    #[error("admin session rejected by server; log in again")]
    TokenRejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    AdminAuth(#[from] AdminAuthError),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.into())
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
