/// Errors surfaced by the identity and assignment services
///
/// Every failure a caller can observe is one of five kinds. Only
/// [`ServiceError::Validation`] carries text meant for the client; the cause
/// behind [`ServiceError::Internal`] is kept for logging.

use std::error::Error as StdError;
use thiserror::Error;

use crate::auth::{jwt::JwtError, password::PasswordError};
use crate::store::StoreError;

/// Boxed cause attached to internal failures
pub type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input; the message is safe to show to the caller
    #[error("{0}")]
    Validation(String),

    /// The email address is already registered
    #[error("an account with this email address already exists")]
    Conflict,

    /// Bad credentials or an unusable token
    #[error("unauthorized")]
    Unauthorized,

    /// The referenced user or task does not exist
    #[error("not found")]
    NotFound,

    /// Store, hashing or signing failure
    #[error("internal error")]
    Internal {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl ServiceError {
    /// Wraps an unexpected failure with a short description of what was attempted
    pub fn internal(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ServiceError::Internal {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }

    /// Stable kind label used in logs and API error codes
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::Conflict => "conflict",
            ServiceError::Unauthorized => "unauthorized",
            ServiceError::NotFound => "not_found",
            ServiceError::Internal { .. } => "internal",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::internal("store operation failed", err)
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::internal("password hashing failed", err)
    }
}

impl From<JwtError> for ServiceError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::MissingSecret | JwtError::Signing(_) => {
                ServiceError::internal("token signing failed", err)
            }
            JwtError::Expired
            | JwtError::InvalidSignature
            | JwtError::InvalidAlgorithm
            | JwtError::Malformed(_) => ServiceError::Unauthorized,
        }
    }
}
