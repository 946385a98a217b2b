use axum::http::StatusCode;
use thiserror::Error;

use shared_models::{AppError, Notification};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VisitQueueError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Queue entry transition failed: {0}")]
    TransitionError(String),

    #[error("Active queue entries refresh failed: {0}")]
    CacheRefreshError(String),

    #[error("Lookup failed: {0}")]
    LookupError(String),

    #[error("Remote operation failed: {0}")]
    RemoteError(String),
}

impl VisitQueueError {
    /// The message carried by the variant, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            VisitQueueError::ValidationError(msg)
            | VisitQueueError::IllegalState(msg)
            | VisitQueueError::TransitionError(msg)
            | VisitQueueError::CacheRefreshError(msg)
            | VisitQueueError::LookupError(msg)
            | VisitQueueError::RemoteError(msg) => msg,
        }
    }

    pub fn to_notification(&self) -> Notification {
        match self {
            VisitQueueError::ValidationError(msg) => {
                Notification::error("Missing required information", msg.clone())
            }
            VisitQueueError::IllegalState(msg) => {
                Notification::error("Action not available", msg.clone())
            }
            VisitQueueError::TransitionError(msg) => {
                Notification::error("Error updating queue entry status", msg.clone())
            }
            VisitQueueError::CacheRefreshError(msg) => {
                Notification::warning("Queue list may be out of date", msg.clone())
            }
            VisitQueueError::LookupError(msg) => {
                Notification::error("Error loading options", msg.clone())
            }
            VisitQueueError::RemoteError(msg) => {
                Notification::error("Error updating visit", msg.clone())
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            VisitQueueError::ValidationError(_) => StatusCode::BAD_REQUEST,
            VisitQueueError::IllegalState(_) => StatusCode::CONFLICT,
            VisitQueueError::TransitionError(_)
            | VisitQueueError::CacheRefreshError(_)
            | VisitQueueError::LookupError(_)
            | VisitQueueError::RemoteError(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<VisitQueueError> for AppError {
    fn from(err: VisitQueueError) -> Self {
        AppError::Notified {
            status: err.status_code(),
            notification: err.to_notification(),
        }
    }
}
