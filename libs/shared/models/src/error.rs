use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::notification::Notification;

#[derive(Error, Debug)]
pub enum AppError {
    /// A failure that already carries the notification the user should see.
    #[error("{}", .notification.description)]
    Notified {
        status: StatusCode,
        notification: Notification,
    },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Notified { status, .. } => *status,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let AppError::Notified { status, notification } = self;

        tracing::error!("Error: {}: {}", status, notification.description);

        let body = Json(json!({
            "error": notification.description,
            "notifications": [notification],
        }));

        (status, body).into_response()
    }
}
