use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

/// Error returned by HTTP handlers.
///
/// Two body shapes are in use:
/// - `Api`: `{ "error": message, "details"?: ... }` for proxy, token and layout routes
/// - `Action`: `{ "success": false, "message": message }` for cart and order routes
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Api {
        status: StatusCode,
        message: String,
        details: Option<Value>,
    },

    #[error("{message}")]
    Action { status: StatusCode, message: String },
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn api(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Api {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn action(status: StatusCode, message: impl Into<String>) -> Self {
        AppError::Action {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::api(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::api(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Attach upstream details. Has no effect on `Action` errors.
    pub fn with_details(self, value: impl Into<Value>) -> Self {
        match self {
            AppError::Api {
                status, message, ..
            } => AppError::Api {
                status,
                message,
                details: Some(value.into()),
            },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Api { status, .. } | AppError::Action { status, .. } => *status,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Api {
                status,
                message,
                details,
            } => {
                let body = match details {
                    Some(details) => json!({ "error": message, "details": details }),
                    None => json!({ "error": message }),
                };
                (status, Json(body)).into_response()
            }
            AppError::Action { status, message } => (
                status,
                Json(json!({ "success": false, "message": message })),
            )
                .into_response(),
        }
    }
}
