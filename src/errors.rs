use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Path of the offending field (e.g. `location.lat`).
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application-specific error types.
///
/// Every variant carries a stable machine-readable `code` that clients
/// depend on; the codes must not change between releases.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Client input failed schema validation (all violations at once).
    Validation(Vec<FieldViolation>),
    /// Malformed request outside of schema validation (missing path part, etc.).
    BadRequest {
        code: &'static str,
        message: String,
    },
    /// A remote service was unreachable, timed out, or returned a
    /// non-success provider status.
    Upstream {
        code: &'static str,
        message: String,
    },
    /// Unexpected local fault.
    Internal {
        code: &'static str,
        message: String,
    },
}

impl AppError {
    pub fn upstream(message: impl Into<String>) -> Self {
        AppError::Upstream {
            code: "UPSTREAM_ERROR",
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal {
            code: "INTERNAL_ERROR",
            message: message.into(),
        }
    }

    /// Replaces the stable code, keeping the message. Used by handlers to
    /// stamp their endpoint-specific code onto a propagated error.
    pub fn with_code(self, code: &'static str) -> Self {
        match self {
            AppError::Upstream { message, .. } => AppError::Upstream { code, message },
            AppError::Internal { message, .. } => AppError::Internal { code, message },
            AppError::BadRequest { message, .. } => AppError::BadRequest { code, message },
            other => other,
        }
    }

    /// The stable code this error will surface with.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest { code, .. }
            | AppError::Upstream { code, .. }
            | AppError::Internal { code, .. } => code,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(violations) => {
                write!(f, "Validation failed: {} field error(s)", violations.len())
            }
            AppError::BadRequest { message, .. } => write!(f, "Bad request: {}", message),
            AppError::Upstream { message, .. } => write!(f, "Upstream error: {}", message),
            AppError::Internal { message, .. } => write!(f, "Internal error: {}", message),
        }
    }
}

impl IntoResponse for AppError {
    /// Converts the error into the JSON error envelope:
    /// `{success: false, error, code, timestamp, details?}`.
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            AppError::Validation(violations) => (
                StatusCode::BAD_REQUEST,
                "Invalid request".to_string(),
                Some(violations.clone()),
            ),
            AppError::BadRequest { message, .. } => {
                (StatusCode::BAD_REQUEST, message.clone(), None)
            }
            AppError::Upstream { message, .. } => {
                tracing::error!("Upstream error: {}", message);
                (StatusCode::BAD_GATEWAY, message.clone(), None)
            }
            AppError::Internal { message, .. } => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "success": false,
            "error": error_message,
            "code": self.code(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        if let Some(violations) = details {
            body["details"] = json!(violations);
        }

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::upstream(err.to_string())
    }
}

/// Extension trait for stamping a stable endpoint code onto an error.
pub trait ResultExt<T> {
    /// Replace the code on the error side, leaving `Ok` untouched.
    fn code(self, code: &'static str) -> Result<T, AppError>;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn code(self, code: &'static str) -> Result<T, AppError> {
        self.map_err(|e| e.with_code(code))
    }
}
