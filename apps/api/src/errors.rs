use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::documents::DocumentError;
use crate::gmail::GmailError;
use crate::profiles::ProfileError;
use crate::reply::ReplyError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Gmail error: {0}")]
    Gmail(#[from] GmailError),

    #[error("Profile store error: {0}")]
    Profiles(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound(user_id) => {
                AppError::NotFound(format!("Profile '{user_id}' not found"))
            }
            ProfileError::InvalidId(user_id) => {
                AppError::Validation(format!("Invalid user id '{user_id}'"))
            }
            other => AppError::Profiles(other.to_string()),
        }
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::InvalidUserId(_) | DocumentError::InvalidRequestId(_) => {
                AppError::Validation(err.to_string())
            }
            DocumentError::Write { .. } => AppError::Document(err.to_string()),
        }
    }
}

/// Every reply error is about the draft itself: its recipient, headers or
/// attachment paths. The message names the field or file at fault.
impl From<ReplyError> for AppError {
    fn from(err: ReplyError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl AppError {
    /// HTTP status, machine-readable code and user-facing message.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Gmail(GmailError::MessageNotFound(id)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Message {id} not found"),
            ),
            // Gmail failures are shown to the dashboard user verbatim: they are the
            // actionable part ("token expired, run authorize", "quota exceeded").
            AppError::Gmail(e) if e.is_auth() => {
                tracing::warn!("Gmail auth error: {e}");
                (StatusCode::UNAUTHORIZED, "GMAIL_AUTH_ERROR", e.to_string())
            }
            AppError::Gmail(e) => {
                tracing::error!("Gmail error: {e}");
                (StatusCode::BAD_GATEWAY, "GMAIL_ERROR", e.to_string())
            }
            AppError::Profiles(msg) => {
                tracing::error!("Profile store error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PROFILE_STORE_ERROR",
                    "Profiles could not be read".to_string(),
                )
            }
            AppError::Document(msg) => {
                tracing::error!("Document error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DOCUMENT_ERROR",
                    "Document generation failed".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let body = Json(json!({
            "status": "error",
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_errors_keep_their_cause() {
        let err = AppError::from(ReplyError::ForeignAttachment("/etc/passwd".to_string()));
        let (status, code, message) = err.parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "VALIDATION_ERROR");
        assert!(message.contains("/etc/passwd"), "{message}");

        let missing = ReplyError::Attachment {
            path: "out/jane/r1_resume.pdf".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let (status, _, message) = AppError::from(missing).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.contains("r1_resume.pdf"), "{message}");
    }

    #[test]
    fn test_profile_not_found_is_404() {
        let (status, code, _) = AppError::from(ProfileError::NotFound("ghost".to_string())).parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
    }
}
