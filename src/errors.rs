use crate::{
    response::ApiResponse,
    services::{
        auth_service::AuthError, permissions::PermissionDenied, sys_log_service::SysLogError,
        user_service::UserError, validation::ValidationError,
    },
};
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::fmt;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Error returned by handlers. Renders as the standard envelope with
/// `success = false`.
///
/// Business-rule failures keep HTTP 200 so clients branch on `success`;
/// protocol problems (validation, auth, permissions) use their status code.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// A rejected business operation (HTTP 200, `success = false`).
    pub fn business(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, msg)
    }

    /// 422 with a `field: reason` message.
    pub fn validation(field: &str, reason: impl fmt::Display) -> Self {
        let message = if field.is_empty() {
            reason.to_string()
        } else {
            format!("{}: {}", field, reason)
        };
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for a 500 Internal Server Error. The message is logged, the
    /// client only sees a generic text.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), "{}", self.message);
            INTERNAL_MESSAGE.to_string()
        } else {
            self.message
        };

        let mut response = (self.status, Json(ApiResponse::fail(message))).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(format!("{:#}", err))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::internal(format!("database error: {}", err))
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.field, &err.reason)
    }
}

impl From<PermissionDenied> for AppError {
    fn from(err: PermissionDenied) -> Self {
        AppError::forbidden(err.to_string())
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) | UserError::UserNameTaken(_) | UserError::EmailTaken(_) => {
                AppError::business(err.to_string())
            }
            UserError::Validation(inner) => inner.into(),
            UserError::Forbidden(inner) => inner.into(),
            UserError::Password(_) | UserError::Sqlx(_) => AppError::internal(err.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::UserDisabled
            | AuthError::InvalidRefreshToken => AppError::business(err.to_string()),
            AuthError::TokenRevoked
            | AuthError::InvalidToken
            | AuthError::WrongTokenType
            | AuthError::CredentialsMismatch => AppError::unauthorized(err.to_string()),
            AuthError::InactiveUser => AppError::bad_request(err.to_string()),
            AuthError::Jwt(_) | AuthError::Password(_) | AuthError::Sqlx(_) => {
                AppError::internal(err.to_string())
            }
        }
    }
}

impl From<SysLogError> for AppError {
    fn from(err: SysLogError) -> Self {
        match err {
            SysLogError::Sqlx(_) => AppError::internal(err.to_string()),
            other => AppError::business(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation("body", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::validation("query", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::validation("path", rejection.body_text())
    }
}
