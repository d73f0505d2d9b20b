use actix_web::{HttpResponse, http::StatusCode};
use derive_more::Display;

/// Error taxonomy for the leave and attendance domain.
///
/// Validation, duplicate, not-found, capacity and transition errors carry a
/// message safe to show to the caller. Storage and upstream failures keep
/// their detail in the logs and surface a generic message.
#[derive(Debug, Display)]
pub enum Error {
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "leave request exists: {}", _0)]
    Duplicate(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "max slot must be positive, got {}", _0)]
    InvalidCapacity(i32),

    #[display(fmt = "{}", _0)]
    InvalidTransition(String),

    #[display(fmt = "storage failure")]
    Storage(sqlx::Error),

    #[display(fmt = "identity lookup failed: {}", _0)]
    Upstream(String),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Storage(e)
    }
}

impl actix_web::ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::Duplicate(_)
            | Error::InvalidCapacity(_)
            | Error::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Error::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                "Internal Server Error".to_string()
            }
            Error::Upstream(detail) => {
                tracing::error!(detail = %detail, "identity gateway failure");
                "Upstream service unavailable".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "message": message
        }))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
