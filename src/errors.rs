use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound | DomainError::UnknownRow(_) => AppError::NotFound,
            DomainError::Unauthorized => AppError::Unauthorized,
            DomainError::InvalidInput(msg) | DomainError::Validation(msg) => {
                AppError::BadRequest(msg)
            }
            DomainError::Transport(msg) | DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound => HttpResponse::NotFound().json(serde_json::json!({
                "error": self.to_string()
            })),
            AppError::Unauthorized => HttpResponse::Unauthorized().json(serde_json::json!({
                "error": self.to_string()
            })),
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": msg
            })),
            AppError::Internal(_) => HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error"
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::ResponseError;

    #[test]
    fn statuses() {
        assert_eq!(AppError::NotFound.error_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Unauthorized.error_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::BadRequest("x".to_string()).error_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("x".to_string()).error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_error_display() {
        assert_eq!(
            AppError::Internal("msg".to_string()).to_string(),
            "Internal error: msg"
        );
    }

    #[test]
    fn domain_errors_map_to_app_errors() {
        assert!(matches!(AppError::from(DomainError::NotFound), AppError::NotFound));
        assert!(matches!(
            AppError::from(DomainError::Unauthorized),
            AppError::Unauthorized
        ));
        assert!(matches!(
            AppError::from(DomainError::InvalidInput("bad value".to_string())),
            AppError::BadRequest(msg) if msg == "bad value"
        ));
        assert!(matches!(
            AppError::from(DomainError::Transport("down".to_string())),
            AppError::Internal(_)
        ));
    }
}
