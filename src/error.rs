use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Error returned by handlers. Every variant renders as `{"message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        if is_foreign_key_violation(&e) {
            return ApiError::BadRequest("Referenced record does not exist".into());
        }
        ApiError::Database(e)
    }
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "Internal Server Error".to_string()
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}

/// Unique-key collision (MySQL error 1062). SQLSTATE 23000 alone also covers
/// foreign-key and NOT NULL failures, so the driver's error kind decides.
pub fn is_duplicate_key(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

pub fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::fmt;

    /// Integrity error as the MySQL driver reports it: SQLSTATE 23000 for every kind.
    #[derive(Debug)]
    struct IntegrityError {
        unique: bool,
    }

    impl fmt::Display for IntegrityError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message())
        }
    }

    impl std::error::Error for IntegrityError {}

    impl DatabaseError for IntegrityError {
        fn message(&self) -> &str {
            if self.unique {
                "Duplicate entry 'E001' for key 'employee_code'"
            } else {
                "Cannot add or update a child row: a foreign key constraint fails"
            }
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23000"))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.unique {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::ForeignKeyViolation
            }
        }
    }

    fn integrity_error(unique: bool) -> sqlx::Error {
        sqlx::Error::Database(Box::new(IntegrityError { unique }))
    }

    #[actix_web::test]
    async fn renders_message_json_with_status() {
        let resp = ApiError::conflict("Already punched in today").error_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Already punched in today");
    }

    #[actix_web::test]
    async fn hides_internal_details() {
        let resp = ApiError::Internal("pool exhausted".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Internal Server Error");
    }

    #[test]
    fn row_not_found_is_not_duplicate() {
        assert!(!is_duplicate_key(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn unique_violation_is_duplicate() {
        assert!(is_duplicate_key(&integrity_error(true)));
        assert!(matches!(ApiError::from(integrity_error(true)), ApiError::Database(_)));
    }

    #[test]
    fn foreign_key_violation_is_bad_request_not_duplicate() {
        let e = integrity_error(false);
        assert!(!is_duplicate_key(&e));

        let api = ApiError::from(e);
        assert_eq!(api.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(api.to_string(), "Referenced record does not exist");
    }
}
