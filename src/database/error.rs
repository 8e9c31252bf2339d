use serde::Serialize;
use thiserror::Error;
use warp::{http::StatusCode, reject::Reject};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    Conflict(String),
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Migration failed: {0}")]
    Migrate(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                Self::Conflict(e.message().to_string())
            }
            sqlx::Error::Database(e) => Self::Query(format!("{e}")),
            sqlx::Error::RowNotFound => Self::Query(String::from("RowNotFound")),
            sqlx::Error::PoolTimedOut => Self::Query(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::Query(String::from("Pool closed")),
            sqlx::Error::Migrate(e) => Self::Migrate(format!("{e}")),
            e => Self::Query(format!("{e}")),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::Migrate(format!("{value}"))
    }
}

/// Every error a request can end with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
    },
    #[error("Unable to authenticate with provided credentials.")]
    InvalidCredentials,
    #[error("Authentication credentials were not provided.")]
    Unauthenticated,
    #[error("Invalid token.")]
    InvalidToken,
    #[error("Not found.")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Media storage failed: {0}")]
    Media(#[from] std::io::Error),
    #[error("Password hashing failed: {0}")]
    Password(String),
    #[error("Token signing failed: {0}")]
    Token(String),
}

impl ApiError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Media(_) | ApiError::Password(_) | ApiError::Token(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Body sent to the client. Internal details stay in the log.
    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Validation { field, message } => ErrorBody {
                detail: message.to_owned(),
                field: *field,
            },
            e if e.status() == StatusCode::INTERNAL_SERVER_ERROR => {
                ErrorBody::new("Internal server error.")
            }
            e => ErrorBody::new(&e.to_string()),
        }
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::Password(format!("{value}"))
    }
}

impl Reject for ApiError {}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl ErrorBody {
    pub fn new(detail: &str) -> Self {
        Self {
            detail: detail.to_string(),
            field: None,
        }
    }
}
