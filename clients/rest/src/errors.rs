use actix_web::{error::BlockingError, http::StatusCode, HttpResponse, ResponseError};
use people_store::{
    database::{
        request_manager::RequestManagerError,
        table::{page::PageableError, table::ApplyErrors},
    },
    search::{index::IndexError, query::QueryError},
};
use serde::Serialize;
use thiserror::Error;

use crate::headers::{self, ENTITY_NAME};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FieldError {
    pub object_name: &'static str,
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    pub fn not_null(field: &'static str) -> Self {
        Self {
            object_name: ENTITY_NAME,
            field,
            message: "NotNull",
        }
    }

    pub fn not_blank(field: &'static str) -> Self {
        Self {
            object_name: ENTITY_NAME,
            field,
            message: "NotBlank",
        }
    }
}

/// Body of every error response
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub message: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldError>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("A new person cannot already have an id")]
    IdExists,

    #[error("Method argument not valid")]
    Validation(Vec<FieldError>),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Malformed path: {0}")]
    MalformedPath(String),

    #[error("Invalid query parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid search query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("Person not found")]
    NotFound,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Translation key sent back to the client
    fn message_key(&self) -> &'static str {
        match self {
            ApiError::IdExists => "error.idexists",
            ApiError::Validation(_) => "error.validation",
            ApiError::MalformedBody(_)
            | ApiError::MalformedPath(_)
            | ApiError::InvalidParameter(_)
            | ApiError::InvalidQuery(_) => "error.http.400",
            ApiError::NotFound => "error.http.404",
            ApiError::Internal(_) => "error.internalServerError",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::IdExists
            | ApiError::Validation(_)
            | ApiError::MalformedBody(_)
            | ApiError::MalformedPath(_)
            | ApiError::InvalidParameter(_)
            | ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(reason) = self {
            log::error!("Request failed: {}", reason);
        }

        let field_errors = match self {
            ApiError::Validation(field_errors) => field_errors.clone(),
            _ => vec![],
        };

        let mut response = HttpResponse::build(self.status_code());

        headers::failure_alert(&mut response, self.message_key());

        response.json(ErrorBody {
            message: self.message_key().to_string(),
            description: self.to_string(),
            field_errors,
        })
    }
}

impl From<RequestManagerError> for ApiError {
    fn from(err: RequestManagerError) -> Self {
        match err {
            RequestManagerError::TransactionRollback(ApplyErrors::CannotCreateWithId(_)) => {
                ApiError::IdExists
            }
            RequestManagerError::TransactionRollback(ApplyErrors::NotNullConstraintViolation(
                field,
            )) => ApiError::Validation(vec![FieldError::not_blank(field)]),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<PageableError> for ApiError {
    fn from(err: PageableError) -> Self {
        ApiError::InvalidParameter(err.to_string())
    }
}

impl From<IndexError> for ApiError {
    fn from(err: IndexError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<BlockingError> for ApiError {
    fn from(err: BlockingError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
