use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::response;

/// Failure of a data access call.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("query failed: {0}")]
    Query(#[from] sea_orm::DbErr),

    #[error("{op} did not finish within {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },

    #[error("stored {column} is invalid: {reason}")]
    InvalidRow { column: &'static str, reason: String },

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

impl PayloadError {
    pub fn invalid(field: &'static str, value: &str) -> Self {
        Self::InvalidField { field, value: value.to_string() }
    }
}

/// Handler-level error. Only `message` (or the payload error) reaches the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}: {detail}")]
    Parameter { message: &'static str, detail: String },

    #[error(transparent)]
    Validation(#[from] PayloadError),

    #[error("{message}: {source}")]
    Read {
        message: &'static str,
        #[source]
        source: RepoError,
    },

    #[error("{message}: {source}")]
    Write {
        message: &'static str,
        #[source]
        source: RepoError,
    },
}

impl AppError {
    pub fn parameter(message: &'static str) -> impl FnOnce(std::num::ParseIntError) -> Self {
        move |err| Self::Parameter { message, detail: err.to_string() }
    }

    pub fn read(message: &'static str) -> impl FnOnce(RepoError) -> Self {
        move |source| Self::Read { message, source }
    }

    pub fn write(message: &'static str) -> impl FnOnce(RepoError) -> Self {
        move |source| Self::Write { message, source }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Read { source: RepoError::NotImplemented(_), .. }
            | AppError::Write { source: RepoError::NotImplemented(_), .. } => {
                StatusCode::NOT_IMPLEMENTED
            },
            AppError::Parameter { .. } | AppError::Validation(_) | AppError::Read { .. } => {
                StatusCode::BAD_REQUEST
            },
            AppError::Write { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let message = match &self {
            AppError::Validation(err) => err.to_string(),
            AppError::Parameter { message, .. }
            | AppError::Read { message, .. }
            | AppError::Write { message, .. } => message.to_string(),
        };
        response::write_error(status, &message)
    }
}

pub type AppResult<T> = Result<T, AppError>;
