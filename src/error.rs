//! Error types for the HTTP surface.
//!
//! Reads fail loudly: a missing patient is a 404 with a fixed message, and a
//! store failure is a 500 carrying the underlying error text. Ingestion
//! errors never reach this module; the pipeline logs and drops them.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Patient not found")]
    PatientNotFound,
    #[error(transparent)]
    Database(#[from] DbError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::PatientNotFound => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
