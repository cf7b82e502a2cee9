//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use repertoire_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error(transparent)]
  Engine(#[from] CoreError),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let message = self.to_string();
    if let ApiError::Engine(e) = &self
      && e.is_validation()
    {
      tracing::debug!(error = %e, "rejected request input");
    }
    let (status, body) = match &self {
      ApiError::Unauthorized(_) => {
        (StatusCode::UNAUTHORIZED, json!({ "error_message": message }))
      }
      ApiError::Engine(CoreError::MissingFields(fields)) => (
        StatusCode::BAD_REQUEST,
        json!({ "error_message": message, "missing_fields": fields }),
      ),
      ApiError::Engine(CoreError::Invalid { field, .. }) => (
        StatusCode::BAD_REQUEST,
        json!({ "error_message": message, "field": field }),
      ),
      ApiError::Engine(CoreError::MoveNotFound(_)) => {
        (StatusCode::NOT_FOUND, json!({ "error_message": message }))
      }
      ApiError::Engine(CoreError::HasChildren(_)) => {
        (StatusCode::CONFLICT, json!({ "error_message": message }))
      }
      ApiError::Engine(CoreError::Store(e)) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error_message": message }))
      }
    };
    (status, Json(body)).into_response()
  }
}
