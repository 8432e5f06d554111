//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The publisher rejected the stored session.
  #[error("publisher session expired")]
  SessionExpired,

  /// The publisher could not be reached or answered with garbage.
  #[error("upstream error: {0}")]
  Upstream(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<tally_core::Error> for ApiError {
  fn from(e: tally_core::Error) -> Self {
    use tally_core::Error as E;
    match e {
      E::SessionExpired => Self::SessionExpired,
      E::Network(m) | E::Malformed(m) => Self::Upstream(m),
      E::UnknownNotification(id) => Self::NotFound(format!("notification {id}")),
      other => Self::Internal(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::SessionExpired => StatusCode::UNAUTHORIZED,
      ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
      tracing::warn!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
