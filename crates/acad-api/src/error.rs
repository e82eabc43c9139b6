//! API error type and [`axum::response::IntoResponse`] implementation.

use acad_core::Error as Domain;
use axum::{
  Json,
  extract::{multipart::MultipartError, rejection::JsonRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Domain(#[from] Domain),

  #[error("authentication required")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("malformed upload: {0}")]
  Multipart(#[from] MultipartError),

  #[error("malformed JSON body: {0}")]
  Json(#[from] JsonRejection),
}

/// Convert a backend error into an [`ApiError`].
pub fn store_err<E: Into<Domain>>(e: E) -> ApiError { ApiError::Domain(e.into()) }

fn domain_status(e: &Domain) -> StatusCode {
  match e {
    Domain::InvalidPoints { .. }
    | Domain::CategoryCapExceeded { .. }
    | Domain::InvalidDecision
    | Domain::UnsupportedFileType(_)
    | Domain::MissingField(_)
    | Domain::UnknownCategory(_)
    | Domain::InvalidName
    | Domain::NotAStudent(_)
    | Domain::NotAReviewer(_) => StatusCode::BAD_REQUEST,
    Domain::InvalidCredentials => StatusCode::UNAUTHORIZED,
    Domain::AccountDisabled(_) => StatusCode::FORBIDDEN,
    Domain::AccountNotFound(_) | Domain::SubmissionNotFound(_) => {
      StatusCode::NOT_FOUND
    }
    Domain::AlreadyReviewed(_)
    | Domain::AccountExists { .. }
    | Domain::AdminExists => StatusCode::CONFLICT,
    Domain::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
    Domain::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Domain(Domain::Storage(e)) => {
        tracing::error!("storage failure: {e}");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": "internal server error" })),
        )
          .into_response()
      }
      ApiError::Domain(ref e @ Domain::CategoryCapExceeded { remaining, .. }) => (
        domain_status(e),
        Json(json!({ "error": e.to_string(), "remaining": remaining })),
      )
        .into_response(),
      ApiError::Domain(ref e @ Domain::AccountDisabled(_)) => (
        domain_status(e),
        Json(json!({ "error": e.to_string(), "code": "ACCOUNT_DISABLED" })),
      )
        .into_response(),
      ApiError::Domain(ref e) => {
        (domain_status(e), Json(json!({ "error": e.to_string() }))).into_response()
      }
      ApiError::Unauthorized => {
        let mut res = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "error": "authentication required" })),
        )
          .into_response();
        res
          .headers_mut()
          .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        res
      }
      ApiError::Forbidden(m) => {
        (StatusCode::FORBIDDEN, Json(json!({ "error": m }))).into_response()
      }
      ApiError::NotFound(m) => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response()
      }
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Multipart(e) => {
        (e.status(), Json(json!({ "error": e.body_text() }))).into_response()
      }
      ApiError::Json(e) => {
        (e.status(), Json(json!({ "error": e.body_text() }))).into_response()
      }
    }
  }
}
