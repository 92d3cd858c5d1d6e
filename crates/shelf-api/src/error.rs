//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use shelf_core::StoreError;
use shelf_service::Error as ServiceError;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// Missing or malformed `Authorization` header.
  #[error("unauthorized")]
  Unauthorized,

  #[error(transparent)]
  Service(#[from] ServiceError),

  #[error("store error: {0}")]
  Store(#[from] StoreError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Unauthorized => StatusCode::UNAUTHORIZED,
      Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      Self::Service(e) if e.is_internal() => StatusCode::INTERNAL_SERVER_ERROR,
      Self::Service(e) => match e {
        ServiceError::CurrencyRequired
        | ServiceError::ActionsRequired
        | ServiceError::EmailRequired
        | ServiceError::WeakPassword(_)
        | ServiceError::UnsupportedAction(_)
        | ServiceError::InvalidAction(_)
        | ServiceError::AmbiguousOwner
        | ServiceError::ProductNotFound(_) => StatusCode::BAD_REQUEST,
        ServiceError::Unauthorized
        | ServiceError::InvalidToken
        | ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::AlreadyExists(_) | ServiceError::CartNotActive => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = if status.is_server_error() {
      // project_id and subject come from the request span when known.
      tracing::error!(status = status.as_u16(), error = %self, "request failed");
      "internal error".to_string()
    } else {
      self.to_string()
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn infrastructure_failures_are_500() {
    let errors = [
      ServiceError::TokenCollision(5),
      ServiceError::PasswordHash("bad phc".into()),
      ServiceError::Entropy("no rng".into()),
      ServiceError::Store(StoreError::backend(std::io::Error::other("disk"))),
    ];
    for e in errors {
      assert!(e.is_internal());
      assert_eq!(ApiError::from(e).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
  }

  #[test]
  fn business_outcomes_keep_their_status() {
    assert_eq!(ApiError::from(ServiceError::CartNotActive).status(), StatusCode::CONFLICT);
    assert_eq!(ApiError::from(ServiceError::InvalidToken).status(), StatusCode::UNAUTHORIZED);
    assert_eq!(ApiError::from(ServiceError::NotFound("cart")).status(), StatusCode::NOT_FOUND);
    assert_eq!(
      ApiError::from(ServiceError::ProductNotFound("X".into())).status(),
      StatusCode::BAD_REQUEST
    );
  }
}
