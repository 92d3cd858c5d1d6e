//! Bearer-token extraction and the [`Caller`] extractor.

use std::collections::HashMap;

use axum::{
  extract::{FromRequestParts, Path},
  http::{HeaderMap, header, request::Parts},
};
use shelf_core::{catalog::Project, store::CommerceStore};
use shelf_service::Actor;
use tracing::{Span, field};

use crate::{AppState, error::ApiError, load_project};

/// The token from an `Authorization: Bearer <token>` header. The scheme is
/// matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
  let value = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let (scheme, rest) = value.split_at_checked(7).ok_or(ApiError::Unauthorized)?;
  if !scheme.eq_ignore_ascii_case("bearer ") {
    return Err(ApiError::Unauthorized);
  }

  let token = rest.trim();
  if token.is_empty() {
    return Err(ApiError::Unauthorized);
  }
  Ok(token)
}

/// A resolved caller on a project-scoped route.
///
/// Requires a `{project_key}` path segment and a bearer token that resolves
/// to a customer or an anonymous visitor of that project.
pub struct Caller {
  pub project: Project,
  pub actor:   Actor,
}

impl<S: CommerceStore> FromRequestParts<AppState<S>> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
      .await
      .map_err(|_| ApiError::NotFound("project"))?;
    let key = params.get("project_key").ok_or(ApiError::NotFound("project"))?;

    let project = load_project(state, key).await?;
    let token = bearer_token(&parts.headers)?;
    let actor = state.services.resolve_actor(project.id, token).await?;
    Span::current().record("subject", field::display(actor.subject()));

    Ok(Caller { project, actor })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  #[test]
  fn accepts_any_case_scheme() {
    assert_eq!(bearer_token(&headers("Bearer abc")).unwrap(), "abc");
    assert_eq!(bearer_token(&headers("bearer   abc  ")).unwrap(), "abc");
    assert_eq!(bearer_token(&headers("BEARER abc")).unwrap(), "abc");
  }

  #[test]
  fn rejects_other_schemes_and_blanks() {
    assert!(matches!(bearer_token(&headers("Basic dXNlcjpwYXNz")), Err(ApiError::Unauthorized)));
    assert!(matches!(bearer_token(&headers("Bearer    ")), Err(ApiError::Unauthorized)));
    assert!(matches!(bearer_token(&headers("Bear")), Err(ApiError::Unauthorized)));
    assert!(matches!(bearer_token(&HeaderMap::new()), Err(ApiError::Unauthorized)));
  }
}
