//! OAuth-style token endpoints.
//!
//! | Method | Path | Grant |
//! |--------|------|-------|
//! | `POST` | `/oauth/{project_key}/customers/token` | `password` |
//! | `POST` | `/oauth/{project_key}/anonymous/token` | `client_credentials` |
//!
//! Both take a form body whose `scope` must include
//! `manage_project:{project_key}`.

use std::fmt;

use axum::{
  Form, Json,
  extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shelf_core::{catalog::Project, store::CommerceStore, token::redact};
use shelf_service::token::TokenPair;

use crate::{AppState, error::ApiError, load_project};

#[derive(Deserialize)]
pub struct TokenForm {
  pub grant_type: String,
  pub scope:      Option<String>,
  pub username:   Option<String>,
  pub password:   Option<String>,
}

impl fmt::Debug for TokenForm {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TokenForm")
      .field("grant_type", &self.grant_type)
      .field("scope", &self.scope)
      .field("username", &self.username)
      .field("password", &self.password.as_ref().map(|_| "[redacted]"))
      .finish()
  }
}

#[derive(Serialize)]
pub struct TokenResponse {
  pub access_token:  String,
  pub expires_in:    i64,
  pub token_type:    &'static str,
  pub scope:         String,
  pub refresh_token: String,
}

impl fmt::Debug for TokenResponse {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TokenResponse")
      .field("access_token", &redact(&self.access_token))
      .field("expires_in", &self.expires_in)
      .field("token_type", &self.token_type)
      .field("scope", &self.scope)
      .field("refresh_token", &redact(&self.refresh_token))
      .finish()
  }
}

impl TokenResponse {
  fn new(tokens: TokenPair, scope: String) -> Self {
    Self {
      expires_in: tokens.expires_in(),
      access_token: tokens.access.token,
      token_type: "Bearer",
      scope,
      refresh_token: tokens.refresh.token,
    }
  }
}

fn project_scope(project: &Project) -> String { format!("manage_project:{}", project.key) }

fn check_form(form: &TokenForm, project: &Project, grant_type: &str) -> Result<(), ApiError> {
  if form.grant_type != grant_type {
    return Err(ApiError::BadRequest(format!("grant_type must be {grant_type}")));
  }
  let wanted = project_scope(project);
  let granted = form
    .scope
    .as_deref()
    .is_some_and(|s| s.split_whitespace().any(|scope| scope == wanted));
  if !granted {
    return Err(ApiError::BadRequest(format!("scope must include {wanted}")));
  }
  Ok(())
}

/// `POST /oauth/{project_key}/customers/token`
pub async fn customer_token<S: CommerceStore>(
  State(state): State<AppState<S>>,
  Path(project_key): Path<String>,
  Form(form): Form<TokenForm>,
) -> Result<Json<TokenResponse>, ApiError> {
  let project = load_project(&state, &project_key).await?;
  check_form(&form, &project, "password")?;

  let username = form.username.as_deref().unwrap_or_default();
  let password = form.password.as_deref().unwrap_or_default();
  let outcome = state.services.customers.login(project.id, username, password).await?;

  let scope = format!("{} customer_id:{}", project_scope(&project), outcome.customer.id);
  Ok(Json(TokenResponse::new(outcome.tokens, scope)))
}

/// `POST /oauth/{project_key}/anonymous/token`
pub async fn anonymous_token<S: CommerceStore>(
  State(state): State<AppState<S>>,
  Path(project_key): Path<String>,
  Form(form): Form<TokenForm>,
) -> Result<Json<TokenResponse>, ApiError> {
  let project = load_project(&state, &project_key).await?;
  check_form(&form, &project, "client_credentials")?;

  let session = state.services.anonymous.issue(project.id).await?;

  let scope = format!("{} anonymous_id:{}", project_scope(&project), session.anonymous_id);
  Ok(Json(TokenResponse::new(session.tokens, scope)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn debug_output_hides_secrets() {
    let form = TokenForm {
      grant_type: "password".into(),
      scope:      Some("manage_project:demo".into()),
      username:   Some("ada@example.com".into()),
      password:   Some("Abcdefg1".into()),
    };
    let out = format!("{form:?}");
    assert!(out.contains("ada@example.com"));
    assert!(!out.contains("Abcdefg1"));

    let resp = TokenResponse {
      access_token:  "AAAAAAsecretaccess".into(),
      expires_in:    10800,
      token_type:    "Bearer",
      scope:         "manage_project:demo".into(),
      refresh_token: "RRRRRRsecretrefresh".into(),
    };
    let out = format!("{resp:?}");
    assert!(!out.contains("secretaccess"));
    assert!(!out.contains("secretrefresh"));
  }
}
