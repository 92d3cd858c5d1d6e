//! Handlers for the customer's own account.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/{project_key}/me/signup` | 201; adopts the anonymous cart of a bearer token, if any |
//! | `POST` | `/{project_key}/me/login`  | Body: `{"email", "password"}` |
//! | `GET`  | `/{project_key}/me`        | Customer tokens only |

use std::fmt;

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use shelf_core::{cart::Cart, catalog::Project, customer::Customer, store::CommerceStore, subject::Subject};
use shelf_service::{Actor, Error as ServiceError, customer::SignupInput};

use crate::{AppState, auth::{Caller, bearer_token}, error::ApiError, load_project};

#[derive(Debug, Serialize)]
pub struct CustomerSignInResult {
  pub customer: Customer,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cart:     Option<Cart>,
}

/// The customer's active cart, treating "none" as `None`.
async fn active_cart<S: CommerceStore>(
  state:    &AppState<S>,
  project:  &Project,
  customer: &Customer,
) -> Result<Option<Cart>, ApiError> {
  match state
    .services
    .carts
    .get_active(project.id, Subject::Customer(customer.id))
    .await
  {
    Ok(cart) => Ok(Some(cart)),
    Err(ServiceError::NotFound(_)) => Ok(None),
    Err(e) => Err(e.into()),
  }
}

// ─── Signup ───────────────────────────────────────────────────────────────────

/// Move the presenting visitor's cart to the new customer. Never fails the
/// signup: an absent cart or an unusable token is ignored, anything else is
/// logged.
async fn adopt_anonymous_cart<S: CommerceStore>(
  state:    &AppState<S>,
  headers:  &HeaderMap,
  project:  &Project,
  customer: &Customer,
) {
  let Ok(token) = bearer_token(headers) else { return };

  let anonymous_id = match state.services.anonymous.lookup_by_token(project.id, token).await {
    Ok(id) => id,
    Err(ServiceError::InvalidToken) => return,
    Err(e) => {
      tracing::warn!(project_id = %project.id, error = %e, "could not resolve anonymous token at signup");
      return;
    }
  };

  match state
    .services
    .carts
    .assign_customer_from_anonymous(project.id, anonymous_id, customer.id)
    .await
  {
    Ok(_) | Err(ServiceError::NotFound(_)) => {}
    Err(e) => {
      tracing::error!(
        project_id = %project.id,
        %anonymous_id,
        customer_id = %customer.id,
        error = %e,
        "failed to move anonymous cart to new customer"
      );
    }
  }
}

/// `POST /{project_key}/me/signup`
pub async fn signup<S: CommerceStore>(
  State(state): State<AppState<S>>,
  Path(project_key): Path<String>,
  headers: HeaderMap,
  Json(body): Json<SignupInput>,
) -> Result<impl IntoResponse, ApiError> {
  let project = load_project(&state, &project_key).await?;
  let customer = state.services.customers.signup(project.id, body).await?;

  adopt_anonymous_cart(&state, &headers, &project, &customer).await;
  let cart = active_cart(&state, &project, &customer).await?;

  Ok((StatusCode::CREATED, Json(CustomerSignInResult { customer, cart })))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginBody {
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
}

impl fmt::Debug for LoginBody {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LoginBody")
      .field("email", &self.email)
      .field("password", &"[redacted]")
      .finish()
  }
}

/// `POST /{project_key}/me/login`
pub async fn login<S: CommerceStore>(
  State(state): State<AppState<S>>,
  Path(project_key): Path<String>,
  Json(body): Json<LoginBody>,
) -> Result<Json<CustomerSignInResult>, ApiError> {
  let project = load_project(&state, &project_key).await?;
  let outcome = state
    .services
    .customers
    .login(project.id, &body.email, &body.password)
    .await?;

  let cart = active_cart(&state, &project, &outcome.customer).await?;
  Ok(Json(CustomerSignInResult { customer: outcome.customer, cart }))
}

// ─── Me ───────────────────────────────────────────────────────────────────────

/// `GET /{project_key}/me`
pub async fn me(caller: Caller) -> Result<Json<Customer>, ApiError> {
  match caller.actor {
    Actor::Customer(customer) => Ok(Json(customer)),
    Actor::Anonymous(_) => Err(ServiceError::Unauthorized.into()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn login_body_debug_hides_password() {
    let body = LoginBody { email: "ada@example.com".into(), password: "Abcdefg1".into() };
    let out = format!("{body:?}");
    assert!(out.contains("ada@example.com"));
    assert!(!out.contains("Abcdefg1"));
  }
}
