//! Cart endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/{project_key}/carts` | Body: `{"currency", "customerId"?, "anonymousId"?}` |
//! | `GET`    | `/{project_key}/carts/{id}` | |
//! | `POST`   | `/{project_key}/me/carts` | Owned by the caller |
//! | `POST`   | `/{project_key}/me/carts/{id}` | Body: `{"actions": [...]}` |
//! | `DELETE` | `/{project_key}/me/carts/{id}` | Soft delete |
//! | `GET`    | `/{project_key}/me/active-cart` | |
//!
//! A cart owned by someone else is reported as 404, like a missing one.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use shelf_core::{cart::Cart, store::CommerceStore};
use shelf_service::cart::{CreateCart, UpdateCart};
use uuid::Uuid;

use crate::{AppState, auth::Caller, error::ApiError, load_project};

fn cart_id(raw: &str) -> Result<Uuid, ApiError> {
  Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("cart"))
}

/// `POST /{project_key}/carts`
pub async fn create<S: CommerceStore>(
  State(state): State<AppState<S>>,
  Path(project_key): Path<String>,
  Json(body): Json<CreateCart>,
) -> Result<impl IntoResponse, ApiError> {
  let project = load_project(&state, &project_key).await?;
  let cart = state.services.carts.create(project.id, body).await?;
  Ok((StatusCode::CREATED, Json(cart)))
}

/// `GET /{project_key}/carts/{id}`
pub async fn get_one<S: CommerceStore>(
  State(state): State<AppState<S>>,
  Path((project_key, id)): Path<(String, String)>,
) -> Result<Json<Cart>, ApiError> {
  let project = load_project(&state, &project_key).await?;
  let cart = state.services.carts.get(project.id, cart_id(&id)?).await?;
  Ok(Json(cart))
}

#[derive(Debug, Deserialize)]
pub struct MyCartBody {
  #[serde(default)]
  pub currency: String,
}

/// `POST /{project_key}/me/carts`
pub async fn create_mine<S: CommerceStore>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Json(body): Json<MyCartBody>,
) -> Result<impl IntoResponse, ApiError> {
  let owner = caller.actor.subject();
  let input = CreateCart {
    currency:     body.currency,
    customer_id:  owner.customer_id(),
    anonymous_id: owner.anonymous_id(),
  };
  let cart = state.services.carts.create(caller.project.id, input).await?;
  Ok((StatusCode::CREATED, Json(cart)))
}

/// `POST /{project_key}/me/carts/{id}`
pub async fn update_mine<S: CommerceStore>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path((_, id)): Path<(String, String)>,
  Json(body): Json<UpdateCart>,
) -> Result<Json<Cart>, ApiError> {
  let cart = state
    .services
    .carts
    .update(caller.project.id, caller.actor.subject(), cart_id(&id)?, body)
    .await?;
  Ok(Json(cart))
}

/// `DELETE /{project_key}/me/carts/{id}`
pub async fn delete_mine<S: CommerceStore>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Path((_, id)): Path<(String, String)>,
) -> Result<Json<Cart>, ApiError> {
  let cart = state
    .services
    .carts
    .delete(caller.project.id, caller.actor.subject(), cart_id(&id)?)
    .await?;
  Ok(Json(cart))
}

/// `GET /{project_key}/me/active-cart`
pub async fn active<S: CommerceStore>(
  State(state): State<AppState<S>>,
  caller: Caller,
) -> Result<Json<Cart>, ApiError> {
  let cart = state
    .services
    .carts
    .get_active(caller.project.id, caller.actor.subject())
    .await?;
  Ok(Json(cart))
}
